//! Conversation session states and their payloads.
//!
//! A [`Session`] is persisted as a `(state name, JSON payload)` pair so the
//! row layout stays readable by staff tooling; [`Session::from_parts`] is
//! the only way back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use super::{ContainerId, Phone};

/// Name of a dialogue state as stored in `chat_states.state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StateName {
    /// Waiting for the name of an unknown phone number.
    OnboardAskName,
    /// Trade candidates listed, waiting for indices.
    TrocaListando,
    /// Trade selection made, waiting for yes/no.
    TrocaConfirm,
    /// Shipment summary shown, waiting for yes/no.
    EnviarConfirm,
    /// Waiting for a receipt attachment.
    ComprovanteWait,
}

/// An item offered for trade-in, with its credit preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeCandidate {
    /// Container item id.
    pub item_id: Uuid,
    /// Game name.
    pub name: String,
    /// Preview credit (85% of the applied price, rounded to cents).
    pub credit: f64,
}

/// The conversation's position in the dialogue for one phone number.
#[derive(Debug, Clone, PartialEq)]
pub enum Session {
    /// Waiting for the client's name.
    OnboardAskName,
    /// Candidates shown; the list is kept so indices stay stable.
    TrocaListando {
        /// Eligible items in display order.
        candidates: Vec<TradeCandidate>,
    },
    /// Selection awaiting confirmation.
    TrocaConfirm {
        /// Chosen items.
        chosen: Vec<TradeCandidate>,
    },
    /// Shipment summary awaiting confirmation.
    EnviarConfirm {
        /// Container the summary was computed from.
        container_id: ContainerId,
    },
    /// Waiting for a `COMPROVANTE <id>` message with a file.
    ComprovanteWait,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TradeListPayload {
    #[serde(default)]
    candidates: Vec<TradeCandidate>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TradeConfirmPayload {
    #[serde(default)]
    chosen: Vec<TradeCandidate>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ShipConfirmPayload {
    container_id: ContainerId,
}

impl Session {
    /// Returns the persisted state name.
    #[must_use]
    pub const fn name(&self) -> StateName {
        match self {
            Self::OnboardAskName => StateName::OnboardAskName,
            Self::TrocaListando { .. } => StateName::TrocaListando,
            Self::TrocaConfirm { .. } => StateName::TrocaConfirm,
            Self::EnviarConfirm { .. } => StateName::EnviarConfirm,
            Self::ComprovanteWait => StateName::ComprovanteWait,
        }
    }

    /// Serializes the state-specific payload.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        let value = match self {
            Self::OnboardAskName | Self::ComprovanteWait => Ok(serde_json::json!({})),
            Self::TrocaListando { candidates } => serde_json::to_value(TradeListPayload {
                candidates: candidates.clone(),
            }),
            Self::TrocaConfirm { chosen } => serde_json::to_value(TradeConfirmPayload {
                chosen: chosen.clone(),
            }),
            Self::EnviarConfirm { container_id } => serde_json::to_value(ShipConfirmPayload {
                container_id: container_id.clone(),
            }),
        };
        value.unwrap_or_default()
    }

    /// Rebuilds a session from its persisted parts.
    ///
    /// Returns `None` for unknown state names or payloads that do not fit
    /// the state.
    #[must_use]
    pub fn from_parts(state: &str, payload: &serde_json::Value) -> Option<Self> {
        let name: StateName = state.parse().ok()?;
        let payload = if payload.is_null() {
            serde_json::json!({})
        } else {
            payload.clone()
        };
        match name {
            StateName::OnboardAskName => Some(Self::OnboardAskName),
            StateName::ComprovanteWait => Some(Self::ComprovanteWait),
            StateName::TrocaListando => serde_json::from_value::<TradeListPayload>(payload)
                .ok()
                .map(|p| Self::TrocaListando {
                    candidates: p.candidates,
                }),
            StateName::TrocaConfirm => serde_json::from_value::<TradeConfirmPayload>(payload)
                .ok()
                .map(|p| Self::TrocaConfirm { chosen: p.chosen }),
            StateName::EnviarConfirm => serde_json::from_value::<ShipConfirmPayload>(payload)
                .ok()
                .map(|p| Self::EnviarConfirm {
                    container_id: p.container_id,
                }),
        }
    }
}

/// A session row as the store keeps it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    /// Owner of the session.
    pub phone: Phone,
    /// Raw state name.
    pub state: String,
    /// Raw payload.
    pub payload: serde_json::Value,
    /// Last write time; drives expiry.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn candidate(name: &str, credit: f64) -> TradeCandidate {
        TradeCandidate {
            item_id: Uuid::new_v4(),
            name: name.to_string(),
            credit,
        }
    }

    #[test]
    fn state_names_match_stored_labels() {
        assert_eq!(StateName::OnboardAskName.as_ref(), "ONBOARD_ASK_NAME");
        assert_eq!(StateName::ComprovanteWait.to_string(), "COMPROVANTE_WAIT");
        assert_eq!(Session::TrocaConfirm { chosen: vec![] }.name(), StateName::TrocaConfirm);
    }

    #[test]
    fn trade_list_survives_persistence() {
        let session = Session::TrocaListando {
            candidates: vec![candidate("Catan", 85.0), candidate("Azul", 42.5)],
        };
        let restored = Session::from_parts(session.name().as_ref(), &session.payload());
        assert_eq!(restored, Some(session));
    }

    #[test]
    fn ship_confirm_keeps_container() {
        let session = Session::EnviarConfirm {
            container_id: ContainerId::new("5511-AAAAAA"),
        };
        let Some(Session::EnviarConfirm { container_id }) =
            Session::from_parts("ENVIAR_CONFIRM", &session.payload())
        else {
            panic!("expected ENVIAR_CONFIRM");
        };
        assert_eq!(container_id.as_str(), "5511-AAAAAA");
    }

    #[test]
    fn unknown_state_is_rejected() {
        assert!(Session::from_parts("SOMETHING_ELSE", &serde_json::json!({})).is_none());
    }

    #[test]
    fn null_payload_is_tolerated_for_stateless_states() {
        assert_eq!(
            Session::from_parts("COMPROVANTE_WAIT", &serde_json::Value::Null),
            Some(Session::ComprovanteWait)
        );
        assert_eq!(
            Session::from_parts("TROCA_LISTANDO", &serde_json::Value::Null),
            Some(Session::TrocaListando { candidates: vec![] })
        );
    }

    #[test]
    fn mismatched_payload_is_rejected() {
        let payload = serde_json::json!({ "container_id": 42 });
        assert!(Session::from_parts("ENVIAR_CONFIRM", &payload).is_none());
    }
}
