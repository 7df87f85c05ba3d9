//! Persisted entities shared by the store and the services.
//!
//! Status and kind enums carry the exact labels used in the database
//! (`ABERTO`, `PRE-VENDA`, `CREDITO_CONVERSAO`, ...) through `strum` for
//! SQL text columns and through `serde` for JSON payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use super::{ContainerId, Phone};

/// Share of an item's applied price credited when it is traded in.
pub const CONVERSION_RATE: f64 = 0.85;

/// Rounds a currency amount to cents.
#[must_use]
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A customer, keyed by phone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    /// Normalized phone number.
    pub phone: Phone,
    /// Display name given during onboarding or by staff.
    pub name: Option<String>,
    /// Whether the client accepted promotional messages.
    pub opt_in: bool,
    /// Delivery address used for shipments.
    pub address: Option<String>,
    /// Cached LudoCoin balance (sum of the ledger).
    pub ludocoin_balance: f64,
}

impl Client {
    /// Creates a client with only a phone and a name, as onboarding does.
    #[must_use]
    pub fn onboarded(phone: Phone, name: impl Into<String>) -> Self {
        Self {
            phone,
            name: Some(name.into()),
            opt_in: false,
            address: None,
            ludocoin_balance: 0.0,
        }
    }
}

/// A product of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    /// Product id.
    pub id: Uuid,
    /// Public name shown to customers.
    pub name: String,
    /// Current list price.
    pub price: f64,
}

/// Lifecycle of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerStatus {
    /// Accepting items; the client's active container.
    Aberto,
    /// Closed because a shipment was requested.
    Pendente,
    /// Physically shipped (staff tooling).
    Enviado,
    /// Closed by staff for any other reason.
    Fechado,
}

/// An inventory container of one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    /// Human-readable id.
    pub id: ContainerId,
    /// Owner.
    pub client_phone: Phone,
    /// Current status.
    pub status: ContainerStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp (item intake, status change).
    pub updated_at: DateTime<Utc>,
}

impl Container {
    /// Builds a new open container for `phone`.
    #[must_use]
    pub fn open(id: ContainerId, phone: Phone) -> Self {
        let now = Utc::now();
        Self {
            id,
            client_phone: phone,
            status: ContainerStatus::Aberto,
            created_at: now,
            updated_at: now,
        }
    }
}

/// How an item entered the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemOrigin {
    /// Bought outright.
    Compra,
    /// Reserved from the trade list; the only origin eligible for LudoCoin conversion.
    Listinha,
    /// Won in a raffle.
    Rifa,
}

/// Lifecycle of an item inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
pub enum ItemStatus {
    /// In stock and shippable.
    #[serde(rename = "DISPONIVEL")]
    #[strum(serialize = "DISPONIVEL")]
    Disponivel,
    /// Not yet released by the publisher.
    #[serde(rename = "PRE-VENDA")]
    #[strum(serialize = "PRE-VENDA")]
    PreVenda,
    /// Held by staff.
    #[serde(rename = "RESERVADO")]
    #[strum(serialize = "RESERVADO")]
    Reservado,
    /// Converted into LudoCoins.
    #[serde(rename = "RESGATADO")]
    #[strum(serialize = "RESGATADO")]
    Resgatado,
}

/// One unit of inventory inside a container, joined with its game name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerItem {
    /// Item id.
    pub id: Uuid,
    /// Container currently holding the item.
    pub container_id: ContainerId,
    /// Product reference.
    pub game_id: Uuid,
    /// Product name, when the join found one.
    pub game_name: Option<String>,
    /// Acquisition channel.
    pub origin: ItemOrigin,
    /// Lifecycle status.
    pub status: ItemStatus,
    /// Price recorded at intake; basis of any credit calculation.
    pub applied_price: f64,
    /// Intake timestamp.
    pub created_at: DateTime<Utc>,
}

impl ContainerItem {
    /// Product name with the generic fallback used in chat messages.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.game_name.as_deref().unwrap_or("Jogo")
    }
}

/// Kind of intake a movement records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    /// Purchase intake.
    Compra,
    /// Trade-list intake.
    Listinha,
    /// Raffle prize intake.
    Rifa,
}

impl From<ItemOrigin> for MovementKind {
    fn from(origin: ItemOrigin) -> Self {
        match origin {
            ItemOrigin::Compra => Self::Compra,
            ItemOrigin::Listinha => Self::Listinha,
            ItemOrigin::Rifa => Self::Rifa,
        }
    }
}

/// Immutable audit record of an item intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    /// Movement id.
    pub id: Uuid,
    /// The item this movement created.
    pub item_id: Uuid,
    /// Container the item entered.
    pub container_id: ContainerId,
    /// Owner of the container.
    pub client_phone: Phone,
    /// Intake kind.
    pub kind: MovementKind,
    /// Product reference.
    pub game_id: Uuid,
    /// Price recorded at intake.
    pub price: f64,
    /// Intake timestamp.
    pub created_at: DateTime<Utc>,
}

/// Ledger entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Credit from a trade-in conversion.
    CreditoConversao,
    /// Coins spent by the client.
    DebitoUtilizacao,
    /// Manual signed adjustment.
    Ajuste,
}

/// Immutable LudoCoin ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinTransaction {
    /// Entry id.
    pub id: Uuid,
    /// Client the entry belongs to.
    pub client_phone: Phone,
    /// Entry kind.
    pub kind: TransactionKind,
    /// Value as written; see [`CoinTransaction::signed_value`].
    pub value: f64,
    /// Item that originated a conversion credit.
    pub item_id: Option<Uuid>,
    /// Staff member or bot identity that created the entry.
    pub operator: Option<String>,
    /// Free-form note.
    pub note: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl CoinTransaction {
    /// Contribution of this entry to the client's balance.
    #[must_use]
    pub fn signed_value(&self) -> f64 {
        match self.kind {
            TransactionKind::CreditoConversao => self.value.abs(),
            TransactionKind::DebitoUtilizacao => -self.value.abs(),
            TransactionKind::Ajuste => self.value,
        }
    }
}

/// Staff-tracked shipment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    /// Requested, not yet handled.
    Pendente,
    /// Being packed.
    EmPreparacao,
    /// Waiting for the freight payment.
    AguardandoPagamento,
    /// Shipped.
    Enviado,
    /// Cancelled by staff.
    Cancelado,
}

impl ShipmentStatus {
    /// Whether a shipment in this status blocks creating another one for
    /// the same container.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pendente | Self::EmPreparacao)
    }
}

/// Point-in-time copy of an item, stored inside a shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    /// Game name at the time of the request.
    #[serde(rename = "jogo")]
    pub game: String,
    /// Acquisition channel.
    #[serde(rename = "origem")]
    pub origin: ItemOrigin,
    /// Item status at the time of the request.
    #[serde(rename = "status_item")]
    pub status: ItemStatus,
    /// Recorded price.
    #[serde(rename = "preco_aplicado_brl")]
    pub applied_price: f64,
}

impl From<&ContainerItem> for ItemSnapshot {
    fn from(item: &ContainerItem) -> Self {
        Self {
            game: item.display_name().to_string(),
            origin: item.origin,
            status: item.status,
            applied_price: item.applied_price,
        }
    }
}

/// A request to ship a container's contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    /// Shipment id.
    pub id: Uuid,
    /// Source container.
    pub container_id: ContainerId,
    /// Client phone.
    pub client_phone: Phone,
    /// Client display name at request time.
    pub client_name: String,
    /// Current status.
    pub status: ShipmentStatus,
    /// Items as they stood at creation time.
    pub items_snapshot: Vec<ItemSnapshot>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn item_status_uses_database_labels() {
        assert_eq!(ItemStatus::PreVenda.as_ref(), "PRE-VENDA");
        assert_eq!(ItemStatus::from_str("DISPONIVEL").ok(), Some(ItemStatus::Disponivel));
        let json = serde_json::to_string(&ItemStatus::PreVenda).unwrap_or_default();
        assert_eq!(json, "\"PRE-VENDA\"");
    }

    #[test]
    fn multiword_labels_are_screaming_snake() {
        assert_eq!(ShipmentStatus::EmPreparacao.to_string(), "EM_PREPARACAO");
        assert_eq!(TransactionKind::CreditoConversao.as_ref(), "CREDITO_CONVERSAO");
        assert_eq!(
            ShipmentStatus::from_str("AGUARDANDO_PAGAMENTO").ok(),
            Some(ShipmentStatus::AguardandoPagamento)
        );
    }

    #[test]
    fn only_pending_and_preparing_shipments_are_active() {
        assert!(ShipmentStatus::Pendente.is_active());
        assert!(ShipmentStatus::EmPreparacao.is_active());
        assert!(!ShipmentStatus::Enviado.is_active());
        assert!(!ShipmentStatus::Cancelado.is_active());
    }

    #[test]
    fn signed_value_follows_kind() {
        let Some(phone) = Phone::normalize("5511") else {
            panic!("phone");
        };
        let mut tx = CoinTransaction {
            id: Uuid::new_v4(),
            client_phone: phone,
            kind: TransactionKind::DebitoUtilizacao,
            value: 30.0,
            item_id: None,
            operator: None,
            note: None,
            created_at: Utc::now(),
        };
        assert!((tx.signed_value() + 30.0).abs() < f64::EPSILON);
        tx.kind = TransactionKind::Ajuste;
        tx.value = -5.0;
        assert!((tx.signed_value() + 5.0).abs() < f64::EPSILON);
        tx.kind = TransactionKind::CreditoConversao;
        tx.value = 85.0;
        assert!((tx.signed_value() - 85.0).abs() < f64::EPSILON);
    }

    #[test]
    fn snapshot_serializes_with_dashboard_keys() {
        let snap = ItemSnapshot {
            game: "Catan".to_string(),
            origin: ItemOrigin::Listinha,
            status: ItemStatus::Disponivel,
            applied_price: 100.0,
        };
        let json = serde_json::to_value(&snap).unwrap_or_default();
        assert_eq!(json["jogo"], "Catan");
        assert_eq!(json["origem"], "LISTINHA");
        assert_eq!(json["status_item"], "DISPONIVEL");
    }

    #[test]
    fn round_cents_rounds_half_away() {
        assert!((round_cents(100.0 * 0.85) - 85.0).abs() < f64::EPSILON);
        assert!((round_cents(12.345_6) - 12.35).abs() < 1e-9);
    }
}
