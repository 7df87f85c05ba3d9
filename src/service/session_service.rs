//! Session service: per-phone dialogue state with a time-to-live.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::domain::{Phone, Session, StoredSession};
use crate::persistence::Store;

/// Default lifetime of an idle session.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(15 * 60);

/// Reads and writes the conversation state of each phone.
///
/// Expiry is lazy: a row older than the TTL is deleted the next time it is
/// read. Storage failures never reach the caller; reads degrade to "no
/// session" and writes are dropped, both with a warning.
#[derive(Debug, Clone)]
pub struct SessionService {
    store: Arc<dyn Store>,
    ttl: Duration,
}

impl SessionService {
    /// Creates a service with the given TTL.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Returns the live session of `phone`, if any.
    pub async fn get(&self, phone: &Phone) -> Option<Session> {
        let row = match self.store.load_session(phone).await {
            Ok(row) => row?,
            Err(e) => {
                tracing::warn!(%phone, error = %e, "session read failed");
                return None;
            }
        };

        let age = Utc::now().signed_duration_since(row.updated_at);
        let expired = age.to_std().is_ok_and(|age| age > self.ttl);
        if expired {
            tracing::debug!(%phone, state = %row.state, "session expired");
            self.clear(phone).await;
            return None;
        }

        let session = Session::from_parts(&row.state, &row.payload);
        if session.is_none() {
            tracing::warn!(%phone, state = %row.state, "undecodable session discarded");
            self.clear(phone).await;
        }
        session
    }

    /// Stores `session` for `phone`, refreshing its timestamp.
    pub async fn set(&self, phone: &Phone, session: &Session) {
        let row = StoredSession {
            phone: phone.clone(),
            state: session.name().to_string(),
            payload: session.payload(),
            updated_at: Utc::now(),
        };
        if let Err(e) = self.store.save_session(&row).await {
            tracing::warn!(%phone, state = %row.state, error = %e, "session write failed");
        }
    }

    /// Removes the session of `phone`.
    pub async fn clear(&self, phone: &Phone) {
        if let Err(e) = self.store.delete_session(phone).await {
            tracing::warn!(%phone, error = %e, "session delete failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{ContainerId, TradeCandidate};
    use crate::persistence::InMemoryStore;

    fn phone() -> Phone {
        let Some(p) = Phone::normalize("5511999990000") else {
            panic!("valid phone");
        };
        p
    }

    fn service(store: &Arc<InMemoryStore>) -> SessionService {
        SessionService::new(Arc::clone(store) as Arc<dyn Store>, DEFAULT_SESSION_TTL)
    }

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let store = Arc::new(InMemoryStore::new());
        let sessions = service(&store);
        let session = Session::EnviarConfirm {
            container_id: ContainerId::new("5511-AAAAAA"),
        };
        sessions.set(&phone(), &session).await;
        assert_eq!(sessions.get(&phone()).await, Some(session));

        sessions.clear(&phone()).await;
        assert_eq!(sessions.get(&phone()).await, None);
    }

    #[tokio::test]
    async fn stale_session_is_deleted_on_read() {
        let store = Arc::new(InMemoryStore::new());
        let sessions = service(&store);
        let stale = StoredSession {
            phone: phone(),
            state: "COMPROVANTE_WAIT".to_string(),
            payload: serde_json::json!({}),
            updated_at: Utc::now() - chrono::Duration::minutes(16),
        };
        let Ok(()) = store.save_session(&stale).await else {
            panic!("save should succeed");
        };

        assert_eq!(sessions.get(&phone()).await, None);
        assert!(matches!(store.load_session(&phone()).await, Ok(None)));
    }

    #[tokio::test]
    async fn fresh_session_inside_ttl_survives() {
        let store = Arc::new(InMemoryStore::new());
        let sessions = service(&store);
        let recent = StoredSession {
            phone: phone(),
            state: "ONBOARD_ASK_NAME".to_string(),
            payload: serde_json::Value::Null,
            updated_at: Utc::now() - chrono::Duration::minutes(14),
        };
        let Ok(()) = store.save_session(&recent).await else {
            panic!("save should succeed");
        };
        assert_eq!(sessions.get(&phone()).await, Some(Session::OnboardAskName));
    }

    #[tokio::test]
    async fn repeated_reads_inside_ttl_are_identical() {
        let store = Arc::new(InMemoryStore::new());
        let sessions = service(&store);
        let session = Session::TrocaListando {
            candidates: vec![TradeCandidate {
                item_id: uuid::Uuid::new_v4(),
                name: "Catan".to_string(),
                credit: 85.0,
            }],
        };
        sessions.set(&phone(), &session).await;
        let Ok(Some(row_before)) = store.load_session(&phone()).await else {
            panic!("session should be stored");
        };

        let first = sessions.get(&phone()).await;
        let second = sessions.get(&phone()).await;
        assert_eq!(first, Some(session));
        assert_eq!(first, second);

        let Ok(Some(row_after)) = store.load_session(&phone()).await else {
            panic!("session should still be stored");
        };
        assert_eq!(row_before, row_after);
    }

    #[tokio::test]
    async fn garbage_rows_are_discarded() {
        let store = Arc::new(InMemoryStore::new());
        let sessions = service(&store);
        let garbage = StoredSession {
            phone: phone(),
            state: "NOT_A_STATE".to_string(),
            payload: serde_json::json!({}),
            updated_at: Utc::now(),
        };
        let Ok(()) = store.save_session(&garbage).await else {
            panic!("save should succeed");
        };
        assert_eq!(sessions.get(&phone()).await, None);
        assert!(matches!(store.load_session(&phone()).await, Ok(None)));
    }

    #[tokio::test]
    async fn storage_failures_degrade_silently() {
        let store = Arc::new(InMemoryStore::new());
        let sessions = service(&store);
        store.fail_operation("load_session").await;
        store.fail_operation("save_session").await;

        sessions.set(&phone(), &Session::ComprovanteWait).await;
        assert_eq!(sessions.get(&phone()).await, None);
    }
}
