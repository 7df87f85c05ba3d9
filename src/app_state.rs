//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::ChatService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The conversation state machine.
    pub chat: Arc<ChatService>,
    /// Shared secret for webhook signatures; `None` accepts unsigned calls.
    pub webhook_secret: Option<Arc<str>>,
}

impl AppState {
    /// Creates the state.
    #[must_use]
    pub fn new(chat: Arc<ChatService>, webhook_secret: Option<String>) -> Self {
        Self {
            chat,
            webhook_secret: webhook_secret.map(Arc::from),
        }
    }
}
