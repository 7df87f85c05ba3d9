//! Webhook acknowledgement.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body returned for every accepted webhook call.
///
/// The provider only needs a 2xx; the body stays the same whether the
/// message was processed or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    /// Always `true`.
    pub ok: bool,
}

impl WebhookAck {
    /// The acknowledgement.
    #[must_use]
    pub const fn ok() -> Self {
        Self { ok: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_serializes_as_ok_true() {
        let json = serde_json::to_value(WebhookAck::ok()).ok();
        assert_eq!(json, Some(serde_json::json!({"ok": true})));
    }
}
