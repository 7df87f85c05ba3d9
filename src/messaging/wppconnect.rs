//! HTTP client for a WPPConnect server.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{Messenger, OutboundFile};
use crate::error::LudinhoError;

/// Sends messages through the WPPConnect REST API
/// (`POST {base_url}/api/{session}/send-message` and `.../send-file-base64`).
#[derive(Debug, Clone)]
pub struct WppConnectMessenger {
    client: reqwest::Client,
    base_url: String,
    session: String,
    bearer: Option<String>,
}

impl WppConnectMessenger {
    /// Creates a client for the given server, session and token.
    ///
    /// # Errors
    ///
    /// Returns [`LudinhoError::Internal`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        session: &str,
        bearer: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LudinhoError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LudinhoError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session: session.to_string(),
            bearer: bearer.filter(|b| !b.is_empty()),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/api/{}/{action}", self.base_url, self.session)
    }

    async fn post(&self, action: &str, body: serde_json::Value) -> Result<(), LudinhoError> {
        let Some(bearer) = self.bearer.as_deref() else {
            return Err(LudinhoError::MessagingError(
                "WA_BEARER is not configured".to_string(),
            ));
        };

        let response = self
            .client
            .post(self.endpoint(action))
            .bearer_auth(bearer)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        debug!(action, status = %status, "gateway response received");
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(LudinhoError::MessagingError(format!(
            "gateway returned {status}: {body}"
        )))
    }
}

#[async_trait]
impl Messenger for WppConnectMessenger {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), LudinhoError> {
        self.post("send-message", json!({ "phone": to, "message": text }))
            .await
    }

    async fn send_file(&self, to: &str, file: &OutboundFile) -> Result<(), LudinhoError> {
        self.post(
            "send-file-base64",
            json!({
                "phone": to,
                "base64": file.data_uri(),
                "filename": file.filename,
                "caption": file.caption,
            }),
        )
        .await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_session_and_action() {
        let Ok(messenger) = WppConnectMessenger::new(
            "http://localhost:21465/",
            "ludolovers",
            Some("token".to_string()),
            Duration::from_secs(20),
        ) else {
            panic!("client should build");
        };
        assert_eq!(
            messenger.endpoint("send-message"),
            "http://localhost:21465/api/ludolovers/send-message"
        );
    }

    #[tokio::test]
    async fn missing_token_fails_without_calling_out() {
        let Ok(messenger) = WppConnectMessenger::new(
            "http://127.0.0.1:9",
            "ludolovers",
            Some(String::new()),
            Duration::from_secs(1),
        ) else {
            panic!("client should build");
        };
        let Err(LudinhoError::MessagingError(msg)) = messenger.send_text("5511", "oi").await else {
            panic!("expected a messaging error");
        };
        assert!(msg.contains("WA_BEARER"));
    }
}
