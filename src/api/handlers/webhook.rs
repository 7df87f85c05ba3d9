//! `POST /webhook`: entry point of every WhatsApp event.
//!
//! The raw body is kept as [`Bytes`] so the optional HMAC signature can be
//! checked against exactly what was sent. After that the body is parsed
//! leniently: anything that is not JSON is treated as an empty object and
//! ends up dropped by the state machine, still with a 200.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;

use crate::api::dto::WebhookAck;
use crate::app_state::AppState;
use crate::domain::InboundMessage;
use crate::error::{ErrorResponse, LudinhoError};
use crate::service::TurnOutcome;

/// Header carrying the hex HMAC-SHA256 of the raw body.
pub const SIGNATURE_HEADER: &str = "x-signature";

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `body` under `secret`, as expected in [`SIGNATURE_HEADER`].
///
/// # Errors
///
/// Returns [`LudinhoError::Internal`] if the key is rejected by the MAC.
pub fn sign_payload(secret: &str, body: &[u8]) -> Result<String, LudinhoError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| LudinhoError::Internal(format!("hmac key: {e}")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks [`SIGNATURE_HEADER`] against the body. A `sha256=` prefix is accepted.
fn verify_signature(secret: &str, headers: &HeaderMap, body: &[u8]) -> Result<(), LudinhoError> {
    let provided = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .ok_or(LudinhoError::Unauthorized)?;
    let digest = provided.strip_prefix("sha256=").unwrap_or(provided);
    let expected = hex::decode(digest).map_err(|_| LudinhoError::Unauthorized)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| LudinhoError::Internal(format!("hmac key: {e}")))?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| LudinhoError::Unauthorized)
}

fn parse_lenient(body: &[u8]) -> Value {
    match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) => Value::Object(Map::new()),
        Err(e) => {
            tracing::warn!(error = %e, bytes = body.len(), "webhook body is not JSON");
            Value::Object(Map::new())
        }
    }
}

/// `POST /webhook` — Receive a WhatsApp event.
#[utoipa::path(
    post,
    path = "/webhook",
    tag = "Webhook",
    summary = "Receive a WhatsApp event",
    description = "Runs one conversation turn for the sender. Always answers 200 once the \
                   signature (if configured) is valid, including for ignored events.",
    request_body(content = Object, description = "WPPConnect event payload"),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck),
        (status = 401, description = "Signature missing or wrong", body = ErrorResponse),
    )
)]
pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, LudinhoError> {
    if let Some(secret) = state.webhook_secret.as_deref() {
        verify_signature(secret, &headers, &body).inspect_err(|_| {
            tracing::warn!("webhook rejected: bad signature");
        })?;
    }

    let payload = parse_lenient(&body);
    let message = InboundMessage::from_payload(&payload);
    match state.chat.handle(&message).await {
        TurnOutcome::Dropped(reason) => tracing::debug!(?reason, "webhook event dropped"),
        TurnOutcome::Handled(phone) => tracing::debug!(%phone, "webhook turn handled"),
    }

    Ok((StatusCode::OK, Json(WebhookAck::ok())))
}

/// Webhook routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/webhook", post(webhook_handler))
}
