//! HTTP endpoint handlers.

pub mod system;
pub mod webhook;

use axum::Router;

use crate::app_state::AppState;

/// Composes the webhook and system routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(webhook::routes())
        .merge(system::routes())
}
