//! ludinho-webhook server entry point.
//!
//! Loads the configuration, wires the store and the messenger, and serves
//! the webhook over Axum.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::http::StatusCode;
use sqlx::postgres::PgPoolOptions;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use ludinho_webhook::api;
use ludinho_webhook::app_state::AppState;
use ludinho_webhook::config::WebhookConfig;
use ludinho_webhook::messaging::{Messenger, RecordingMessenger, WppConnectMessenger};
use ludinho_webhook::persistence::{InMemoryStore, PostgresStore, Store};
use ludinho_webhook::service::{ChatService, ChatSettings};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn build_store(config: &WebhookConfig) -> anyhow::Result<Arc<dyn Store>> {
    if !config.persistence_enabled {
        tracing::warn!("persistence disabled, using in-memory store");
        return Ok(Arc::new(InMemoryStore::new()));
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(std::time::Duration::from_secs(
            config.database_connect_timeout_secs,
        ))
        .connect(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    let store = PostgresStore::new(pool);
    if config.run_migrations {
        store.migrate().await.context("failed to run migrations")?;
        tracing::info!("database migrations applied");
    }
    Ok(Arc::new(store))
}

fn build_messenger(config: &WebhookConfig) -> anyhow::Result<Arc<dyn Messenger>> {
    if config.wa_bearer.is_empty() {
        tracing::warn!("WA_BEARER is empty, outbound messages are only logged");
        return Ok(Arc::new(RecordingMessenger::new()));
    }
    let messenger = WppConnectMessenger::new(
        &config.wa_base_url,
        &config.wa_session,
        Some(config.wa_bearer.clone()),
        config.wa_timeout,
    )?;
    Ok(Arc::new(messenger))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WebhookConfig::from_env()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    init_tracing(config.log_json);
    tracing::info!(addr = %config.listen_addr, "starting ludinho-webhook");

    let store = build_store(&config).await?;
    let messenger = build_messenger(&config)?;

    let chat = Arc::new(ChatService::new(
        store,
        messenger,
        ChatSettings {
            session_ttl: config.session_ttl,
            operator: config.bot_operator.clone(),
        },
    ));
    let app_state = AppState::new(chat, config.wa_webhook_secret.clone());
    if app_state.webhook_secret.is_none() {
        tracing::warn!("WA_WEBHOOK_SECRET not set, webhook signatures are not checked");
    }

    let app = Router::new()
        .merge(api::build_router())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
