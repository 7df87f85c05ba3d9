//! HTTP layer: route handlers, DTOs, router composition and the OpenAPI
//! document.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document of the service.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "ludinho-webhook", description = "WhatsApp webhook of the Ludinho assistant"),
    paths(handlers::webhook::webhook_handler, handlers::system::health_handler),
    components(schemas(
        dto::WebhookAck,
        handlers::system::HealthResponse,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "Webhook", description = "Inbound WhatsApp events"),
        (name = "System", description = "Operational endpoints"),
    )
)]
pub struct ApiDoc;

/// Builds the complete router: webhook, health and, with the `swagger-ui`
/// feature, the interactive docs at `/swagger-ui`.
pub fn build_router() -> Router<AppState> {
    let router = handlers::routes();

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_both_endpoints() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/webhook"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
