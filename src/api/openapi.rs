//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{events, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Explore With Me Events API",
        version = "1.0.0",
        description = "Event lifecycle, moderation and public event search"
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Initiator
        events::create_event,
        events::list_user_events,
        events::get_user_event,
        events::update_user_event,
        // Admin
        events::admin_list_events,
        events::admin_update_event,
        // Public
        events::search_events,
        events::get_event,
    ),
    components(
        schemas(
            crate::models::event::NewEvent,
            crate::models::event::UpdateEventRequest,
            crate::models::event::EventFull,
            crate::models::event::EventShort,
            crate::models::event::EventState,
            crate::models::event::EventStateAction,
            crate::models::Category,
            crate::models::UserShort,
            crate::models::Location,
            crate::models::LocationDescriptor,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "events", description = "Events of the current initiator"),
        (name = "admin", description = "Event moderation"),
        (name = "public", description = "Published event catalogue")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_event_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/users/{user_id}/events",
            "/users/{user_id}/events/{event_id}",
            "/admin/events",
            "/admin/events/{event_id}",
            "/events",
            "/events/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
