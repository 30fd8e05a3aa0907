//! API handlers for the events REST endpoints

pub mod events;
pub mod health;
pub mod openapi;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, OriginalUri},
    http::request::Parts,
    routing::{get, patch},
    Router,
};
use std::{convert::Infallible, net::SocketAddr};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{models::RequestContext, AppState};

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Initiator
        .route(
            "/users/:user_id/events",
            get(events::list_user_events).post(events::create_event),
        )
        .route(
            "/users/:user_id/events/:event_id",
            get(events::get_user_event).patch(events::update_user_event),
        )
        // Admin
        .route("/admin/events", get(events::admin_list_events))
        .route("/admin/events/:event_id", patch(events::admin_update_event))
        // Public
        .route("/events", get(events::search_events))
        .route("/events/:id", get(events::get_event))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Path and client address of the current request, reported to the stats collector
pub struct ClientRequest(pub RequestContext);

#[async_trait]
impl<S> FromRequestParts<S> for ClientRequest
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Nested routers strip their prefix from `parts.uri`
        let path = parts
            .extensions
            .get::<OriginalUri>()
            .map(|uri| uri.path().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        let ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(ClientRequest(RequestContext::new(path, ip)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{AppConfig, DatabaseConfig, LoggingConfig, ServerConfig, StatsConfig},
        repository::Repository,
        services::Services,
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Router over a pool that never connects; only paths rejected before
    /// the store can be exercised
    fn app() -> Router {
        let config = AppConfig {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            stats: StatsConfig::default(),
        };
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database.url)
            .unwrap();
        let services = Services::new(Repository::new(pool.clone()), &config.stats).unwrap();
        create_router(AppState {
            config: Arc::new(config),
            services: Arc::new(services),
            pool,
        })
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response: Response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_unknown_sort_is_bad_request() {
        let (status, body) = send(get("/events?sort=POPULARITY")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 3);
        assert_eq!(body["error"], "BadValue");
    }

    #[tokio::test]
    async fn test_malformed_date_is_bad_request() {
        let (status, _) = send(get("/admin/events?rangeStart=yesterday")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected_before_store() {
        let (status, body) = send(get(
            "/admin/events?rangeStart=2030-01-02%2000:00:00&rangeEnd=2030-01-01%2000:00:00",
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidDateRange");
    }

    #[tokio::test]
    async fn test_zero_page_size_is_rejected() {
        let (status, body) = send(get("/users/1/events?from=0&size=0")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidPage");
    }

    #[tokio::test]
    async fn test_create_validates_payload() {
        let payload = serde_json::json!({
            "annotation": "too short",
            "category": 1,
            "description": "A description long enough to pass",
            "eventDate": "2030-01-01 12:00:00",
            "location": {"lat": 55.75, "lon": 37.62},
            "title": "Concert"
        });
        let request = Request::builder()
            .method("POST")
            .uri("/users/1/events")
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap();

        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BadValue");
    }

    #[tokio::test]
    async fn test_client_request_reads_path_and_ip() {
        let mut request = Request::builder()
            .uri("/events/42?from=0")
            .body(())
            .unwrap();
        let addr: SocketAddr = "192.168.1.10:5555".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        let (mut parts, _) = request.into_parts();

        let ClientRequest(ctx) = ClientRequest::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.path, "/events/42");
        assert_eq!(ctx.ip, "192.168.1.10");
    }

    #[tokio::test]
    async fn test_client_request_without_connect_info() {
        let request = Request::builder().uri("/events").body(()).unwrap();
        let (mut parts, _) = request.into_parts();

        let ClientRequest(ctx) = ClientRequest::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.path, "/events");
        assert_eq!(ctx.ip, "unknown");
    }
}
