//! Events API endpoints
//!
//! Three surfaces over the same service: the initiator's own events under
//! `/users/{user_id}/events`, moderation under `/admin/events` and the public
//! catalogue under `/events`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::event::{
        AdminEventQuery, EventFull, EventShort, NewEvent, PageQuery, PageRequest, PublicEventQuery,
        UpdateEventRequest,
    },
    AppState,
};

use super::ClientRequest;

// ---------------------------------------------------------------------------
// Initiator
// ---------------------------------------------------------------------------

/// Create an event (starts PENDING)
#[utoipa::path(
    post,
    path = "/users/{user_id}/events",
    tag = "events",
    params(("user_id" = i64, Path, description = "Initiator ID")),
    request_body = NewEvent,
    responses(
        (status = 201, description = "Event created", body = EventFull),
        (status = 400, description = "Invalid data or event date too soon", body = crate::error::ErrorResponse),
        (status = 404, description = "User or category not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(data): Json<NewEvent>,
) -> AppResult<(StatusCode, Json<EventFull>)> {
    data.validate()?;
    let event = state.services.events.create_event(user_id, &data).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// List events created by a user
#[utoipa::path(
    get,
    path = "/users/{user_id}/events",
    tag = "events",
    params(("user_id" = i64, Path, description = "Initiator ID"), PageQuery),
    responses(
        (status = 200, description = "Events of the user", body = Vec<EventShort>),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_user_events(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Vec<EventShort>>> {
    let page = PageRequest::new(query.from, query.size)?;
    let events = state.services.events.list_owner_events(user_id, &page).await?;
    Ok(Json(events))
}

/// Get one of the user's events
#[utoipa::path(
    get,
    path = "/users/{user_id}/events/{event_id}",
    tag = "events",
    params(
        ("user_id" = i64, Path, description = "Initiator ID"),
        ("event_id" = i64, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Event details", body = EventFull),
        (status = 404, description = "User or event not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_user_event(
    State(state): State<AppState>,
    Path((user_id, event_id)): Path<(i64, i64)>,
) -> AppResult<Json<EventFull>> {
    let event = state.services.events.get_owner_event(user_id, event_id).await?;
    Ok(Json(event))
}

/// Update one of the user's events (not allowed once published)
#[utoipa::path(
    patch,
    path = "/users/{user_id}/events/{event_id}",
    tag = "events",
    params(
        ("user_id" = i64, Path, description = "Initiator ID"),
        ("event_id" = i64, Path, description = "Event ID")
    ),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated", body = EventFull),
        (status = 400, description = "Invalid data", body = crate::error::ErrorResponse),
        (status = 404, description = "User or event not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Event is published or action not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_user_event(
    State(state): State<AppState>,
    Path((user_id, event_id)): Path<(i64, i64)>,
    Json(data): Json<UpdateEventRequest>,
) -> AppResult<Json<EventFull>> {
    data.validate()?;
    let event = state
        .services
        .events
        .update_by_owner(user_id, event_id, data)
        .await?;
    Ok(Json(event))
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

/// Search events for moderation
#[utoipa::path(
    get,
    path = "/admin/events",
    tag = "admin",
    params(AdminEventQuery),
    responses(
        (status = 200, description = "Matching events", body = Vec<EventFull>),
        (status = 400, description = "Invalid filter", body = crate::error::ErrorResponse)
    )
)]
pub async fn admin_list_events(
    State(state): State<AppState>,
    axum_extra::extract::Query(query): axum_extra::extract::Query<AdminEventQuery>,
) -> AppResult<Json<Vec<EventFull>>> {
    let (search, page) = query.into_parts()?;
    let events = state.services.events.admin_list(search, &page).await?;
    Ok(Json(events))
}

/// Edit, publish or reject an event
#[utoipa::path(
    patch,
    path = "/admin/events/{event_id}",
    tag = "admin",
    params(("event_id" = i64, Path, description = "Event ID")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated", body = EventFull),
        (status = 400, description = "Invalid data", body = crate::error::ErrorResponse),
        (status = 404, description = "Event not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Transition not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn admin_update_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Json(data): Json<UpdateEventRequest>,
) -> AppResult<Json<EventFull>> {
    data.validate()?;
    let event = state.services.events.admin_update(event_id, data).await?;
    Ok(Json(event))
}

// ---------------------------------------------------------------------------
// Public
// ---------------------------------------------------------------------------

/// Search published events
#[utoipa::path(
    get,
    path = "/events",
    tag = "public",
    params(PublicEventQuery),
    responses(
        (status = 200, description = "Published events with view counts", body = Vec<EventShort>),
        (status = 400, description = "Invalid filter", body = crate::error::ErrorResponse)
    )
)]
pub async fn search_events(
    State(state): State<AppState>,
    ClientRequest(ctx): ClientRequest,
    axum_extra::extract::Query(query): axum_extra::extract::Query<PublicEventQuery>,
) -> AppResult<Json<Vec<EventShort>>> {
    let (search, page) = query.into_parts()?;
    let events = state.services.events.public_search(search, &page, &ctx).await?;
    Ok(Json(events))
}

/// Get a published event
#[utoipa::path(
    get,
    path = "/events/{id}",
    tag = "public",
    params(("id" = i64, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event details", body = EventFull),
        (status = 404, description = "Event not found or not published", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    ClientRequest(ctx): ClientRequest,
    Path(id): Path<i64>,
) -> AppResult<Json<EventFull>> {
    let event = state.services.events.get_published_event(id, &ctx).await?;
    Ok(Json(event))
}
