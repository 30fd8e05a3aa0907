//! Event model, lifecycle enums, request payloads and projections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{
    category::Category,
    datetime,
    location::{Location, LocationDescriptor},
    user::UserShort,
};
use crate::error::{AppError, AppResult, ErrorCode};

// ---------------------------------------------------------------------------
// EventState
// ---------------------------------------------------------------------------

/// Lifecycle state of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventState {
    Pending,
    Published,
    Canceled,
}

impl EventState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventState::Pending => "PENDING",
            EventState::Published => "PUBLISHED",
            EventState::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventState {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(EventState::Pending),
            "PUBLISHED" => Ok(EventState::Published),
            "CANCELED" => Ok(EventState::Canceled),
            _ => Err(AppError::bad_value(format!("Unknown event state: {}", s))),
        }
    }
}

// ---------------------------------------------------------------------------
// EventStateAction
// ---------------------------------------------------------------------------

/// State-transition request submitted with an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStateAction {
    CancelReview,
    PublishEvent,
    RejectEvent,
    SendToReview,
}

impl EventStateAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStateAction::CancelReview => "CANCEL_REVIEW",
            EventStateAction::PublishEvent => "PUBLISH_EVENT",
            EventStateAction::RejectEvent => "REJECT_EVENT",
            EventStateAction::SendToReview => "SEND_TO_REVIEW",
        }
    }

    /// State the event ends up in once the action is accepted
    pub fn target_state(&self) -> EventState {
        match self {
            EventStateAction::CancelReview | EventStateAction::RejectEvent => EventState::Canceled,
            EventStateAction::SendToReview => EventState::Pending,
            EventStateAction::PublishEvent => EventState::Published,
        }
    }
}

impl fmt::Display for EventStateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStateAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CANCEL_REVIEW" => Ok(EventStateAction::CancelReview),
            "PUBLISH_EVENT" => Ok(EventStateAction::PublishEvent),
            "REJECT_EVENT" => Ok(EventStateAction::RejectEvent),
            "SEND_TO_REVIEW" => Ok(EventStateAction::SendToReview),
            _ => Err(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Event aggregate
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Assigned by the store on insert
    pub id: i64,
    pub title: String,
    /// Short description
    pub annotation: String,
    pub description: String,
    pub paid: bool,
    /// 0 means unlimited
    pub participant_limit: i32,
    pub request_moderation: bool,
    pub event_date: DateTime<Utc>,
    pub created_on: DateTime<Utc>,
    pub published_on: Option<DateTime<Utc>>,
    pub category: Category,
    pub initiator: UserShort,
    pub location: Location,
    /// Approved participation requests, maintained by the requests subsystem
    pub confirmed_requests: i32,
    pub state: EventState,
    /// Optimistic concurrency counter
    pub version: i32,
}

impl Event {
    /// Build a pending event from a creation request
    pub fn new_pending(
        data: &NewEvent,
        initiator: UserShort,
        category: Category,
        location: Location,
        created_on: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            title: data.title.clone(),
            annotation: data.annotation.clone(),
            description: data.description.clone(),
            paid: data.paid,
            participant_limit: data.participant_limit,
            request_moderation: data.request_moderation,
            event_date: data.event_date,
            created_on,
            published_on: None,
            category,
            initiator,
            location,
            confirmed_requests: 0,
            state: EventState::Pending,
            version: 0,
        }
    }

    /// Open capacity: unlimited, or fewer confirmed requests than the limit
    pub fn is_available(&self) -> bool {
        self.participant_limit == 0 || self.confirmed_requests < self.participant_limit
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

fn default_request_moderation() -> bool {
    true
}

/// Create event request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    #[validate(length(min = 20, max = 2000, message = "Annotation must be 20 to 2000 characters"))]
    pub annotation: String,
    /// Category id
    pub category: i64,
    #[validate(length(min = 20, max = 7000, message = "Description must be 20 to 7000 characters"))]
    pub description: String,
    #[serde(with = "datetime")]
    #[schema(value_type = String, example = "2030-12-31 15:10:05")]
    pub event_date: DateTime<Utc>,
    #[validate(nested)]
    pub location: LocationDescriptor,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    #[validate(range(min = 0, message = "Participant limit cannot be negative"))]
    pub participant_limit: i32,
    #[serde(default = "default_request_moderation")]
    pub request_moderation: bool,
    #[validate(length(min = 3, max = 120, message = "Title must be 3 to 120 characters"))]
    pub title: String,
}

/// Partial update; an absent field leaves the stored value unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[validate(length(min = 20, max = 2000, message = "Annotation must be 20 to 2000 characters"))]
    pub annotation: Option<String>,
    pub category: Option<i64>,
    #[validate(length(min = 20, max = 7000, message = "Description must be 20 to 7000 characters"))]
    pub description: Option<String>,
    #[serde(default, with = "datetime::option")]
    #[schema(value_type = Option<String>, example = "2030-12-31 15:10:05")]
    pub event_date: Option<DateTime<Utc>>,
    #[validate(nested)]
    pub location: Option<LocationDescriptor>,
    pub paid: Option<bool>,
    #[validate(range(min = 0, message = "Participant limit cannot be negative"))]
    pub participant_limit: Option<i32>,
    pub request_moderation: Option<bool>,
    /// Transition token (CANCEL_REVIEW, SEND_TO_REVIEW, PUBLISH_EVENT, REJECT_EVENT)
    pub state_action: Option<String>,
    #[validate(length(min = 3, max = 120, message = "Title must be 3 to 120 characters"))]
    pub title: Option<String>,
}

/// Sort order of the public search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSort {
    EventDate,
    Views,
}

impl FromStr for EventSort {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EVENT_DATE" => Ok(EventSort::EventDate),
            "VIEWS" => Ok(EventSort::Views),
            _ => Err(AppError::bad_value(format!("Unknown sort type: {}", s))),
        }
    }
}

/// Ordering requested from the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventOrder {
    /// Insertion order (by id)
    #[default]
    Id,
    EventDate,
}

/// Offset pagination (`from` is rounded down to a page boundary)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub from: i64,
    pub size: i64,
}

impl PageRequest {
    pub const DEFAULT_SIZE: i64 = 10;

    pub fn new(from: Option<i64>, size: Option<i64>) -> AppResult<Self> {
        let from = from.unwrap_or(0);
        let size = size.unwrap_or(Self::DEFAULT_SIZE);
        if from < 0 || size <= 0 {
            return Err(AppError::Validation(
                ErrorCode::InvalidPage,
                format!("Invalid paging: from={}, size={}", from, size),
            ));
        }
        Ok(Self { from, size })
    }

    pub fn offset(&self) -> i64 {
        (self.from / self.size) * self.size
    }

    pub fn limit(&self) -> i64 {
        self.size
    }
}

// ---------------------------------------------------------------------------
// Search parameters
// ---------------------------------------------------------------------------

/// Admin listing criteria
#[derive(Debug, Clone, Default)]
pub struct AdminSearch {
    pub users: Vec<i64>,
    pub states: Vec<EventState>,
    pub categories: Vec<i64>,
    pub range_start: Option<DateTime<Utc>>,
    pub range_end: Option<DateTime<Utc>>,
}

/// Public search criteria
#[derive(Debug, Clone, Default)]
pub struct PublicSearch {
    pub text: Option<String>,
    pub categories: Vec<i64>,
    pub paid: Option<bool>,
    pub range_start: Option<DateTime<Utc>>,
    pub range_end: Option<DateTime<Utc>>,
    pub only_available: bool,
    pub sort: Option<EventSort>,
}

/// Paging query parameters
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub from: Option<i64>,
    pub size: Option<i64>,
}

/// Query parameters for the admin listing (lists use repeated keys)
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct AdminEventQuery {
    #[serde(default)]
    pub users: Vec<i64>,
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default)]
    pub categories: Vec<i64>,
    /// yyyy-MM-dd HH:mm:ss
    pub range_start: Option<String>,
    /// yyyy-MM-dd HH:mm:ss
    pub range_end: Option<String>,
    pub from: Option<i64>,
    pub size: Option<i64>,
}

impl AdminEventQuery {
    pub fn into_parts(self) -> AppResult<(AdminSearch, PageRequest)> {
        let states = self
            .states
            .iter()
            .map(|s| s.parse::<EventState>())
            .collect::<AppResult<Vec<_>>>()?;
        let search = AdminSearch {
            users: self.users,
            states,
            categories: self.categories,
            range_start: datetime::parse_opt(self.range_start.as_deref())?,
            range_end: datetime::parse_opt(self.range_end.as_deref())?,
        };
        Ok((search, PageRequest::new(self.from, self.size)?))
    }
}

/// Query parameters for the public search
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct PublicEventQuery {
    /// Case-insensitive text in annotation or description
    pub text: Option<String>,
    #[serde(default)]
    pub categories: Vec<i64>,
    pub paid: Option<bool>,
    /// yyyy-MM-dd HH:mm:ss
    pub range_start: Option<String>,
    /// yyyy-MM-dd HH:mm:ss
    pub range_end: Option<String>,
    pub only_available: Option<bool>,
    /// EVENT_DATE or VIEWS
    pub sort: Option<String>,
    pub from: Option<i64>,
    pub size: Option<i64>,
}

impl PublicEventQuery {
    pub fn into_parts(self) -> AppResult<(PublicSearch, PageRequest)> {
        let sort = self.sort.as_deref().map(str::parse).transpose()?;
        let search = PublicSearch {
            text: self.text,
            categories: self.categories,
            paid: self.paid,
            range_start: datetime::parse_opt(self.range_start.as_deref())?,
            range_end: datetime::parse_opt(self.range_end.as_deref())?,
            only_available: self.only_available.unwrap_or(false),
            sort,
        };
        Ok((search, PageRequest::new(self.from, self.size)?))
    }
}

// ---------------------------------------------------------------------------
// Projections
// ---------------------------------------------------------------------------

/// Full event representation
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventFull {
    pub id: i64,
    pub title: String,
    pub annotation: String,
    pub description: String,
    pub category: Category,
    pub initiator: UserShort,
    pub location: Location,
    pub paid: bool,
    #[serde(with = "datetime")]
    #[schema(value_type = String)]
    pub event_date: DateTime<Utc>,
    #[serde(with = "datetime")]
    #[schema(value_type = String)]
    pub created_on: DateTime<Utc>,
    #[serde(with = "datetime::option")]
    #[schema(value_type = Option<String>)]
    pub published_on: Option<DateTime<Utc>>,
    pub participant_limit: i32,
    pub request_moderation: bool,
    pub confirmed_requests: i32,
    pub state: EventState,
    pub views: u64,
}

impl EventFull {
    pub fn from_event(event: &Event, views: u64) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            annotation: event.annotation.clone(),
            description: event.description.clone(),
            category: event.category.clone(),
            initiator: event.initiator.clone(),
            location: event.location.clone(),
            paid: event.paid,
            event_date: event.event_date,
            created_on: event.created_on,
            published_on: event.published_on,
            participant_limit: event.participant_limit,
            request_moderation: event.request_moderation,
            confirmed_requests: event.confirmed_requests,
            state: event.state,
            views,
        }
    }
}

/// Short event representation used by listings
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventShort {
    pub id: i64,
    pub title: String,
    pub annotation: String,
    pub category: Category,
    pub initiator: UserShort,
    pub paid: bool,
    #[serde(with = "datetime")]
    #[schema(value_type = String)]
    pub event_date: DateTime<Utc>,
    pub confirmed_requests: i32,
    pub views: u64,
}

impl EventShort {
    pub fn from_event(event: &Event, views: u64) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            annotation: event.annotation.clone(),
            category: event.category.clone(),
            initiator: event.initiator.clone(),
            paid: event.paid,
            event_date: event.event_date,
            confirmed_requests: event.confirmed_requests,
            views,
        }
    }
}
