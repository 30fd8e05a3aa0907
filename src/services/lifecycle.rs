//! Event lifecycle: state transitions and guarded field updates
//!
//! | Actor | Action         | From          | To        |
//! |-------|----------------|---------------|-----------|
//! | Owner | CANCEL_REVIEW  | not PUBLISHED | CANCELED  |
//! | Owner | SEND_TO_REVIEW | not PUBLISHED | PENDING   |
//! | Admin | PUBLISH_EVENT  | PENDING       | PUBLISHED |
//! | Admin | REJECT_EVENT   | PENDING       | CANCELED  |
//!
//! Published events are frozen: every update request against one fails
//! with a conflict, whoever sends it.

use chrono::{DateTime, Duration, Utc};

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{Category, Event, EventState, EventStateAction, Location},
};

/// Minimum lead time between submission and the event date at creation
pub const CREATE_LEAD_HOURS: i64 = 2;

/// Who is asking for the change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Owner,
    Admin,
}

impl Actor {
    pub fn allowed_actions(&self) -> &'static [EventStateAction] {
        match self {
            Actor::Owner => &[EventStateAction::CancelReview, EventStateAction::SendToReview],
            Actor::Admin => &[EventStateAction::PublishEvent, EventStateAction::RejectEvent],
        }
    }

    /// Minimum lead time for a new event date on edit
    pub fn edit_lead_hours(&self) -> i64 {
        match self {
            Actor::Owner => 1,
            Actor::Admin => 2,
        }
    }
}

/// Requested changes with category and location already resolved
#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    pub title: Option<String>,
    pub annotation: Option<String>,
    pub description: Option<String>,
    pub participant_limit: Option<i32>,
    pub paid: Option<bool>,
    pub request_moderation: Option<bool>,
    pub event_date: Option<DateTime<Utc>>,
    pub category: Option<Category>,
    pub location: Option<Location>,
}

/// The event date must be strictly later than `now + hours`
pub fn ensure_event_date(event_date: DateTime<Utc>, now: DateTime<Utc>, hours: i64) -> AppResult<()> {
    if event_date <= now + Duration::hours(hours) {
        return Err(AppError::Validation(
            ErrorCode::EventDateTooSoon,
            format!(
                "Event date and time cannot be earlier than {} hours from the current moment",
                hours
            ),
        ));
    }
    Ok(())
}

/// Published events accept no further edits
pub fn ensure_editable(event: &Event) -> AppResult<()> {
    if event.state == EventState::Published {
        return Err(AppError::Conflict(
            ErrorCode::PublishedEventImmutable,
            format!("Event with id={} is published and cannot be changed", event.id),
        ));
    }
    Ok(())
}

/// Parse a transition token and check it belongs to the actor's set
pub fn parse_action(actor: Actor, token: &str) -> AppResult<EventStateAction> {
    token
        .parse::<EventStateAction>()
        .ok()
        .filter(|action| actor.allowed_actions().contains(action))
        .ok_or_else(|| invalid_action(actor))
}

fn invalid_action(actor: Actor) -> AppError {
    let names: Vec<&str> = actor
        .allowed_actions()
        .iter()
        .map(EventStateAction::as_str)
        .collect();
    AppError::Conflict(
        ErrorCode::InvalidStateAction,
        format!("Wrong status. Status should be one of: [{}]", names.join(", ")),
    )
}

/// Apply an accepted action to the event state
pub fn transition(
    event: &mut Event,
    actor: Actor,
    action: EventStateAction,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if !actor.allowed_actions().contains(&action) {
        return Err(invalid_action(actor));
    }

    match action {
        EventStateAction::CancelReview | EventStateAction::SendToReview => {
            ensure_editable(event)?;
        }
        EventStateAction::PublishEvent | EventStateAction::RejectEvent => {
            if event.state != EventState::Pending {
                return Err(AppError::Conflict(
                    ErrorCode::StateConflict,
                    format!("Cannot {} event in state {}", action, event.state),
                ));
            }
        }
    }

    if action == EventStateAction::PublishEvent && event.published_on.is_none() {
        event.published_on = Some(now);
    }
    event.state = action.target_state();
    Ok(())
}

/// Check an update request against the current event before anything is
/// resolved or written: the event must still be editable, the action token
/// must belong to the actor and a new event date must respect the lead time.
pub fn validate_update(
    event: &Event,
    actor: Actor,
    state_action: Option<&str>,
    event_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> AppResult<Option<EventStateAction>> {
    ensure_editable(event)?;

    let action = state_action
        .map(|token| parse_action(actor, token))
        .transpose()?;

    if let Some(date) = event_date {
        ensure_event_date(date, now, actor.edit_lead_hours())?;
    }

    Ok(action)
}

/// Apply validated changes plus an optional transition on a copy of the event.
///
/// Either every change is applied or the error is returned and the
/// original event is left untouched.
pub fn apply_update(
    event: &Event,
    actor: Actor,
    changes: EventChanges,
    action: Option<EventStateAction>,
    now: DateTime<Utc>,
) -> AppResult<Event> {
    let mut updated = event.clone();
    if let Some(title) = changes.title {
        updated.title = title;
    }
    if let Some(annotation) = changes.annotation {
        updated.annotation = annotation;
    }
    if let Some(description) = changes.description {
        updated.description = description;
    }
    if let Some(limit) = changes.participant_limit {
        updated.participant_limit = limit;
    }
    if let Some(paid) = changes.paid {
        updated.paid = paid;
    }
    if let Some(moderation) = changes.request_moderation {
        updated.request_moderation = moderation;
    }
    if let Some(date) = changes.event_date {
        updated.event_date = date;
    }
    if let Some(category) = changes.category {
        updated.category = category;
    }
    if let Some(location) = changes.location {
        updated.location = location;
    }

    if let Some(action) = action {
        transition(&mut updated, actor, action, now)?;
    }

    Ok(updated)
}
