//! Event filter and predicate composition
//!
//! A filter is turned into an [`EventPredicate`]: a conjunction of
//! independent [`Criterion`] values. `None` stands for "match everything"
//! and lets the store skip the WHERE clause entirely. Each criterion can be
//! evaluated in-process with [`Criterion::matches`]; the Postgres store
//! renders the same criteria to SQL.

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{Event, EventState},
};

/// One constraint of a composite predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    InitiatorIn(Vec<i64>),
    CategoryIn(Vec<i64>),
    StateIn(Vec<EventState>),
    StateEq(EventState),
    PaidEq(bool),
    /// `event_date >= bound`
    EventDateFrom(DateTime<Utc>),
    /// `event_date <= bound`
    EventDateUntil(DateTime<Utc>),
    /// Case-insensitive substring of annotation OR description (stored lowercased)
    TextContains(String),
    /// `confirmed_requests < participant_limit OR participant_limit = 0`
    Available,
}

impl Criterion {
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            Criterion::InitiatorIn(ids) => ids.contains(&event.initiator.id),
            Criterion::CategoryIn(ids) => ids.contains(&event.category.id),
            Criterion::StateIn(states) => states.contains(&event.state),
            Criterion::StateEq(state) => event.state == *state,
            Criterion::PaidEq(paid) => event.paid == *paid,
            Criterion::EventDateFrom(start) => event.event_date >= *start,
            Criterion::EventDateUntil(end) => event.event_date <= *end,
            Criterion::TextContains(needle) => {
                event.annotation.to_lowercase().contains(needle.as_str())
                    || event.description.to_lowercase().contains(needle.as_str())
            }
            Criterion::Available => event.is_available(),
        }
    }
}

/// Conjunction of criteria; never empty
#[derive(Debug, Clone, PartialEq)]
pub struct EventPredicate {
    criteria: Vec<Criterion>,
}

impl EventPredicate {
    /// AND the given criteria together; `None` when there is nothing to constrain
    pub fn all_of(criteria: Vec<Criterion>) -> Option<Self> {
        if criteria.is_empty() {
            None
        } else {
            Some(Self { criteria })
        }
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.criteria.iter().all(|c| c.matches(event))
    }
}

/// Optional search constraints; unset fields contribute nothing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub initiator_in: Vec<i64>,
    pub category_in: Vec<i64>,
    pub states_in: Vec<EventState>,
    pub paid_eq: Option<bool>,
    pub state_eq: Option<EventState>,
    pub event_date_after: Option<DateTime<Utc>>,
    pub event_date_before: Option<DateTime<Utc>>,
}

impl EventFilter {
    fn criteria(&self) -> Vec<Criterion> {
        let mut criteria = Vec::new();
        if !self.initiator_in.is_empty() {
            criteria.push(Criterion::InitiatorIn(self.initiator_in.clone()));
        }
        if !self.category_in.is_empty() {
            criteria.push(Criterion::CategoryIn(self.category_in.clone()));
        }
        if !self.states_in.is_empty() {
            criteria.push(Criterion::StateIn(self.states_in.clone()));
        }
        if let Some(paid) = self.paid_eq {
            criteria.push(Criterion::PaidEq(paid));
        }
        if let Some(state) = self.state_eq {
            criteria.push(Criterion::StateEq(state));
        }
        if let Some(start) = self.event_date_after {
            criteria.push(Criterion::EventDateFrom(start));
        }
        if let Some(end) = self.event_date_before {
            criteria.push(Criterion::EventDateUntil(end));
        }
        criteria
    }
}

/// Extra switches on top of an [`EventFilter`]
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub text: Option<String>,
    pub only_available: bool,
    /// Restrict to PUBLISHED and, without an explicit range, to upcoming events
    pub published_only: bool,
}

/// Compose the predicate for a filter; `None` means "fetch unfiltered"
pub fn build_predicate(
    filter: &EventFilter,
    options: &SearchOptions,
    now: DateTime<Utc>,
) -> Option<EventPredicate> {
    let mut filter = filter.clone();
    if options.published_only {
        filter.state_eq = Some(EventState::Published);
        if filter.event_date_after.is_none() && filter.event_date_before.is_none() {
            filter.event_date_after = Some(now);
        }
    }

    let mut criteria = filter.criteria();

    if let Some(text) = options.text.as_deref() {
        if !text.trim().is_empty() {
            criteria.push(Criterion::TextContains(text.to_lowercase()));
        }
    }
    if options.only_available {
        criteria.push(Criterion::Available);
    }

    EventPredicate::all_of(criteria)
}

/// Reject a range whose start is after its end
pub fn ensure_range(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> AppResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(AppError::Validation(
            ErrorCode::InvalidDateRange,
            "'rangeStart' must be before 'rangeEnd'".to_string(),
        )),
        _ => Ok(()),
    }
}
