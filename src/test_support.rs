//! Fixtures shared by unit tests: a fixed clock and an in-memory event store

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use crate::{
    clock::Clock,
    error::{AppError, AppResult, ErrorCode},
    models::{
        event::{EventOrder, PageRequest},
        Category, Event, EventState, Location, UserShort,
    },
    repository::EventStore,
    services::filter::EventPredicate,
};

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

/// A pending event one week after [`fixed_now`], owned by user 1
pub fn sample_event(id: i64) -> Event {
    Event {
        id,
        title: "Jazz night".to_string(),
        annotation: "An evening of live music downtown".to_string(),
        description: "Three bands, one stage and a long night of music".to_string(),
        paid: false,
        participant_limit: 0,
        request_moderation: true,
        event_date: fixed_now() + Duration::days(7),
        created_on: fixed_now() - Duration::days(1),
        published_on: None,
        category: Category {
            id: 1,
            name: "Concerts".to_string(),
        },
        initiator: UserShort {
            id: 1,
            name: "Alice".to_string(),
        },
        location: Location {
            id: 1,
            lat: 55.75,
            lon: 37.62,
        },
        confirmed_requests: 0,
        state: EventState::Pending,
        version: 0,
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Event store over a vector, ordering and paging like the SQL store
#[derive(Default)]
pub struct InMemoryEventStore {
    events: Mutex<Vec<Event>>,
    queries: AtomicUsize,
}

impl InMemoryEventStore {
    pub fn with_events(events: Vec<Event>) -> Self {
        Self {
            events: Mutex::new(events),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, id: i64) -> Option<Event> {
        self.events.lock().unwrap().iter().find(|e| e.id == id).cloned()
    }

    /// Number of `query` calls served
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn find(&self, f: impl Fn(&Event) -> bool) -> Option<Event> {
        self.events.lock().unwrap().iter().find(|e| f(e)).cloned()
    }
}

fn paginate(events: Vec<Event>, page: &PageRequest) -> Vec<Event> {
    events
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect()
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert(&self, event: &Event) -> AppResult<Event> {
        let mut events = self.events.lock().unwrap();
        let id = events.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        let stored = Event {
            id,
            version: 0,
            ..event.clone()
        };
        events.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, event: &Event) -> AppResult<Event> {
        let mut events = self.events.lock().unwrap();
        let slot = events
            .iter_mut()
            .find(|e| e.id == event.id)
            .ok_or_else(|| AppError::event_not_found(event.id))?;
        if slot.version != event.version {
            return Err(AppError::Conflict(
                ErrorCode::ConcurrentModification,
                format!("Event with id={} was modified concurrently", event.id),
            ));
        }
        *slot = Event {
            version: event.version + 1,
            ..event.clone()
        };
        Ok(slot.clone())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Event>> {
        Ok(self.find(|e| e.id == id))
    }

    async fn find_by_id_and_initiator(&self, id: i64, initiator_id: i64) -> AppResult<Option<Event>> {
        Ok(self.find(|e| e.id == id && e.initiator.id == initiator_id))
    }

    async fn find_by_id_and_state(&self, id: i64, state: EventState) -> AppResult<Option<Event>> {
        Ok(self.find(|e| e.id == id && e.state == state))
    }

    async fn find_by_initiator(&self, initiator_id: i64, page: &PageRequest) -> AppResult<Vec<Event>> {
        let mut owned: Vec<Event> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.initiator.id == initiator_id)
            .cloned()
            .collect();
        owned.sort_by_key(|e| e.id);
        Ok(paginate(owned, page))
    }

    async fn query(
        &self,
        predicate: Option<&EventPredicate>,
        page: &PageRequest,
        order: EventOrder,
    ) -> AppResult<Vec<Event>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let mut matched: Vec<Event> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| predicate.map_or(true, |p| p.matches(e)))
            .cloned()
            .collect();
        match order {
            EventOrder::Id => matched.sort_by_key(|e| e.id),
            EventOrder::EventDate => matched.sort_by_key(|e| (e.event_date, e.id)),
        }
        Ok(paginate(matched, page))
    }
}
