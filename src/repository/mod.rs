//! Repository layer for database operations
//!
//! Services only see the traits below; the PostgreSQL implementations are
//! bundled in [`Repository`].

pub mod categories;
pub mod events;
pub mod locations;
pub mod users;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        event::{EventOrder, PageRequest},
        Category, Event, EventState, Location, LocationDescriptor, UserShort,
    },
    services::filter::EventPredicate,
};

/// Persistence of event aggregates
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Store a new event and return it with its assigned id
    async fn insert(&self, event: &Event) -> AppResult<Event>;

    /// Persist `event` if its version is still current; the returned event
    /// carries the bumped version. A stale version is a Conflict.
    async fn update(&self, event: &Event) -> AppResult<Event>;

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Event>>;

    async fn find_by_id_and_initiator(&self, id: i64, initiator_id: i64) -> AppResult<Option<Event>>;

    async fn find_by_id_and_state(&self, id: i64, state: EventState) -> AppResult<Option<Event>>;

    /// Events of one initiator ordered by id
    async fn find_by_initiator(&self, initiator_id: i64, page: &PageRequest) -> AppResult<Vec<Event>>;

    /// Events matching `predicate` (all events when `None`)
    async fn query(
        &self,
        predicate: Option<&EventPredicate>,
        page: &PageRequest,
        order: EventOrder,
    ) -> AppResult<Vec<Event>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserLookup: Send + Sync {
    /// NotFound when the user does not exist
    async fn find_by_id(&self, id: i64) -> AppResult<UserShort>;

    async fn exists(&self, id: i64) -> AppResult<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CategoryLookup: Send + Sync {
    /// NotFound when the category does not exist
    async fn find_by_id(&self, id: i64) -> AppResult<Category>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationLookup: Send + Sync {
    /// Find the stored location with these coordinates, creating it if needed
    async fn resolve(&self, descriptor: &LocationDescriptor) -> AppResult<Location>;
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub events: events::EventsRepository,
    pub users: users::UsersRepository,
    pub categories: categories::CategoriesRepository,
    pub locations: locations::LocationsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            events: events::EventsRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            categories: categories::CategoriesRepository::new(pool.clone()),
            locations: locations::LocationsRepository::new(pool.clone()),
            pool,
        }
    }
}
