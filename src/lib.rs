//! Explore With Me events server
//!
//! Event lifecycle (draft, moderation, publication), filtered search and
//! view statistics backed by an external hit collector, exposed as a REST
//! JSON API.

use sqlx::{Pool, Postgres};
use std::sync::Arc;

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    pub pool: Pool<Postgres>,
}
