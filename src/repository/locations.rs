//! Locations repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{Location, LocationDescriptor},
};

use super::LocationLookup;

#[derive(Clone)]
pub struct LocationsRepository {
    pool: Pool<Postgres>,
}

impl LocationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationLookup for LocationsRepository {
    async fn resolve(&self, descriptor: &LocationDescriptor) -> AppResult<Location> {
        // The no-op DO UPDATE makes RETURNING yield the existing row too
        let location = sqlx::query_as::<_, Location>(
            r#"
            INSERT INTO locations (lat, lon) VALUES ($1, $2)
            ON CONFLICT (lat, lon) DO UPDATE SET lat = EXCLUDED.lat
            RETURNING id, lat, lon
            "#,
        )
        .bind(descriptor.lat)
        .bind(descriptor.lon)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(location_id = location.id, "Resolved location");
        Ok(location)
    }
}
