//! Business logic services

pub mod events;
pub mod filter;
pub mod lifecycle;
pub mod stats;

use std::sync::Arc;

use crate::{
    clock::{Clock, SystemClock},
    config::StatsConfig,
    error::AppResult,
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub events: events::EventsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, stats_config: &StatsConfig) -> AppResult<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let stats_client = Arc::new(stats::HttpStatsClient::new(stats_config)?);
        let aggregator = stats::ViewStatsAggregator::new(stats_client, clock.clone(), stats_config.app_name.clone());

        Ok(Self {
            events: events::EventsService::new(
                Arc::new(repository.events.clone()),
                Arc::new(repository.users.clone()),
                Arc::new(repository.categories.clone()),
                Arc::new(repository.locations.clone()),
                aggregator,
                clock,
            ),
        })
    }
}
