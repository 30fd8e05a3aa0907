//! View statistics: hit recording and per-URI view counts
//!
//! The collector is best-effort. Hits are sent from a spawned task and
//! lookups that fail degrade to zero views; neither ever fails the request
//! being served.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{collections::HashMap, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::{
    clock::Clock,
    config::StatsConfig,
    error::{AppError, AppResult},
    models::{datetime, EndpointHit, Event, RequestContext, StatsQuery, ViewStats},
};

/// Failure talking to the stats collector; never surfaced to API callers
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("stats collector request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("stats collector answered with status {0}")]
    Status(u16),
}

/// Contract of the external hit collector
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsClient: Send + Sync {
    async fn record_hit(&self, hit: &EndpointHit) -> Result<(), StatsError>;

    async fn query(&self, query: &StatsQuery) -> Result<Vec<ViewStats>, StatsError>;
}

/// Key under which views of one item of a collection are stored
pub fn collection_key(request_path: &str, event_id: i64) -> String {
    format!("{}/{}", request_path.trim_end_matches('/'), event_id)
}

/// HTTP client for the stats server (`POST /hit`, `GET /stats`)
#[derive(Clone)]
pub struct HttpStatsClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStatsClient {
    pub fn new(config: &StatsConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create stats client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl StatsClient for HttpStatsClient {
    async fn record_hit(&self, hit: &EndpointHit) -> Result<(), StatsError> {
        let response = self
            .client
            .post(format!("{}/hit", self.base_url))
            .json(hit)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StatsError::Status(response.status().as_u16()));
        }
        Ok(())
    }

    async fn query(&self, query: &StatsQuery) -> Result<Vec<ViewStats>, StatsError> {
        let mut params = vec![
            ("start", datetime::format(&query.start)),
            ("end", datetime::format(&query.end)),
        ];
        params.extend(query.uris.iter().map(|uri| ("uris", uri.clone())));
        params.push(("unique", query.unique.to_string()));

        let response = self
            .client
            .get(format!("{}/stats", self.base_url))
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StatsError::Status(response.status().as_u16()));
        }
        Ok(response.json::<Vec<ViewStats>>().await?)
    }
}

/// Records hits and merges collector results into URI-keyed view counts
#[derive(Clone)]
pub struct ViewStatsAggregator {
    client: Arc<dyn StatsClient>,
    clock: Arc<dyn Clock>,
    app_name: String,
}

impl ViewStatsAggregator {
    pub fn new(client: Arc<dyn StatsClient>, clock: Arc<dyn Clock>, app_name: impl Into<String>) -> Self {
        Self {
            client,
            clock,
            app_name: app_name.into(),
        }
    }

    /// Report that `ctx.path` was served. Runs in the background; a failure
    /// is only logged.
    pub fn record_hit(&self, ctx: &RequestContext) -> JoinHandle<()> {
        let hit = EndpointHit {
            app: self.app_name.clone(),
            uri: ctx.path.clone(),
            ip: ctx.ip.clone(),
            timestamp: self.clock.now(),
        };
        let client = Arc::clone(&self.client);

        tokio::spawn(async move {
            if let Err(e) = client.record_hit(&hit).await {
                tracing::warn!(uri = %hit.uri, error = %e, "Failed to record endpoint hit");
            }
        })
    }

    /// Views keyed by `"<request_path>/<event_id>"` within `[start, end]`
    pub async fn fetch_counts(
        &self,
        request_path: &str,
        event_ids: &[i64],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        unique: bool,
    ) -> HashMap<String, u64> {
        if event_ids.is_empty() {
            return HashMap::new();
        }
        let uris = event_ids
            .iter()
            .map(|id| collection_key(request_path, *id))
            .collect();
        self.lookup(uris, start, end, unique).await
    }

    /// Views of every event of a collection response, keyed with [`collection_key`].
    /// The window opens at the earliest publication among `events`.
    pub async fn collection_views(&self, request_path: &str, events: &[Event]) -> HashMap<String, u64> {
        let Some(start) = events.iter().map(window_start).min() else {
            return HashMap::new();
        };
        let ids: Vec<i64> = events.iter().map(|e| e.id).collect();
        self.fetch_counts(request_path, &ids, start, self.clock.now(), false)
            .await
    }

    /// Unique views of a single resource, read under the exact request path
    pub async fn single_views(&self, request_path: &str, event: &Event) -> u64 {
        let views = self
            .lookup(
                vec![request_path.to_string()],
                window_start(event),
                self.clock.now(),
                true,
            )
            .await;
        views.get(request_path).copied().unwrap_or(0)
    }

    async fn lookup(
        &self,
        uris: Vec<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        unique: bool,
    ) -> HashMap<String, u64> {
        let query = StatsQuery {
            start,
            end,
            uris,
            unique,
        };
        match self.client.query(&query).await {
            Ok(stats) => merge(stats),
            Err(e) => {
                tracing::warn!(error = %e, uris = query.uris.len(), "Stats collector unavailable, reporting zero views");
                HashMap::new()
            }
        }
    }
}

fn window_start(event: &Event) -> DateTime<Utc> {
    event.published_on.unwrap_or(event.created_on)
}

fn merge(stats: Vec<ViewStats>) -> HashMap<String, u64> {
    let mut views = HashMap::with_capacity(stats.len());
    for entry in stats {
        *views.entry(entry.uri).or_insert(0) += entry.hits;
    }
    views
}
