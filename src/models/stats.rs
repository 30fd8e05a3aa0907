//! Stats collector payloads and request context

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::datetime;

/// A served request reported to the stats collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointHit {
    pub app: String,
    pub uri: String,
    pub ip: String,
    #[serde(with = "datetime")]
    pub timestamp: DateTime<Utc>,
}

/// Hit count for one URI, as returned by the collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewStats {
    pub app: String,
    pub uri: String,
    pub hits: u64,
}

/// Parameters of a stats lookup
#[derive(Debug, Clone, PartialEq)]
pub struct StatsQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub uris: Vec<String>,
    /// Count repeated hits from the same IP once
    pub unique: bool,
}

/// Where a read request came from; used for hit recording and view keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Request path without the query string, e.g. `/events/42`
    pub path: String,
    pub ip: String,
}

impl RequestContext {
    pub fn new(path: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ip: ip.into(),
        }
    }
}
