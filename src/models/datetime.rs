//! Wire format for timestamps (`yyyy-MM-dd HH:mm:ss`, UTC)

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

use crate::error::{AppError, AppResult};

pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a timestamp using the wire format
pub fn format(value: &DateTime<Utc>) -> String {
    value.format(FORMAT).to_string()
}

/// Parse a timestamp from the wire format
pub fn parse(value: &str) -> AppResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| {
            AppError::bad_value(format!(
                "Invalid date '{}', expected format yyyy-MM-dd HH:mm:ss",
                value
            ))
        })
}

/// Parse an optional query parameter
pub fn parse_opt(value: Option<&str>) -> AppResult<Option<DateTime<Utc>>> {
    value.map(parse).transpose()
}

pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(value))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    NaiveDateTime::parse_from_str(&raw, FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

/// Same format for optional fields
pub mod option {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&super::format(v)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| {
                NaiveDateTime::parse_from_str(&raw, super::FORMAT)
                    .map(|naive| naive.and_utc())
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}
