use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

pub fn to_u32(value: i64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{field} contains out-of-range value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_bool(value: &str) -> bool {
    matches!(value, "true" | "1")
}

pub fn parse_epoch_millis(value: &str, field: &str) -> Result<DateTime<Utc>> {
    let millis: i64 = value
        .trim()
        .parse()
        .with_context(|| format!("{field} is not an integer: {value}"))?;
    DateTime::from_timestamp_millis(millis).ok_or_else(|| anyhow!("{field} out of range: {millis}"))
}
