use anyhow::anyhow;
use chrono::{DateTime, Utc};

/// Timestamp of a model value as the epoch-millisecond form stored in BIGINT columns.
pub fn to_epoch_ms(ts: &DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Inverse of [`to_epoch_ms`]. Errors on values outside chrono's representable range.
pub fn from_epoch_ms(ms: i64) -> anyhow::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| anyhow!("epoch ms out of range: {ms}"))
}
