use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::attempts::model::FailedAttempt;

/// Append-only log of denied movement attempts.
#[async_trait]
pub trait FailedAttemptRecorder: Send + Sync {
    /// Append one attempt. Existing rows are never updated.
    async fn record(&self, attempt: &FailedAttempt) -> Result<()>;

    /// Latest attempts, newest first.
    async fn recent(&self, limit: u32) -> Result<Vec<FailedAttempt>>;

    /// Delete attempts recorded strictly before `cutoff`; returns how many
    /// rows went away.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
