#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Database connection string.
    pub database_url: String,

    // =========================
    // Attempt log configuration
    // =========================
    /// How many entries the "recent failed attempts" view returns.
    ///
    /// This is an operational window, not pagination: it bounds the
    /// startup probe and any ops tooling reading the same view.
    pub recent_attempts_limit: u32,

    /// Age (in days) past which failed attempts are pruned.
    ///
    /// Purpose:
    /// - keep the append-only log from growing without bound
    /// - rejected attempts lose diagnostic value once the stock
    ///   situation that produced them is long gone
    pub attempt_retention_days: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://stockflow_dev.db".to_string());

        Self {
            database_url,

            // Attempt log defaults:
            // - "last 50" matches what operators actually scan
            // - 90 days comfortably covers a stocktaking cycle
            recent_attempts_limit: 50,
            attempt_retention_days: 90,
        }
    }
}
