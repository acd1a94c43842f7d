use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `[retention]` section.
///
/// The four policy knobs are kept signed so a negative value in the file
/// surfaces as a validation error when the policy is built instead of a
/// parse failure. `0` (or omission) selects the built-in default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Run the periodic cleanup job under `serve`
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Keep detailed request logs for this many days (0 = 30)
    #[serde(default)]
    pub detailed_retention_days: i64,
    /// Keep daily aggregates for this many days (0 = 90)
    #[serde(default)]
    pub aggregate_retention_days: i64,
    /// Rows removed per delete statement (0 = 1000)
    #[serde(default)]
    pub batch_size: i64,
    /// Upper bound on raw rows removed per run (0 = 10000)
    #[serde(default)]
    pub max_deletions_per_run: i64,
    /// Hours between cleanup runs
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,
    /// Deadline for a single cleanup run
    #[serde(default = "default_run_timeout_minutes")]
    pub run_timeout_minutes: u64,
}

fn default_true() -> bool {
    true
}

fn default_interval_hours() -> u64 {
    24
}

fn default_run_timeout_minutes() -> u64 {
    30
}

impl RetentionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours.max(1).saturating_mul(3600))
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_minutes.max(1).saturating_mul(60))
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            detailed_retention_days: 0,
            aggregate_retention_days: 0,
            batch_size: 0,
            max_deletions_per_run: 0,
            interval_hours: default_interval_hours(),
            run_timeout_minutes: default_run_timeout_minutes(),
        }
    }
}
