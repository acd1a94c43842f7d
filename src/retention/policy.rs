use crate::config::RetentionConfig;
use crate::error::ConfigError;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

pub const DEFAULT_DETAILED_RETENTION_DAYS: u32 = 30;
pub const DEFAULT_AGGREGATE_RETENTION_DAYS: u32 = 90;
pub const DEFAULT_BATCH_SIZE: u32 = 1_000;
pub const DEFAULT_MAX_DELETIONS_PER_RUN: u32 = 10_000;

/// Retention windows beyond a century are rejected; this keeps cutoff
/// arithmetic inside chrono's representable range.
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// How long request logs and their daily aggregates are kept, and how hard a
/// single cleanup run may hit the database.
///
/// Immutable once built. Every field is positive: a zero input selects that
/// field's default independently of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetentionPolicy {
    detailed_retention_days: u32,
    aggregate_retention_days: u32,
    batch_size: u32,
    max_deletions_per_run: u32,
}

impl RetentionPolicy {
    pub fn new(
        detailed_retention_days: u32,
        aggregate_retention_days: u32,
        batch_size: u32,
        max_deletions_per_run: u32,
    ) -> Result<Self, ConfigError> {
        let policy = Self {
            detailed_retention_days: or_default(
                detailed_retention_days,
                DEFAULT_DETAILED_RETENTION_DAYS,
            ),
            aggregate_retention_days: or_default(
                aggregate_retention_days,
                DEFAULT_AGGREGATE_RETENTION_DAYS,
            ),
            batch_size: or_default(batch_size, DEFAULT_BATCH_SIZE),
            max_deletions_per_run: or_default(
                max_deletions_per_run,
                DEFAULT_MAX_DELETIONS_PER_RUN,
            ),
        };

        for (field, days) in [
            ("detailed_retention_days", policy.detailed_retention_days),
            ("aggregate_retention_days", policy.aggregate_retention_days),
        ] {
            if days > MAX_RETENTION_DAYS {
                return Err(ConfigError::Validation(format!(
                    "{field} = {days} exceeds the {MAX_RETENTION_DAYS}-day limit"
                )));
            }
        }

        Ok(policy)
    }

    /// Build from the `[retention]` config section. Negative values are
    /// rejected here rather than at run time.
    pub fn from_config(config: &RetentionConfig) -> Result<Self, ConfigError> {
        Self::new(
            non_negative("detailed_retention_days", config.detailed_retention_days)?,
            non_negative("aggregate_retention_days", config.aggregate_retention_days)?,
            non_negative("batch_size", config.batch_size)?,
            non_negative("max_deletions_per_run", config.max_deletions_per_run)?,
        )
    }

    pub fn detailed_retention_days(&self) -> u32 {
        self.detailed_retention_days
    }

    pub fn aggregate_retention_days(&self) -> u32 {
        self.aggregate_retention_days
    }

    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    pub fn max_deletions_per_run(&self) -> u32 {
        self.max_deletions_per_run
    }

    /// Raw logs strictly older than this instant may be aggregated and deleted.
    pub fn detailed_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.detailed_retention_days))
    }

    /// Aggregates dated strictly before this day may be deleted.
    ///
    /// This is the first day whose midnight is not before
    /// `now - aggregate_retention_days`, so a day goes as soon as its start
    /// falls behind the cutoff instant.
    pub fn aggregate_cutoff(&self, now: DateTime<Utc>) -> NaiveDate {
        let cutoff = now - Duration::days(i64::from(self.aggregate_retention_days));
        let day = cutoff.date_naive();
        if cutoff.time() == NaiveTime::MIN {
            day
        } else {
            day.succ_opt().unwrap_or(day)
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            detailed_retention_days: DEFAULT_DETAILED_RETENTION_DAYS,
            aggregate_retention_days: DEFAULT_AGGREGATE_RETENTION_DAYS,
            batch_size: DEFAULT_BATCH_SIZE,
            max_deletions_per_run: DEFAULT_MAX_DELETIONS_PER_RUN,
        }
    }
}

fn or_default(value: u32, default: u32) -> u32 {
    if value == 0 { default } else { value }
}

fn non_negative(field: &str, value: i64) -> Result<u32, ConfigError> {
    if value < 0 {
        return Err(ConfigError::Validation(format!(
            "{field} must not be negative (got {value})"
        )));
    }
    u32::try_from(value)
        .map_err(|_| ConfigError::Validation(format!("{field} = {value} is out of range")))
}
