use std::time::Duration;
use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `shortlinks`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; the binary keeps using `anyhow::Result`
/// for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum ShortlinksError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Log store ────────────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Retention / cleanup ──────────────────────────────────────────────
    #[error("retention: {0}")]
    Retention(#[from] RetentionError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation failed: {0}")]
    Validation(String),
}

// ─── Log store errors ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Decode(String),

    #[error("backend not available: {0}")]
    Unavailable(String),
}

// ─── Retention errors ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RetentionError {
    /// A log store call failed; the run's transaction was rolled back.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The run exceeded its deadline and was abandoned.
    #[error("cleanup run exceeded its {0:?} deadline")]
    Timeout(Duration),

    /// The retention settings were rejected before any run started.
    #[error("invalid retention policy: {0}")]
    Config(#[from] ConfigError),
}

impl RetentionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Result type returned by every log store operation.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
