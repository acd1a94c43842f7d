use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLogConfig {
    /// Record one row per inbound HTTP request
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Records held in memory before a batch is flushed to the store
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Deadline for a single batch flush
    #[serde(default = "default_flush_timeout_secs")]
    pub flush_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_buffer_size() -> usize {
    100
}

fn default_flush_timeout_secs() -> u64 {
    5
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            buffer_size: default_buffer_size(),
            flush_timeout_secs: default_flush_timeout_secs(),
        }
    }
}
