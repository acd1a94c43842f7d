use super::super::{DatabaseConfig, GatewayConfig, RequestLogConfig, RetentionConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Data directory - computed from home, not serialized
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub request_log: RequestLogConfig,
}

impl Config {
    /// Resolved location of the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        if self.database.path.is_absolute() {
            self.database.path.clone()
        } else {
            self.data_dir.join(&self.database.path)
        }
    }
}
