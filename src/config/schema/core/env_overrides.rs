use super::Config;
use std::path::PathBuf;

fn env_i64(key: &str) -> Option<i64> {
    std::env::var(key).ok().and_then(|raw| raw.trim().parse().ok())
}

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) =
            std::env::var("SHORTLINKS_DATABASE_PATH").or_else(|_| std::env::var("DATABASE_PATH"))
            && !path.is_empty()
        {
            self.database.path = PathBuf::from(path);
        }

        if let Ok(port_str) = std::env::var("SHORTLINKS_PORT").or_else(|_| std::env::var("PORT"))
            && let Ok(port) = port_str.parse::<u16>()
        {
            self.gateway.port = port;
        }

        if let Ok(host) = std::env::var("SHORTLINKS_HOST").or_else(|_| std::env::var("HOST"))
            && !host.is_empty()
        {
            self.gateway.host = host;
        }

        if let Some(days) = env_i64("SHORTLINKS_DETAILED_RETENTION_DAYS") {
            self.retention.detailed_retention_days = days;
        }
        if let Some(days) = env_i64("SHORTLINKS_AGGREGATE_RETENTION_DAYS") {
            self.retention.aggregate_retention_days = days;
        }
        if let Some(size) = env_i64("SHORTLINKS_BATCH_SIZE") {
            self.retention.batch_size = size;
        }
        if let Some(max) = env_i64("SHORTLINKS_MAX_DELETIONS_PER_RUN") {
            self.retention.max_deletions_per_run = max;
        }
    }
}
