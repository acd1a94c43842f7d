mod core;
mod database;
mod gateway;
mod request_log;
mod retention;

pub use self::core::Config;
pub use database::DatabaseConfig;
pub use gateway::GatewayConfig;
pub use request_log::RequestLogConfig;
pub use retention::RetentionConfig;
