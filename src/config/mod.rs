pub mod schema;

pub use schema::{Config, DatabaseConfig, GatewayConfig, RequestLogConfig, RetentionConfig};
