//! Request log capture and persistence.
//!
//! - [`types`]: raw request records and daily aggregates
//! - [`traits`]: the store / transaction seam the retention engine runs against
//! - [`sqlite`]: the sqlx-backed store
//! - [`buffer`]: bounded staging buffer fed by the HTTP middleware

pub mod buffer;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use buffer::RequestLogBuffer;
pub use sqlite::SqliteLogStore;
pub use traits::{LogStore, LogTransaction, StoreFuture};
pub use types::{DailyAggregate, DailyStats, RequestLogRecord};
