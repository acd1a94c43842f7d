//! Request log retention.
//!
//! Raw request logs older than the detailed window are summarized into one
//! aggregate row per day and then deleted in bounded batches; aggregates older
//! than the aggregate window are deleted outright. A [`Scheduler`] repeats the
//! pass on a fixed period.

pub mod aggregator;
pub mod engine;
pub mod policy;
pub mod scheduler;

pub use aggregator::aggregate_date;
pub use engine::{CleanupEngine, CleanupReport};
pub use policy::RetentionPolicy;
pub use scheduler::{
    JobFuture, RetentionJob, Scheduler, SchedulerMetrics, SchedulerState, run_with_timeout,
};
