use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use shortlinks::retention::{CleanupEngine, RetentionPolicy, Scheduler, SchedulerState};

use crate::retention_harness::{memory_store, records, seed};

#[tokio::test]
async fn scheduler_drives_real_cleanup_runs() {
    let store = memory_store().await;
    let old = (Utc::now() - chrono::Duration::days(45))
        .date_naive()
        .and_hms_opt(12, 0, 0)
        .unwrap()
        .and_utc();
    seed(&store, &records(old, 3, 200)).await;

    let engine = Arc::new(CleanupEngine::new(store.clone(), RetentionPolicy::default()));
    let scheduler = Scheduler::new(engine, Duration::from_millis(40), Duration::from_secs(5));
    assert!(scheduler.start());

    let mut succeeded = 0;
    for _ in 0..100 {
        succeeded = scheduler.metrics().runs_succeeded;
        if succeeded > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(succeeded > 0, "scheduler never completed a run");

    scheduler.shutdown().await;
    assert_eq!(scheduler.state(), SchedulerState::Stopped);

    assert_eq!(store.count_raw_logs().await.unwrap(), 0);
    let aggregates = store.list_aggregates().await.unwrap();
    assert_eq!(aggregates.len(), 1);
    assert_eq!(aggregates[0].total_requests, 3);

    let metrics = scheduler.metrics();
    let report = metrics.last_report.expect("last report recorded");
    assert!(metrics.last_error.is_none());
    assert!(report.raw_deleted == 3 || report.is_noop());
}
