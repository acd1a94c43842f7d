use chrono::{Duration, TimeZone, Utc};

use shortlinks::retention::{CleanupEngine, RetentionPolicy};

use crate::retention_harness::{memory_store, records, seed};

#[tokio::test]
async fn capped_runs_converge_to_an_empty_backlog() {
    let store = memory_store().await;
    let now = Utc.with_ymd_and_hms(2026, 8, 1, 0, 30, 0).unwrap();
    for days_back in 2..=4 {
        seed(&store, &records(now - Duration::days(days_back), 4, 200)).await;
    }
    seed(&store, &records(now - Duration::hours(1), 2, 200)).await;

    let engine = CleanupEngine::new(store.clone(), RetentionPolicy::new(1, 30, 3, 5).unwrap());

    let mut deleted_per_run = Vec::new();
    loop {
        let report = engine.run_cleanup(now).await.unwrap();
        if report.raw_deleted == 0 {
            break;
        }
        deleted_per_run.push(report.raw_deleted);
    }

    assert_eq!(deleted_per_run, [5, 5, 2]);
    assert_eq!(store.count_raw_logs().await.unwrap(), 2);

    let aggregates = store.list_aggregates().await.unwrap();
    assert_eq!(aggregates.len(), 3);
    assert!(aggregates.iter().all(|a| a.total_requests == 4));
}

#[tokio::test]
async fn rerunning_after_completion_changes_nothing() {
    let store = memory_store().await;
    let now = Utc.with_ymd_and_hms(2026, 8, 1, 0, 30, 0).unwrap();
    seed(&store, &records(now - Duration::days(3), 3, 302)).await;

    let engine = CleanupEngine::new(store.clone(), RetentionPolicy::default());
    let old = now - Duration::days(40);
    seed(&store, &records(old, 1, 200)).await;

    let first = engine.run_cleanup(now).await.unwrap();
    assert_eq!(first.raw_deleted, 1);
    let aggregates = store.list_aggregates().await.unwrap();

    let second = engine.run_cleanup(now).await.unwrap();
    assert!(second.is_noop());
    assert_eq!(store.list_aggregates().await.unwrap(), aggregates);
    assert_eq!(store.count_raw_logs().await.unwrap(), 3);
}
