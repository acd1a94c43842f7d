use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use tempfile::TempDir;

use shortlinks::logs::SqliteLogStore;
use shortlinks::retention::{CleanupEngine, RetentionPolicy};

use crate::retention_harness::{records, seed};

#[tokio::test]
async fn aggregates_survive_reopening_the_database() {
    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("data").join("request_logs.db");
    let now = Utc.with_ymd_and_hms(2026, 9, 10, 8, 0, 0).unwrap();
    let day = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();

    {
        let store = Arc::new(SqliteLogStore::open(&path, 2).await.expect("open store"));
        let mut batch = records(Utc.with_ymd_and_hms(2026, 9, 1, 13, 0, 0).unwrap(), 2, 200);
        batch.extend(records(
            Utc.with_ymd_and_hms(2026, 9, 1, 14, 0, 0).unwrap(),
            2,
            503,
        ));
        seed(&store, &batch).await;
        seed(&store, &records(now - Duration::minutes(5), 1, 200)).await;

        let engine = CleanupEngine::new(store.clone(), RetentionPolicy::new(7, 0, 0, 0).unwrap());
        let report = engine.run_cleanup(now).await.expect("cleanup");
        assert_eq!(report.raw_deleted, 4);
        store.close().await;
    }

    assert!(path.exists());

    let reopened = SqliteLogStore::open(&path, 2).await.expect("reopen store");
    assert_eq!(reopened.count_raw_logs().await.unwrap(), 1);

    let aggregate = reopened
        .get_aggregate(day)
        .await
        .unwrap()
        .expect("aggregate should persist");
    assert_eq!(aggregate.total_requests, 4);
    assert_eq!(aggregate.status_2xx, 2);
    assert_eq!(aggregate.status_5xx, 2);
    assert_eq!(aggregate.error_count, 2);
    reopened.close().await;
}
