use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use shortlinks::retention::{CleanupEngine, RetentionPolicy, run_with_timeout};

use crate::retention_harness::{Fault, ScriptedStore, memory_store, records, seed};

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 2, 12, 0, 0).unwrap()
}

async fn seeded(fault: Fault) -> (Arc<shortlinks::logs::SqliteLogStore>, Arc<ScriptedStore>) {
    let store = memory_store().await;
    seed(
        &store,
        &records(Utc.with_ymd_and_hms(2026, 6, 29, 10, 0, 0).unwrap(), 3, 200),
    )
    .await;
    seed(
        &store,
        &records(Utc.with_ymd_and_hms(2026, 6, 30, 10, 0, 0).unwrap(), 3, 500),
    )
    .await;
    let scripted = Arc::new(ScriptedStore::new(store.clone(), fault));
    (store, scripted)
}

#[tokio::test]
async fn failed_delete_batch_rolls_back_every_step() {
    let (store, scripted) = seeded(Fault::FailDeleteBatch(2)).await;
    let engine = CleanupEngine::new(scripted.clone(), RetentionPolicy::new(1, 30, 2, 0).unwrap());

    let err = engine.run_cleanup(now()).await.unwrap_err();

    assert!(err.to_string().contains("injected delete failure"));
    assert_eq!(store.count_raw_logs().await.unwrap(), 6);
    assert!(store.list_aggregates().await.unwrap().is_empty());

    let journal = scripted.journal();
    assert_eq!(journal.last().map(String::as_str), Some("rollback"));
    assert!(!journal.iter().any(|entry| entry == "commit"));
}

#[tokio::test]
async fn failed_aggregate_purge_keeps_raw_rows() {
    let (store, scripted) = seeded(Fault::FailAggregateDelete).await;
    let engine = CleanupEngine::new(scripted, RetentionPolicy::new(1, 30, 0, 0).unwrap());

    assert!(engine.run_cleanup(now()).await.is_err());

    assert_eq!(store.count_raw_logs().await.unwrap(), 6);
    assert!(store.list_aggregates().await.unwrap().is_empty());
}

#[tokio::test]
async fn abandoned_run_leaves_no_partial_state() {
    let (store, scripted) = seeded(Fault::HangOnDelete).await;
    let engine = CleanupEngine::new(scripted.clone(), RetentionPolicy::new(1, 30, 0, 0).unwrap());

    let err = run_with_timeout(&engine, now(), Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    // The aggregates were written inside the abandoned transaction.
    assert!(scripted.journal().iter().any(|e| e.starts_with("upsert:")));
    assert_eq!(store.count_raw_logs().await.unwrap(), 6);
    assert!(store.list_aggregates().await.unwrap().is_empty());
}

#[tokio::test]
async fn aggregation_happens_before_any_deletion() {
    let (_store, scripted) = seeded(Fault::None).await;
    let engine = CleanupEngine::new(scripted.clone(), RetentionPolicy::new(1, 30, 2, 0).unwrap());

    let report = engine.run_cleanup(now()).await.unwrap();
    assert_eq!(report.dates_aggregated, 2);
    assert_eq!(report.raw_deleted, 6);

    let journal = scripted.journal();
    let last_upsert = journal
        .iter()
        .rposition(|e| e.starts_with("upsert:"))
        .expect("aggregates should be written");
    let first_delete = journal
        .iter()
        .position(|e| e.starts_with("delete_raw:"))
        .expect("raw rows should be deleted");
    assert!(last_upsert < first_delete, "journal: {journal:?}");
    assert_eq!(journal.last().map(String::as_str), Some("commit"));
}

#[tokio::test]
async fn last_batch_is_shrunk_to_the_cap() {
    let (_store, scripted) = seeded(Fault::None).await;
    let engine = CleanupEngine::new(scripted.clone(), RetentionPolicy::new(1, 30, 4, 5).unwrap());

    let report = engine.run_cleanup(now()).await.unwrap();
    assert_eq!(report.raw_deleted, 5);

    let limits: Vec<String> = scripted
        .journal()
        .into_iter()
        .filter(|e| e.starts_with("delete_raw:"))
        .collect();
    assert_eq!(limits, ["delete_raw:4", "delete_raw:1"]);
}
