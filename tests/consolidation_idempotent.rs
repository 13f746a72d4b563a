mod support;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use pca_coleta::clock::FixedClock;
use pca_coleta::models::{BatchStatus, RawBatch, Source};
use pca_coleta::store::{ConsolidationStore, JsonFileStore};

use support::sample_record;

fn store_at(dir: &TempDir) -> JsonFileStore {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).unwrap());
    JsonFileStore::new(dir.path(), Arc::new(clock))
}

fn captured_at(minute: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 1, 10, minute, 0).unwrap()
}

#[tokio::test]
async fn consolidation_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = store_at(&dir);

    let batch = RawBatch::new(
        Source::Pncp,
        captured_at(0),
        vec![sample_record(1), sample_record(2)],
    );
    store.append_raw(&batch).await.unwrap();

    let first = store.consolidate().await.unwrap();
    assert_eq!(first.batches, 1);
    assert_eq!(first.upserted, 2);
    assert_eq!(first.skipped, 0);

    let mut state_after_first = store.canonical_records().await.unwrap();
    state_after_first.sort_by(|a, b| a.business_id.cmp(&b.business_id));

    // A second pass sees no raw batches left to do and changes nothing.
    let second = store.consolidate().await.unwrap();
    assert_eq!(second.batches, 0);
    assert_eq!(second.upserted, 0);

    let mut state_after_second = store.canonical_records().await.unwrap();
    state_after_second.sort_by(|a, b| a.business_id.cmp(&b.business_id));

    assert_eq!(state_after_first.len(), state_after_second.len());
    for (a, b) in state_after_first.iter().zip(&state_after_second) {
        assert_eq!(a.business_id, b.business_id);
        assert_eq!(a.record, b.record);
        assert_eq!(a.updated_at, b.updated_at);
    }
}

#[tokio::test]
async fn reappended_identical_data_reproduces_same_state() {
    let dir = TempDir::new().unwrap();
    let store = store_at(&dir);

    let payload = vec![sample_record(1), sample_record(2)];
    store
        .append_raw(&RawBatch::new(Source::Pncp, captured_at(0), payload.clone()))
        .await
        .unwrap();
    store.consolidate().await.unwrap();
    let before = store.canonical_records().await.unwrap();

    store
        .append_raw(&RawBatch::new(Source::Pncp, captured_at(5), payload))
        .await
        .unwrap();
    store.consolidate().await.unwrap();
    let after = store.canonical_records().await.unwrap();

    assert_eq!(before.len(), after.len());
}

#[tokio::test]
async fn newer_batch_overwrites_never_merges() {
    let dir = TempDir::new().unwrap();
    let store = store_at(&dir);

    store
        .append_raw(&RawBatch::new(Source::Pncp, captured_at(0), vec![sample_record(1)]))
        .await
        .unwrap();
    store.consolidate().await.unwrap();

    // Same business id, different content: status changed and category
    // cleared. The canonical record must become exactly the new one.
    let mut revised = sample_record(1);
    revised.status = "REPROVADA".to_string();
    revised.category = String::new();
    store
        .append_raw(&RawBatch::new(Source::Pncp, captured_at(10), vec![revised.clone()]))
        .await
        .unwrap();
    store.consolidate().await.unwrap();

    let records = store.canonical_records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].record, revised);
    assert_eq!(records[0].record.category, "");
}

#[tokio::test]
async fn raw_batches_survive_consolidation_with_flipped_status() {
    let dir = TempDir::new().unwrap();
    let store = store_at(&dir);

    store
        .append_raw(&RawBatch::new(Source::Pgc, captured_at(0), vec![sample_record(7)]))
        .await
        .unwrap();
    store.consolidate().await.unwrap();

    let batches = store.raw_batches().await.unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].status, BatchStatus::Consolidated);
    assert_eq!(batches[0].payload.len(), 1);
    assert_eq!(batches[0].payload[0], sample_record(7));
}
