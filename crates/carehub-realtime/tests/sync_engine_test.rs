//! Integration tests for pull coalescing and snapshot replacement.

mod helpers;

use std::sync::Arc;

use carehub_core::error::{AppError, ErrorKind};
use carehub_entity::notification::NotificationType;
use carehub_realtime::store::NotificationStore;
use carehub_realtime::table::{MemoryTable, NotificationTable};
use carehub_realtime::SyncEngine;

use helpers::{GatedTable, notification, sync_config, wait_until};

fn engine(table: Arc<dyn NotificationTable>) -> Arc<SyncEngine> {
    Arc::new(SyncEngine::new(
        table,
        Arc::new(NotificationStore::default()),
        &sync_config(),
    ))
}

#[tokio::test]
async fn test_overlapping_pulls_coalesce_into_one_extra_round() {
    let memory = MemoryTable::new();
    memory.seed([notification(NotificationType::Emergency, "Cardiac arrest", 1)]);
    let table = Arc::new(GatedTable::new(memory));
    let engine = engine(table.clone());

    let first = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.pull().await }
    });
    wait_until("first select to start", || table.active() == 1).await;

    let joined: Vec<_> = (0..3)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.pull().await })
        })
        .collect();
    for _ in 0..5 {
        engine.request_pull();
    }
    wait_until("requests to coalesce", || {
        engine.metrics().snapshot().pulls_coalesced == 8
    })
    .await;

    table
        .inner
        .seed([notification(NotificationType::Alert, "ICU full", 0)]);
    table.release(10);

    let first = first.await.unwrap().unwrap();
    assert!(!first.coalesced);
    assert_eq!(first.records, 2);
    for handle in joined {
        let outcome = handle.await.unwrap().unwrap();
        assert!(outcome.coalesced);
        assert_eq!(outcome.records, 2);
    }

    assert_eq!(table.selects(), 2);
    assert_eq!(table.max_active(), 1);
    assert!(!engine.is_pulling());
}

#[tokio::test]
async fn test_store_holds_last_completed_pull() {
    let memory = MemoryTable::new();
    memory.seed([notification(NotificationType::System, "Backup done", 30)]);
    let table = Arc::new(GatedTable::new(memory));
    let engine = engine(table.clone());

    engine.request_pull();
    wait_until("first select to start", || table.active() == 1).await;
    engine.request_pull();

    table
        .inner
        .seed([notification(NotificationType::Emergency, "Trauma inbound", 0)]);
    table.release(2);
    wait_until("both rounds to finish", || {
        table.selects() == 2 && !engine.is_pulling()
    })
    .await;

    let expected = table.inner.select_recent(50).await.unwrap();
    assert_eq!(engine.store().snapshot(), expected);
    assert_eq!(engine.store().snapshot()[0].title, "Trauma inbound");
    assert_eq!(engine.status().pulls_applied, 2);
}

#[tokio::test]
async fn test_pull_never_exceeds_fifty_records() {
    let table = Arc::new(MemoryTable::new());
    table.seed((0..120).map(|i| notification(NotificationType::Appointment, "Follow-up", i)));
    let engine = engine(table.clone());

    let outcome = engine.pull().await.unwrap();

    assert_eq!(outcome.records, 50);
    assert_eq!(engine.store().len(), 50);
    let snapshot = engine.store().snapshot();
    assert!(
        snapshot
            .windows(2)
            .all(|pair| pair[0].created_at >= pair[1].created_at)
    );
}

#[tokio::test]
async fn test_unread_count_matches_pulled_snapshot() {
    let table = Arc::new(MemoryTable::new());
    let mut records: Vec<_> = (0..12)
        .map(|i| notification(NotificationType::Alert, "Lab result", i))
        .collect();
    for (i, record) in records.iter_mut().enumerate() {
        record.is_read = i % 3 == 0;
    }
    table.seed(records);
    let engine = engine(table.clone());

    let outcome = engine.pull().await.unwrap();

    assert_eq!(outcome.unread, 8);
    assert_eq!(engine.store().unread_count(), 8);
}

#[tokio::test]
async fn test_store_watchers_see_new_versions() {
    let table = Arc::new(MemoryTable::new());
    table.seed([notification(NotificationType::System, "Maintenance", 5)]);
    let engine = engine(table.clone());
    let mut versions = engine.store().watch();

    engine.request_pull();
    versions.changed().await.unwrap();

    assert_eq!(*versions.borrow(), 1);
    assert_eq!(engine.store().len(), 1);
}

#[tokio::test]
async fn test_request_pull_when_idle_runs_once() {
    let table = Arc::new(MemoryTable::new());
    let engine = engine(table.clone());

    engine.request_pull();
    wait_until("pull to finish", || table.select_calls() == 1 && !engine.is_pulling()).await;
    helpers::settle().await;

    assert_eq!(table.select_calls(), 1);
    assert_eq!(engine.metrics().snapshot().pulls_coalesced, 0);
}

#[tokio::test]
async fn test_joined_pull_returns_while_new_rounds_keep_arriving() {
    let memory = MemoryTable::new();
    memory.seed([notification(NotificationType::Alert, "Bed 4 call", 3)]);
    let table = Arc::new(GatedTable::new(memory));
    let engine = engine(table.clone());

    let first = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.pull().await }
    });
    wait_until("round 1 to start", || table.active() == 1).await;
    let joined = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.pull().await }
    });
    wait_until("pull to join", || {
        engine.metrics().snapshot().pulls_coalesced == 1
    })
    .await;

    table.release(1);
    assert!(!first.await.unwrap().unwrap().coalesced);
    wait_until("round 2 to start", || table.active() == 1).await;

    // Another insert lands while round 2 is held, queueing round 3.
    engine.request_pull();
    table.release(1);

    let outcome = tokio::time::timeout(std::time::Duration::from_secs(2), joined)
        .await
        .expect("joined pull waited past its own round")
        .unwrap()
        .unwrap();
    assert!(outcome.coalesced);
    wait_until("round 3 to start", || table.active() == 1).await;
    assert!(engine.is_pulling());

    table.release(1);
    wait_until("drain to finish", || !engine.is_pulling()).await;
    assert_eq!(table.selects(), 3);
}

#[tokio::test]
async fn test_joined_pull_gets_result_of_its_own_round() {
    let memory = MemoryTable::new();
    memory.seed([notification(NotificationType::Emergency, "Code stroke", 2)]);
    let table = Arc::new(GatedTable::new(memory));
    let engine = engine(table.clone());

    let first = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.pull().await }
    });
    wait_until("round 1 to start", || table.active() == 1).await;
    let joined = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.pull().await }
    });
    wait_until("pull to join", || {
        engine.metrics().snapshot().pulls_coalesced == 1
    })
    .await;

    table
        .inner
        .fail_next_select(AppError::database("connection reset"));
    table.release(2);

    let err = first.await.unwrap().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Database);
    let outcome = joined.await.unwrap().unwrap();
    assert!(outcome.coalesced);
    assert_eq!(outcome.records, 1);
    assert!(engine.status().last_error.is_none());
}
