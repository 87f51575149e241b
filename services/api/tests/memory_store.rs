//! Integration tests for the in-memory store adapter: the subscription
//! contract (full snapshots, newest first, prompt cancellation), scope
//! isolation, and the frozen-at-creation invariant across rule edits.

use api_lib::adapters::MemoryStore;
use chrono::Utc;
use std::time::Duration;
use study_tracker_core::domain::{Rule, SessionDraft, StudySession};
use study_tracker_core::ports::{ScopeId, SessionFeed, SessionStore};
use study_tracker_core::rules::default_rules;
use study_tracker_core::session::{create_session, toggle_reviewed};

fn draft(topic: &str) -> SessionDraft {
    SessionDraft {
        topic: topic.to_string(),
        studied_on: "2024-01-01".to_string(),
        questions_total: 10,
        questions_correct: 8,
    }
}

async fn append(store: &MemoryStore, scope: &ScopeId, topic: &str) -> StudySession {
    let rules = store.load_rules(scope).await.unwrap();
    let new = create_session(&draft(topic), &rules).unwrap();
    store.append_session(scope, new).await.unwrap()
}

async fn recv(feed: &mut SessionFeed) -> Vec<StudySession> {
    tokio::time::timeout(Duration::from_secs(1), feed.next_snapshot())
        .await
        .expect("timed out waiting for a snapshot")
        .expect("feed ended unexpectedly")
}

#[tokio::test]
async fn feed_delivers_full_snapshots_newest_first() {
    let store = MemoryStore::new();
    let scope = ScopeId::shared("test");

    let mut feed = store.subscribe(&scope).await.unwrap();
    assert!(recv(&mut feed).await.is_empty(), "virgin scope starts empty");

    let first = append(&store, &scope, "Arrhythmias").await;
    let snapshot = recv(&mut feed).await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, first.id);

    let second = append(&store, &scope, "Valve disease").await;
    let snapshot = recv(&mut feed).await;
    assert_eq!(snapshot.len(), 2, "every delivery is a complete snapshot");
    assert_eq!(snapshot[0].id, second.id, "newest created comes first");
    assert_eq!(snapshot[1].id, first.id);

    // A toggle is a change like any other.
    let change = toggle_reviewed(&first, Utc::now().date_naive());
    store.set_reviewed(&scope, first.id, change).await.unwrap();
    let snapshot = recv(&mut feed).await;
    let toggled = snapshot.iter().find(|s| s.id == first.id).unwrap();
    assert!(toggled.reviewed);
}

#[tokio::test]
async fn cancelled_feed_stops_delivering() {
    let store = MemoryStore::new();
    let scope = ScopeId::shared("test");

    let mut feed = store.subscribe(&scope).await.unwrap();
    let _ = recv(&mut feed).await;

    feed.cancel();
    append(&store, &scope, "Arrhythmias").await;

    let next = tokio::time::timeout(Duration::from_secs(1), feed.next_snapshot())
        .await
        .expect("cancelled feed should end, not hang");
    assert!(next.is_none());
}

#[tokio::test]
async fn writes_in_another_scope_never_leak() {
    let store = MemoryStore::new();
    let scope_a = ScopeId::shared("alpha");
    let scope_b = ScopeId::shared("beta");

    let mut feed = store.subscribe(&scope_a).await.unwrap();
    let _ = recv(&mut feed).await;

    append(&store, &scope_b, "Neurology").await;
    let ours = append(&store, &scope_a, "Cardiology").await;

    // The only delivery is for our own scope's write.
    let snapshot = recv(&mut feed).await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, ours.id);
    assert_eq!(snapshot[0].topic, "Cardiology");

    assert_eq!(store.list_sessions(&scope_b).await.unwrap().len(), 1);
}

#[tokio::test]
async fn virgin_scope_serves_the_default_rules() {
    let store = MemoryStore::new();
    let scope = ScopeId::shared("fresh");
    assert_eq!(store.load_rules(&scope).await.unwrap(), default_rules());
}

#[tokio::test]
async fn saving_rules_never_reschedules_existing_sessions() {
    let store = MemoryStore::new();
    let scope = ScopeId::shared("test");

    // 80% accuracy lands in the 14-day default band.
    let existing = append(&store, &scope, "Arrhythmias").await;
    assert_eq!(existing.interval_days, 14);

    store
        .replace_rules(&scope, vec![Rule { min: 0, max: 100, days: 2 }])
        .await
        .unwrap();

    let reloaded = store.get_session(&scope, existing.id).await.unwrap();
    assert_eq!(reloaded.interval_days, existing.interval_days);
    assert_eq!(reloaded.next_review_on, existing.next_review_on);

    // Only sessions created after the edit see the new band.
    let fresh = append(&store, &scope, "Valve disease").await;
    assert_eq!(fresh.interval_days, 2);
}

#[tokio::test]
async fn toggle_round_trips_through_the_store() {
    let store = MemoryStore::new();
    let scope = ScopeId::shared("test");
    let today = Utc::now().date_naive();

    let session = append(&store, &scope, "Arrhythmias").await;

    let marked = store
        .set_reviewed(&scope, session.id, toggle_reviewed(&session, today))
        .await
        .unwrap();
    assert!(marked.reviewed);
    assert_eq!(marked.reviewed_on, Some(today));

    let unmarked = store
        .set_reviewed(&scope, session.id, toggle_reviewed(&marked, today))
        .await
        .unwrap();
    assert!(!unmarked.reviewed);
    assert_eq!(unmarked.reviewed_on, None);

    // The frozen scheduling fields never moved.
    assert_eq!(unmarked.accuracy, session.accuracy);
    assert_eq!(unmarked.interval_days, session.interval_days);
    assert_eq!(unmarked.next_review_on, session.next_review_on);
    assert_eq!(unmarked.created_at, session.created_at);
}

#[tokio::test]
async fn unknown_session_reports_not_found() {
    let store = MemoryStore::new();
    let scope = ScopeId::shared("test");
    let err = store
        .get_session(&scope, uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, study_tracker_core::ports::PortError::NotFound(_)));
}
