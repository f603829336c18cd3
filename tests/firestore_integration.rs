// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with: FIRESTORE_EMULATOR_HOST=localhost:8080 cargo test --test firestore_integration
//!
//! Every test writes under fresh ids, so runs do not interfere.

use bottle_pickup_api::db::{
    check_connectivity, collections, fields, from_document, to_document, DocumentStore, Filter,
    FirestoreStore, Query,
};
use bottle_pickup_api::models::{NotificationRecord, NotificationType, Recipient, Role, UserProfile};
use bottle_pickup_api::services::NotificationFeed;
use futures_util::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

mod common;

async fn test_store() -> FirestoreStore {
    FirestoreStore::new("test-project", Duration::from_millis(100))
        .await
        .expect("Failed to connect to emulator")
}

fn unique_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

fn notification(id: &str, recipient_id: &str, created_at: &str) -> NotificationRecord {
    NotificationRecord {
        id: id.to_string(),
        recipient_id: recipient_id.to_string(),
        recipient_role: Role::Vendor,
        kind: NotificationType::PickupAccepted,
        title: "Pickup Accepted".to_string(),
        message: "Sam accepted your pickup".to_string(),
        pickup_id: Some("p1".to_string()),
        is_read: false,
        deleted: false,
        created_at: created_at.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// DOCUMENT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_connectivity_check() {
    require_emulator!();

    let store = test_store().await;
    check_connectivity(&store, Duration::from_secs(5))
        .await
        .expect("Emulator should be reachable");
}

#[tokio::test]
async fn test_profile_round_trip_and_merge() {
    require_emulator!();

    let store = test_store().await;
    let id = unique_id("driver");
    let profile = common::driver(&id, bottle_pickup_api::models::ApprovalStatus::Rejected);

    store
        .set(collections::USERS, &id, to_document(&profile).unwrap())
        .await
        .unwrap();

    store
        .update(
            collections::USERS,
            &id,
            fields([
                ("approvalStatus", json!("approved")),
                ("rejectionReason", Value::Null),
            ]),
        )
        .await
        .unwrap();

    let doc = store.get(collections::USERS, &id).await.unwrap().unwrap();
    let back: UserProfile = from_document(collections::USERS, doc).unwrap();
    assert!(back.can_transact());
    assert_eq!(back.rejection_reason(), None);
    // Untouched fields survive the merge
    assert_eq!(back.display_name, profile.display_name);

    store.delete(collections::USERS, &id).await.unwrap();
    assert!(store.get(collections::USERS, &id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_missing_document_fails() {
    require_emulator!();

    let store = test_store().await;
    let result = store
        .update(
            collections::USERS,
            &unique_id("ghost"),
            fields([("approvalStatus", json!("approved"))]),
        )
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_query_filters_and_orders() {
    require_emulator!();

    let store = test_store().await;
    let recipient = unique_id("vendor");
    for (id, at) in [("a", "2024-01-01T00:00:01Z"), ("b", "2024-01-01T00:00:03Z"), ("c", "2024-01-01T00:00:02Z")] {
        let record = notification(&format!("{}-{}", recipient, id), &recipient, at);
        store
            .set(collections::NOTIFICATIONS, &record.id, to_document(&record).unwrap())
            .await
            .unwrap();
    }

    let docs = store
        .query(
            collections::NOTIFICATIONS,
            &Query::new()
                .filter(Filter::eq("recipientId", recipient.as_str()))
                .filter(Filter::eq("deleted", false))
                .order_desc("createdAt"),
        )
        .await
        .unwrap();
    let ids: Vec<String> = docs
        .into_iter()
        .map(|d| d["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        ids,
        vec![
            format!("{}-b", recipient),
            format!("{}-c", recipient),
            format!("{}-a", recipient)
        ]
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// FEED TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_feed_subscription_after_clear() {
    require_emulator!();

    let store: Arc<dyn DocumentStore> = Arc::new(test_store().await);
    let feed = NotificationFeed::new(store.clone());
    let vendor_id = unique_id("vendor");
    let me = Recipient::new(vendor_id.as_str(), Role::Vendor);

    let first = notification(&unique_id("n"), &vendor_id, "2024-01-01T00:00:00Z");
    store
        .set(collections::NOTIFICATIONS, &first.id, to_document(&first).unwrap())
        .await
        .unwrap();

    let outcome = feed.clear_all(&me).await.unwrap();
    assert_eq!(outcome.affected, 1);

    let mut stream = feed.subscribe(&me).await.unwrap();
    let snapshot = stream.next().await.unwrap().unwrap();
    assert!(snapshot.is_empty());

    let second = notification(&unique_id("n"), &vendor_id, "2024-01-01T00:00:01Z");
    store
        .set(collections::NOTIFICATIONS, &second.id, to_document(&second).unwrap())
        .await
        .unwrap();

    let snapshot = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("Snapshot after new record")
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, second.id);
}
