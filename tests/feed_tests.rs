// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-app feed tests.
//!
//! These tests verify that:
//! 1. Admin feeds show signup records only, whichever admin reads them
//! 2. Users only see records addressed to them
//! 3. Mark-all-read is idempotent
//! 4. Clear-all hides the current set and leaves later records visible
//! 5. Subscriptions deliver a fresh snapshot after each change

use bottle_pickup_api::db::{collections, to_document, DocumentStore};
use bottle_pickup_api::models::{NotificationRecord, NotificationType, Recipient, Role};
use futures_util::StreamExt;
use std::time::Duration;

mod common;
use common::TestHarness;

fn record(
    id: &str,
    recipient_id: &str,
    role: Role,
    kind: NotificationType,
    created_at: &str,
) -> NotificationRecord {
    NotificationRecord {
        id: id.to_string(),
        recipient_id: recipient_id.to_string(),
        recipient_role: role,
        kind,
        title: format!("Title {}", id),
        message: format!("Message {}", id),
        pickup_id: None,
        is_read: false,
        deleted: false,
        created_at: created_at.to_string(),
    }
}

async fn put(h: &TestHarness, record: &NotificationRecord) {
    h.store
        .set(
            collections::NOTIFICATIONS,
            &record.id,
            to_document(record).unwrap(),
        )
        .await
        .unwrap();
}

fn ids(records: &[NotificationRecord]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}

#[tokio::test]
async fn test_admin_feed_scope() {
    let h = TestHarness::new();
    put(
        &h,
        &record("n1", "admin", Role::Admin, NotificationType::DriverSignup, "2024-01-01T00:00:01Z"),
    )
    .await;
    put(
        &h,
        &record("n2", "admin", Role::Admin, NotificationType::VendorSignup, "2024-01-01T00:00:02Z"),
    )
    .await;
    // Addressed to a specific admin account; still shared
    put(
        &h,
        &record("n3", "a7", Role::Admin, NotificationType::UserSignup, "2024-01-01T00:00:03Z"),
    )
    .await;
    // Not a signup type
    put(
        &h,
        &record("n4", "admin", Role::Admin, NotificationType::PickupAccepted, "2024-01-01T00:00:04Z"),
    )
    .await;
    // Signup type addressed to a vendor
    put(
        &h,
        &record("n5", "v1", Role::Vendor, NotificationType::VendorSignup, "2024-01-01T00:00:05Z"),
    )
    .await;

    let admin_feed = h
        .state
        .feed
        .snapshot(&Recipient::for_session("a1", Role::Admin))
        .await
        .unwrap();
    assert_eq!(ids(&admin_feed), vec!["n3", "n2", "n1"]);

    let other_admin = h
        .state
        .feed
        .snapshot(&Recipient::for_session("a2", Role::Admin))
        .await
        .unwrap();
    assert_eq!(ids(&other_admin), ids(&admin_feed));

    let vendor_feed = h
        .state
        .feed
        .snapshot(&Recipient::new("v1", Role::Vendor))
        .await
        .unwrap();
    assert_eq!(ids(&vendor_feed), vec!["n5"]);
}

#[tokio::test]
async fn test_user_feed_is_newest_first_and_private() {
    let h = TestHarness::new();
    put(&h, &record("old", "v1", Role::Vendor, NotificationType::PickupAccepted, "2024-01-01T09:00:00Z")).await;
    put(&h, &record("new", "v1", Role::Vendor, NotificationType::PickupCompleted, "2024-01-02T09:00:00Z")).await;
    put(&h, &record("theirs", "v2", Role::Vendor, NotificationType::PickupAccepted, "2024-01-03T09:00:00Z")).await;

    let feed = h
        .state
        .feed
        .snapshot(&Recipient::new("v1", Role::Vendor))
        .await
        .unwrap();
    assert_eq!(ids(&feed), vec!["new", "old"]);
}

#[tokio::test]
async fn test_unknown_type_is_kept() {
    let h = TestHarness::new();
    put(
        &h,
        &record("n1", "d1", Role::Driver, NotificationType::Other("route_changed".to_string()), "2024-01-01T00:00:00Z"),
    )
    .await;

    let feed = h
        .state
        .feed
        .snapshot(&Recipient::new("d1", Role::Driver))
        .await
        .unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].kind.as_str(), "route_changed");
}

#[tokio::test]
async fn test_mark_all_read_is_idempotent() {
    let h = TestHarness::new();
    let me = Recipient::new("v1", Role::Vendor);
    for i in 0..3 {
        put(
            &h,
            &record(&format!("n{}", i), "v1", Role::Vendor, NotificationType::PickupAccepted, "2024-01-01T00:00:00Z"),
        )
        .await;
    }
    assert_eq!(h.state.feed.unread_count(&me).await.unwrap(), 3);

    let first = h.state.feed.mark_all_read(&me).await.unwrap();
    assert_eq!(first.affected, 3);
    assert_eq!(first.failed, 0);
    let after_first = h.state.feed.snapshot(&me).await.unwrap();

    let second = h.state.feed.mark_all_read(&me).await.unwrap();
    assert_eq!(second.affected, 0);
    let after_second = h.state.feed.snapshot(&me).await.unwrap();

    assert_eq!(after_first, after_second);
    assert_eq!(h.state.feed.unread_count(&me).await.unwrap(), 0);
}

#[tokio::test]
async fn test_mark_read_is_idempotent() {
    let h = TestHarness::new();
    let me = Recipient::new("v1", Role::Vendor);
    put(&h, &record("n1", "v1", Role::Vendor, NotificationType::PickupAccepted, "2024-01-01T00:00:00Z")).await;

    h.state.feed.mark_read("n1").await.unwrap();
    h.state.feed.mark_read("n1").await.unwrap();
    assert_eq!(h.state.feed.unread_count(&me).await.unwrap(), 0);
}

#[tokio::test]
async fn test_clear_all_then_new_record() {
    let h = TestHarness::new();
    let me = Recipient::new("d1", Role::Driver);
    put(&h, &record("n1", "d1", Role::Driver, NotificationType::TestNotification, "2024-01-01T00:00:00Z")).await;
    put(&h, &record("n2", "d1", Role::Driver, NotificationType::TestNotification, "2024-01-01T00:00:01Z")).await;

    let outcome = h.state.feed.clear_all(&me).await.unwrap();
    assert_eq!(outcome.affected, 2);

    let mut stream = h.state.feed.subscribe(&me).await.unwrap();
    let first = stream.next().await.unwrap().unwrap();
    assert!(first.is_empty());

    // Soft delete: the documents are still stored
    assert_eq!(h.store.count(collections::NOTIFICATIONS), 2);

    put(&h, &record("n3", "d1", Role::Driver, NotificationType::TestNotification, "2024-01-01T00:00:02Z")).await;
    let next = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("snapshot after new record")
        .unwrap()
        .unwrap();
    assert_eq!(ids(&next), vec!["n3"]);
}

#[tokio::test]
async fn test_subscription_sees_read_state_changes() {
    let h = TestHarness::new();
    let me = Recipient::new("v1", Role::Vendor);
    put(&h, &record("n1", "v1", Role::Vendor, NotificationType::PickupAccepted, "2024-01-01T00:00:00Z")).await;

    let mut stream = h.state.feed.subscribe(&me).await.unwrap();
    let first = stream.next().await.unwrap().unwrap();
    assert!(!first[0].is_read);

    h.state.feed.mark_read("n1").await.unwrap();
    let next = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("snapshot after mark_read")
        .unwrap()
        .unwrap();
    assert!(next[0].is_read);
}

#[tokio::test]
async fn test_bulk_update_counts_failures() {
    let h = TestHarness::new();
    let me = Recipient::new("v1", Role::Vendor);
    put(&h, &record("n1", "v1", Role::Vendor, NotificationType::PickupAccepted, "2024-01-01T00:00:00Z")).await;
    put(&h, &record("n2", "v1", Role::Vendor, NotificationType::PickupAccepted, "2024-01-01T00:00:01Z")).await;

    h.store.fail_writes_to(collections::NOTIFICATIONS);
    let outcome = h.state.feed.mark_all_read(&me).await.unwrap();
    assert_eq!(outcome.affected, 0);
    assert_eq!(outcome.failed, 2);

    h.store.restore_writes_to(collections::NOTIFICATIONS);
    assert_eq!(h.state.feed.unread_count(&me).await.unwrap(), 2);
}

#[tokio::test]
async fn test_record_without_deleted_flag_is_visible() {
    let h = TestHarness::new();
    let mut doc = to_document(&record(
        "n1",
        "v1",
        Role::Vendor,
        NotificationType::PickupAccepted,
        "2024-01-01T00:00:01.000Z",
    ))
    .unwrap();
    doc.remove("deleted");
    h.store
        .set(collections::NOTIFICATIONS, "n1", doc)
        .await
        .unwrap();

    let me = Recipient::new("v1", Role::Vendor);
    assert!(!h.state.feed.get("n1").await.unwrap().deleted);
    assert_eq!(ids(&h.state.feed.snapshot(&me).await.unwrap()), vec!["n1"]);
    assert_eq!(h.state.feed.unread_count(&me).await.unwrap(), 1);

    let outcome = h.state.feed.clear_all(&me).await.unwrap();
    assert_eq!(outcome.affected, 1);
    assert!(h.state.feed.snapshot(&me).await.unwrap().is_empty());
}
