// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification fan-out tests.
//!
//! These tests verify that:
//! 1. Each event reaches exactly the recipients and channels it should
//! 2. A failure on one channel never stops the others or the caller
//! 3. Channel failures are counted per channel
//! 4. The self-test notification is scheduled locally with a delay

use bottle_pickup_api::db::{collections, from_document, DocumentStore, Query};
use bottle_pickup_api::models::{
    ApprovalStatus, NotificationRecord, NotificationType, Recipient, Role,
};
use bottle_pickup_api::services::fanout::TEST_NOTIFICATION_DELAY;
use bottle_pickup_api::services::{
    Channel, ChannelOutcome, FanoutEvent, NewPickup, PickupSummary,
};
use std::sync::atomic::Ordering;

mod common;
use common::{driver, vendor, ScriptedProvider, TestHarness};

async fn all_notifications(h: &TestHarness) -> Vec<NotificationRecord> {
    h.store
        .query(collections::NOTIFICATIONS, &Query::new())
        .await
        .unwrap()
        .into_iter()
        .map(|doc| from_document(collections::NOTIFICATIONS, doc).unwrap())
        .collect()
}

fn summary() -> PickupSummary {
    PickupSummary {
        id: "p1".to_string(),
        vendor_id: "v1".to_string(),
        vendor_name: "Corner Shop".to_string(),
        address: "1 Main St".to_string(),
        bottle_count: 12,
    }
}

#[tokio::test]
async fn test_pickup_accepted_with_failing_push() {
    let h = TestHarness::new();
    h.push.set_token("v1", "ExponentPushToken[v1]");
    h.push.fail_sends.store(true, Ordering::SeqCst);

    let report = h
        .state
        .fanout
        .dispatch(FanoutEvent::PickupAccepted {
            pickup: summary(),
            driver_name: "Sam".to_string(),
        })
        .await;

    assert_eq!(report.in_app, ChannelOutcome::Delivered);
    assert!(matches!(report.push, ChannelOutcome::Failed(_)));
    assert_eq!(report.email, ChannelOutcome::Skipped);

    let records = all_notifications(&h).await;
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.recipient_id, "v1");
    assert_eq!(record.recipient_role, Role::Vendor);
    assert_eq!(record.kind, NotificationType::PickupAccepted);
    assert_eq!(record.pickup_id.as_deref(), Some("p1"));
    assert!(!record.is_read);
    assert!(record.message.contains("Sam"));

    // Attempted exactly once, failure counted
    assert_eq!(h.push.lookups_for("v1"), 1);
    assert_eq!(h.state.failures.failures(Channel::Push), 1);
    assert_eq!(h.state.failures.failures(Channel::InApp), 0);
}

#[tokio::test]
async fn test_pickup_accepted_without_token() {
    let h = TestHarness::new();

    let report = h
        .state
        .fanout
        .dispatch(FanoutEvent::PickupAccepted {
            pickup: summary(),
            driver_name: "Sam".to_string(),
        })
        .await;

    assert_eq!(report.in_app, ChannelOutcome::Delivered);
    assert!(matches!(report.push, ChannelOutcome::Failed(_)));
    assert_eq!(h.push.sent_count(), 0);
}

#[tokio::test]
async fn test_in_app_failure_does_not_block_push() {
    let h = TestHarness::new();
    h.push.set_token("v1", "tok");
    h.store.fail_writes_to(collections::NOTIFICATIONS);

    let report = h
        .state
        .fanout
        .dispatch(FanoutEvent::PickupCancelled {
            pickup: summary(),
            driver_name: "Sam".to_string(),
            reason: "Flat tire".to_string(),
        })
        .await;

    assert!(matches!(report.in_app, ChannelOutcome::Failed(_)));
    assert_eq!(report.push, ChannelOutcome::Delivered);
    assert_eq!(h.state.failures.failures(Channel::InApp), 1);

    let sent = h.push.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "tok");
    assert!(sent[0].1.body.contains("Flat tire"));
}

#[tokio::test]
async fn test_pickup_completed_is_in_app_only() {
    let h = TestHarness::new();
    h.push.set_token("v1", "tok");

    let report = h
        .state
        .fanout
        .dispatch(FanoutEvent::PickupCompleted {
            pickup: summary(),
            driver_name: "Sam".to_string(),
        })
        .await;

    assert_eq!(report.in_app, ChannelOutcome::Delivered);
    assert_eq!(report.push, ChannelOutcome::Skipped);
    assert_eq!(report.email, ChannelOutcome::Skipped);
    assert_eq!(h.push.sent_count(), 0);
    assert_eq!(all_notifications(&h).await[0].kind, NotificationType::PickupCompleted);
}

#[tokio::test]
async fn test_driver_signup_alerts_admin_and_operator() {
    let h = TestHarness::new();

    let profile = h
        .state
        .profiles
        .sign_up(
            serde_json::from_value(serde_json::json!({
                "email": "Jane@Example.com",
                "password": "secret1",
                "displayName": "Jane",
                "role": "driver",
                "vehicleInfo": "Blue pickup truck"
            }))
            .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(profile.approval_status(), ApprovalStatus::Pending);
    assert_eq!(profile.email, "jane@example.com");
    assert!(!profile.email_verified);
    assert_eq!(h.identity.verification_emails.load(Ordering::SeqCst), 1);

    // Admin feed gets a driver_signup record
    let records = all_notifications(&h).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].recipient_id, "admin");
    assert_eq!(records[0].recipient_role, Role::Admin);
    assert_eq!(records[0].kind, NotificationType::DriverSignup);

    // Operator gets an email naming the role
    let sent = h.mail[0].delivered();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, h.state.config.operator_email);
    assert!(sent[0].subject.contains("DRIVER"));
    assert!(sent[0].subject.contains("Jane"));
    assert!(sent[0].text.contains("Jane"));

    // The signup is also visible through the admin feed
    let feed = h.state.feed.snapshot(&Recipient::admin()).await.unwrap();
    assert_eq!(feed.len(), 1);
}

#[tokio::test]
async fn test_signup_succeeds_when_every_channel_fails() {
    let h = TestHarness::with_email_providers(vec![ScriptedProvider::failing("webhook")]);
    h.store.fail_writes_to(collections::NOTIFICATIONS);
    h.identity
        .fail_verification_email
        .store(true, Ordering::SeqCst);

    let profile = h
        .state
        .profiles
        .sign_up(
            serde_json::from_value(serde_json::json!({
                "email": "shop@example.com",
                "password": "secret1",
                "displayName": "Shop",
                "role": "vendor",
                "businessName": "Shop",
                "businessCategory": "Bar",
                "businessLocation": "2 High St"
            }))
            .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(profile.approval_status(), ApprovalStatus::Pending);
    assert!(h.store.get(collections::USERS, &profile.id).await.unwrap().is_some());
    assert_eq!(h.state.failures.failures(Channel::InApp), 1);
    assert_eq!(h.state.failures.failures(Channel::Email), 1);
}

#[tokio::test]
async fn test_scheduling_notifies_nobody() {
    let h = TestHarness::new();
    h.seed(&vendor("v1", ApprovalStatus::Approved)).await;

    h.state
        .pickups
        .schedule(
            "v1",
            NewPickup {
                address: "1 Main St".to_string(),
                bottle_count: 4,
                scheduled_for: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(h.store.count(collections::NOTIFICATIONS), 0);
    assert_eq!(h.push.sent_count(), 0);
    assert_eq!(h.mail[0].attempts(), 0);
}

#[tokio::test]
async fn test_self_test_notification_is_delayed_local_push() {
    let h = TestHarness::new();
    h.seed(&driver("d1", ApprovalStatus::Approved)).await;
    h.push.set_token("d1", "ExponentPushToken[d1]");

    let report = h
        .state
        .fanout
        .dispatch(FanoutEvent::TestNotification {
            user_id: "d1".to_string(),
            role: Role::Driver,
        })
        .await;

    assert_eq!(report.in_app, ChannelOutcome::Delivered);
    assert_eq!(report.push, ChannelOutcome::Scheduled);

    let scheduled = h.push.scheduled.lock().unwrap().clone();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].0, "d1");
    assert_eq!(scheduled[0].2, TEST_NOTIFICATION_DELAY);

    let feed = h
        .state
        .feed
        .snapshot(&Recipient::new("d1", Role::Driver))
        .await
        .unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].kind, NotificationType::TestNotification);
}

#[tokio::test]
async fn test_self_test_without_permission_fails_push_only() {
    let h = TestHarness::new();
    h.seed(&driver("d1", ApprovalStatus::Approved)).await;

    let report = h
        .state
        .fanout
        .dispatch(FanoutEvent::TestNotification {
            user_id: "d1".to_string(),
            role: Role::Driver,
        })
        .await;

    assert_eq!(report.in_app, ChannelOutcome::Delivered);
    assert!(matches!(report.push, ChannelOutcome::Failed(_)));
    assert!(h.push.scheduled.lock().unwrap().is_empty());
    assert_eq!(h.state.failures.failures(Channel::Push), 1);
}
