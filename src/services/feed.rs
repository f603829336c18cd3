// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-app notification feed.
//!
//! Users see records addressed to them. Admins share one feed made of the
//! signup types only, whatever `recipientId` an admin record carries.
//! Recipient and admin scope go into the store query. The `deleted` flag is
//! checked after decoding: records written without it are not deleted, and
//! an equality filter on a missing field never matches.

use crate::db::{collections, fields, from_document, Document, DocumentStore, Filter, Query};
use crate::error::AppError;
use crate::models::notification::ADMIN_VISIBLE_TYPES;
use crate::models::{NotificationRecord, Recipient, Role};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Live sequence of full feed snapshots, newest first.
pub type NotificationStream = BoxStream<'static, Result<Vec<NotificationRecord>, AppError>>;

/// Result of a bulk update. Bulk updates are not atomic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub affected: usize,
    pub failed: usize,
}

/// Whether `recipient` would see `record` in their feed.
pub fn is_visible_to(recipient: &Recipient, record: &NotificationRecord) -> bool {
    if record.deleted {
        return false;
    }
    match recipient.role {
        Role::Admin => {
            record.recipient_role == Role::Admin
                && ADMIN_VISIBLE_TYPES.contains(&record.kind.as_str())
        }
        _ => record.recipient_id == recipient.id,
    }
}

fn feed_query(recipient: &Recipient) -> Query {
    let scoped = match recipient.role {
        Role::Admin => Query::new()
            .filter(Filter::eq("recipientRole", Role::Admin.as_str()))
            .filter(Filter::is_in("type", ADMIN_VISIBLE_TYPES)),
        _ => Query::new().filter(Filter::eq("recipientId", recipient.id.as_str())),
    };
    scoped.order_desc("createdAt")
}

/// Decode a query snapshot, keeping only what `recipient` sees.
fn decode_visible(
    recipient: &Recipient,
    docs: Vec<Document>,
) -> Result<Vec<NotificationRecord>, AppError> {
    let mut visible = Vec::with_capacity(docs.len());
    for doc in docs {
        let record: NotificationRecord = from_document(collections::NOTIFICATIONS, doc)?;
        if is_visible_to(recipient, &record) {
            visible.push(record);
        }
    }
    Ok(visible)
}

#[derive(Clone)]
pub struct NotificationFeed {
    store: Arc<dyn DocumentStore>,
}

impl NotificationFeed {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn subscribe(&self, recipient: &Recipient) -> Result<NotificationStream, AppError> {
        let docs = self
            .store
            .subscribe(collections::NOTIFICATIONS, feed_query(recipient))
            .await?;
        let recipient = recipient.clone();
        Ok(docs
            .map(move |snapshot| snapshot.and_then(|docs| decode_visible(&recipient, docs)))
            .boxed())
    }

    pub async fn snapshot(&self, recipient: &Recipient) -> Result<Vec<NotificationRecord>, AppError> {
        let docs = self
            .store
            .query(collections::NOTIFICATIONS, &feed_query(recipient))
            .await?;
        decode_visible(recipient, docs)
    }

    pub async fn get(&self, notification_id: &str) -> Result<NotificationRecord, AppError> {
        let doc = self
            .store
            .get(collections::NOTIFICATIONS, notification_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("notification {}", notification_id)))?;
        from_document(collections::NOTIFICATIONS, doc)
    }

    /// Idempotent.
    pub async fn mark_read(&self, notification_id: &str) -> Result<(), AppError> {
        self.store
            .update(
                collections::NOTIFICATIONS,
                notification_id,
                fields([("isRead", json!(true))]),
            )
            .await
    }

    /// Mark every visible unread record read, one write each.
    pub async fn mark_all_read(&self, recipient: &Recipient) -> Result<BulkOutcome, AppError> {
        let unread: Vec<_> = self
            .snapshot(recipient)
            .await?
            .into_iter()
            .filter(|r| !r.is_read)
            .collect();
        Ok(self.bulk_update(&unread, "isRead").await)
    }

    /// Soft-delete the currently visible set. Later records are unaffected.
    pub async fn clear_all(&self, recipient: &Recipient) -> Result<BulkOutcome, AppError> {
        let visible = self.snapshot(recipient).await?;
        Ok(self.bulk_update(&visible, "deleted").await)
    }

    pub async fn unread_count(&self, recipient: &Recipient) -> Result<usize, AppError> {
        Ok(self
            .snapshot(recipient)
            .await?
            .iter()
            .filter(|r| !r.is_read)
            .count())
    }

    async fn bulk_update(&self, records: &[NotificationRecord], flag: &str) -> BulkOutcome {
        let mut outcome = BulkOutcome {
            affected: 0,
            failed: 0,
        };
        for record in records {
            match self
                .store
                .update(
                    collections::NOTIFICATIONS,
                    &record.id,
                    fields([(flag, json!(true))]),
                )
                .await
            {
                Ok(()) => outcome.affected += 1,
                Err(e) => {
                    outcome.failed += 1;
                    tracing::warn!(notification_id = %record.id, flag, error = %e, "Bulk notification update failed");
                }
            }
        }
        outcome
    }
}
