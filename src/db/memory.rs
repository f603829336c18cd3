// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Used by the test suite and for running the API without a Firestore
//! emulator. Every write bumps a change counter on a `watch` channel so
//! subscriptions can re-run their query.

use super::{Document, DocumentStore, DocumentStream, Query};
use crate::error::AppError;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use futures_util::StreamExt;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
struct StoredDoc {
    /// Insertion sequence; breaks ties between equal sort keys (newest wins).
    seq: u64,
    doc: Document,
}

struct Inner {
    collections: DashMap<String, DashMap<String, StoredDoc>>,
    seq: AtomicU64,
    changes: watch::Sender<u64>,
    failing_collections: DashSet<String>,
}

/// Document store kept entirely in memory.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                collections: DashMap::new(),
                seq: AtomicU64::new(0),
                changes,
                failing_collections: DashSet::new(),
            }),
        }
    }

    /// Make every write to `collection` fail with a database error.
    ///
    /// Fault injection for exercising channel isolation in tests.
    pub fn fail_writes_to(&self, collection: &str) {
        self.inner.failing_collections.insert(collection.to_string());
    }

    /// Undo [`MemoryStore::fail_writes_to`].
    pub fn restore_writes_to(&self, collection: &str) {
        self.inner.failing_collections.remove(collection);
    }

    /// Number of documents in a collection, including soft-deleted ones.
    pub fn count(&self, collection: &str) -> usize {
        self.inner
            .collections
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    fn check_writable(&self, collection: &str) -> Result<(), AppError> {
        if self.inner.failing_collections.contains(collection) {
            return Err(AppError::Database(format!(
                "writes to {} are unavailable",
                collection
            )));
        }
        Ok(())
    }

    fn notify(&self) {
        self.inner.changes.send_modify(|version| *version += 1);
    }

    fn run_query(&self, collection: &str, query: &Query) -> Vec<Document> {
        let Some(col) = self.inner.collections.get(collection) else {
            return Vec::new();
        };

        let mut matched: Vec<StoredDoc> = col
            .iter()
            .filter(|entry| query.matches(&entry.value().doc))
            .map(|entry| entry.value().clone())
            .collect();

        matched.sort_by(|a, b| {
            query
                .compare(&a.doc, &b.doc)
                .then_with(|| b.seq.cmp(&a.seq))
        });

        matched.into_iter().map(|stored| stored.doc).collect()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        Ok(self
            .inner
            .collections
            .get(collection)
            .and_then(|col| col.get(id).map(|stored| stored.doc.clone())))
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, AppError> {
        Ok(self.run_query(collection, query))
    }

    async fn subscribe(
        &self,
        collection: &str,
        query: Query,
    ) -> Result<DocumentStream, AppError> {
        let store = self.clone();
        let collection = collection.to_string();
        let rx = self.inner.changes.subscribe();

        let stream = futures_util::stream::unfold(
            (store, rx, None::<Vec<Document>>),
            move |(store, mut rx, last)| {
                let collection = collection.clone();
                let query = query.clone();
                async move {
                    loop {
                        if last.is_some() && rx.changed().await.is_err() {
                            return None;
                        }
                        let snapshot = store.run_query(&collection, &query);
                        if last.as_ref() != Some(&snapshot) {
                            let next = Some(snapshot.clone());
                            return Some((Ok(snapshot), (store, rx, next)));
                        }
                    }
                }
            },
        );

        Ok(stream.boxed())
    }

    async fn set(&self, collection: &str, id: &str, mut doc: Document) -> Result<(), AppError> {
        self.check_writable(collection)?;
        doc.insert("id".to_string(), Value::String(id.to_string()));

        let seq = self.inner.seq.fetch_add(1, Ordering::SeqCst);
        self.inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), StoredDoc { seq, doc });

        self.notify();
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), AppError> {
        self.check_writable(collection)?;
        {
            let col = self.inner.collections.get(collection).ok_or_else(|| {
                AppError::NotFound(format!("{}/{} does not exist", collection, id))
            })?;
            let mut stored = col.get_mut(id).ok_or_else(|| {
                AppError::NotFound(format!("{}/{} does not exist", collection, id))
            })?;
            for (key, value) in fields {
                stored.doc.insert(key, value);
            }
        }

        self.notify();
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.check_writable(collection)?;
        if let Some(col) = self.inner.collections.get(collection) {
            col.remove(id);
        }
        self.notify();
        Ok(())
    }
}
