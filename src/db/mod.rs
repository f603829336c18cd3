// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! Services talk to a schemaless document store through [`DocumentStore`].
//! Two adapters exist: [`FirestoreStore`] for the hosted database and
//! [`MemoryStore`] for tests and local runs.
//!
//! Writes are plain last-write-wins field updates. There is no version
//! token and no optimistic concurrency check on any collection; concurrent
//! writers to the same document never see a conflict error.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::error::AppError;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::time::Duration;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const PICKUPS: &str = "pickups";
    pub const CANCELLATIONS: &str = "cancellations";
    pub const AVAILABILITY_HISTORY: &str = "availabilityHistory";
}

/// A raw document: a JSON object keyed by field name.
pub type Document = serde_json::Map<String, Value>;

/// Live sequence of full query snapshots.
pub type DocumentStream = BoxStream<'static, Result<Vec<Document>, AppError>>;

/// Scalar value usable in a query predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Bool(bool),
}

impl FieldValue {
    fn matches(&self, value: Option<&Value>) -> bool {
        match (self, value) {
            (FieldValue::Str(s), Some(Value::String(v))) => s == v,
            (FieldValue::Bool(b), Some(Value::Bool(v))) => b == v,
            _ => false,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// Field predicate. All filters in a [`Query`] are combined with AND.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, FieldValue),
    In(String, Vec<String>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<FieldValue>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn is_in<S: Into<String>>(field: &str, values: impl IntoIterator<Item = S>) -> Self {
        Filter::In(field.to_string(), values.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::Eq(field, value) => value.matches(doc.get(field)),
            Filter::In(field, values) => match doc.get(field) {
                Some(Value::String(v)) => values.iter().any(|candidate| candidate == v),
                _ => false,
            },
        }
    }
}

/// Filters plus an optional sort key. Results sort descending on that key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub sort_desc: Option<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_desc(mut self, field: &str) -> Self {
        self.sort_desc = Some(field.to_string());
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }

    /// Compare two documents by the sort key (missing values sort last).
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        match &self.sort_desc {
            Some(field) => compare_values(a.get(field), b.get(field)).reverse(),
            None => Ordering::Equal,
        }
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, Some(_)) | (Some(Value::Null), Some(_)) => Ordering::Less,
        (Some(_), None) | (Some(_), Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Generic data-access port over the hosted document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Cheap round trip used by the startup connectivity check.
    async fn ping(&self) -> Result<(), AppError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError>;

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, AppError>;

    /// Live view of a query. The first item is the current snapshot; later
    /// items are full snapshots delivered whenever the result changes.
    async fn subscribe(&self, collection: &str, query: Query)
        -> Result<DocumentStream, AppError>;

    /// Create or replace a whole document. The `id` field is stamped into it.
    async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<(), AppError>;

    /// Merge `fields` into an existing document. `NotFound` if it is absent.
    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), AppError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError>;
}

/// Serialize a typed value into a document.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, AppError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(AppError::Internal(anyhow::anyhow!(
            "expected an object, got {}",
            other
        ))),
        Err(e) => Err(AppError::Internal(anyhow::anyhow!("serialize failed: {}", e))),
    }
}

/// Decode a stored document, failing fast on schema mismatch.
pub fn from_document<T: DeserializeOwned>(collection: &str, doc: Document) -> Result<T, AppError> {
    let id = doc
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("<unknown>")
        .to_string();
    serde_json::from_value(Value::Object(doc)).map_err(|e| {
        AppError::Database(format!("malformed {} document {}: {}", collection, id, e))
    })
}

/// Build a partial-update document from `(field, value)` pairs.
pub fn fields<I, K>(pairs: I) -> Document
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Startup connectivity check. The only store call with a client-side timeout.
pub async fn check_connectivity(
    store: &dyn DocumentStore,
    timeout: Duration,
) -> Result<(), AppError> {
    match tokio::time::timeout(timeout, store.ping()).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Database(format!(
            "connectivity check timed out after {}s",
            timeout.as_secs_f32()
        ))),
    }
}
