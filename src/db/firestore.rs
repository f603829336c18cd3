// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore adapter for [`DocumentStore`].
//!
//! Documents are read and written as plain JSON objects; typed decoding
//! happens one layer up. Live subscriptions poll the query and emit a new
//! snapshot only when the result differs from the previous one.

use super::{collections, Document, DocumentStore, DocumentStream, FieldValue, Filter, Query};
use crate::error::AppError;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use std::time::Duration;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: firestore::FirestoreDb,
    poll_interval: Duration,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str, poll_interval: Duration) -> Result<Self, AppError> {
        // The emulator accepts any bearer token; skip credential discovery entirely.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id, poll_interval).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client,
            poll_interval,
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(
        project_id: &str,
        poll_interval: Duration,
    ) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client,
            poll_interval,
        })
    }

    async fn run_query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, AppError> {
        let filters = query.filters.clone();
        let mut select = self
            .client
            .fluent()
            .select()
            .from(collection)
            .filter(move |q| {
                let exprs: Vec<_> = filters
                    .iter()
                    .map(|f| match f {
                        Filter::Eq(field, FieldValue::Str(s)) => q.field(field.as_str()).eq(s.clone()),
                        Filter::Eq(field, FieldValue::Bool(b)) => q.field(field.as_str()).eq(*b),
                        Filter::In(field, values) => q.field(field.as_str()).is_in(values.clone()),
                    })
                    .collect();
                q.for_all(exprs)
            });

        if let Some(field) = &query.sort_desc {
            select = select.order_by([(
                field.as_str(),
                firestore::FirestoreQueryDirection::Descending,
            )]);
        }

        select
            .obj::<Document>()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.get(collections::USERS, "__connectivity_check__")
            .await
            .map(|_| ())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj::<Document>()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, AppError> {
        self.run_query(collection, query).await
    }

    async fn subscribe(
        &self,
        collection: &str,
        query: Query,
    ) -> Result<DocumentStream, AppError> {
        let store = self.clone();
        let collection = collection.to_string();
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let stream = futures_util::stream::unfold(
            (store, interval, None::<Vec<Document>>),
            move |(store, mut interval, last)| {
                let collection = collection.clone();
                let query = query.clone();
                async move {
                    loop {
                        interval.tick().await;
                        match store.run_query(&collection, &query).await {
                            Ok(snapshot) if last.as_ref() == Some(&snapshot) => continue,
                            Ok(snapshot) => {
                                let next = Some(snapshot.clone());
                                return Some((Ok(snapshot), (store, interval, next)));
                            }
                            Err(e) => {
                                tracing::warn!(collection = %collection, error = %e, "Subscription poll failed");
                                return Some((Err(e), (store, interval, last)));
                            }
                        }
                    }
                }
            },
        );

        Ok(stream.boxed())
    }

    async fn set(&self, collection: &str, id: &str, mut doc: Document) -> Result<(), AppError> {
        doc.insert("id".to_string(), Value::String(id.to_string()));
        let _: Document = self
            .client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(&doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), AppError> {
        // Firestore upserts on update; keep "update" meaning "must exist".
        if self.get(collection, id).await?.is_none() {
            return Err(AppError::NotFound(format!("{}/{} does not exist", collection, id)));
        }

        let mask: Vec<String> = fields.keys().cloned().collect();
        let _: Document = self
            .client
            .fluent()
            .update()
            .fields(mask)
            .in_col(collection)
            .document_id(id)
            .object(&fields)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
