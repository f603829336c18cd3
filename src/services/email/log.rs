// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local, append-only log of sent emails.
//!
//! Diagnostic only. Losing the file loses history and nothing else.

use crate::error::AppError;
use crate::models::EmailLogEntry;
use std::path::PathBuf;
use tokio::sync::Mutex;

pub struct EmailLog {
    path: Option<PathBuf>,
    entries: Mutex<Vec<EmailLogEntry>>,
}

impl EmailLog {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Open (or start) a log persisted as a JSON array at `path`.
    ///
    /// An unreadable or corrupt file starts an empty log.
    pub async fn open(path: PathBuf) -> Self {
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Email log unreadable, starting fresh");
                Vec::new()
            }),
            Err(_) => Vec::new(),
        };

        Self {
            path: Some(path),
            entries: Mutex::new(entries),
        }
    }

    pub async fn append(&self, entry: EmailLogEntry) -> Result<(), AppError> {
        let mut entries = self.entries.lock().await;
        entries.push(entry);
        self.persist(&entries).await
    }

    pub async fn entries(&self) -> Vec<EmailLogEntry> {
        self.entries.lock().await.clone()
    }

    pub async fn clear(&self) -> Result<(), AppError> {
        let mut entries = self.entries.lock().await;
        entries.clear();
        self.persist(&entries).await
    }

    async fn persist(&self, entries: &[EmailLogEntry]) -> Result<(), AppError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(entries)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("email log encode: {}", e)))?;
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("email log write: {}", e)))
    }
}
