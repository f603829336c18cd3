// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Push notification transport.
//!
//! Devices register a delivery token which is kept on the user profile.
//! [`ExpoPushClient`] delivers through the Expo push service; scheduled
//! "local" notifications are held in a timer task and then delivered the
//! same way. A scheduled delivery that fails later goes to the
//! [`FailureSink`].

use crate::db::{collections, DocumentStore};
use crate::error::AppError;
use crate::services::reporting::{Channel, FailureSink};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What the recipient's device displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushContent {
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

/// Whether a delivered message was shown while the app was active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageContext {
    Foreground,
    Background,
}

pub type MessageHandler = Arc<dyn Fn(&PushContent, MessageContext) + Send + Sync>;

#[async_trait]
pub trait PushTransport: Send + Sync {
    /// A user has granted permission once their device registered a token.
    async fn request_permission(&self, user_id: &str) -> Result<bool, AppError>;

    async fn delivery_token(&self, user_id: &str) -> Result<Option<String>, AppError>;

    async fn send(&self, token: &str, content: &PushContent) -> Result<(), AppError>;

    /// Deliver a notification to the user's own device after `delay`.
    ///
    /// `Ok` means the delivery is scheduled, not that it happened. Later
    /// failures are the transport's to report.
    async fn schedule_local(
        &self,
        user_id: &str,
        content: &PushContent,
        delay: Duration,
    ) -> Result<(), AppError>;

    /// Observe messages after delivery. Handlers run on the delivering task.
    fn on_message(&self, handler: MessageHandler);
}

#[derive(Serialize)]
struct ExpoMessage<'a> {
    to: &'a str,
    title: &'a str,
    body: &'a str,
    data: &'a serde_json::Value,
    sound: &'static str,
}

#[derive(Deserialize)]
struct ExpoResponse {
    data: ExpoTicket,
}

#[derive(Deserialize)]
struct ExpoTicket {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// Expo push service client.
#[derive(Clone)]
pub struct ExpoPushClient {
    http: reqwest::Client,
    endpoint: String,
    store: Arc<dyn DocumentStore>,
    failures: Arc<FailureSink>,
    handlers: Arc<DashMap<u64, MessageHandler>>,
    next_handler: Arc<AtomicU64>,
}

impl ExpoPushClient {
    pub fn new(
        endpoint: String,
        store: Arc<dyn DocumentStore>,
        failures: Arc<FailureSink>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            store,
            failures,
            handlers: Arc::new(DashMap::new()),
            next_handler: Arc::new(AtomicU64::new(0)),
        }
    }

    fn dispatch(&self, content: &PushContent, context: MessageContext) {
        for handler in self.handlers.iter() {
            (handler.value())(content, context);
        }
    }

    async fn deliver(&self, token: &str, content: &PushContent) -> Result<(), AppError> {
        let message = ExpoMessage {
            to: token,
            title: &content.title,
            body: &content.body,
            data: &content.data,
            sound: "default",
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&message)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("push request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("push HTTP {}: {}", status, body)));
        }

        let parsed: ExpoResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("push response parse error: {}", e)))?;

        if parsed.data.status != "ok" {
            return Err(AppError::Upstream(format!(
                "push rejected: {}",
                parsed.data.message.unwrap_or(parsed.data.status)
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl PushTransport for ExpoPushClient {
    async fn request_permission(&self, user_id: &str) -> Result<bool, AppError> {
        Ok(self.delivery_token(user_id).await?.is_some())
    }

    async fn delivery_token(&self, user_id: &str) -> Result<Option<String>, AppError> {
        let doc = self.store.get(collections::USERS, user_id).await?;
        Ok(doc
            .and_then(|d| d.get("pushToken").cloned())
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|t| !t.is_empty()))
    }

    async fn send(&self, token: &str, content: &PushContent) -> Result<(), AppError> {
        self.deliver(token, content).await?;
        tracing::debug!(title = %content.title, "Push delivered");
        self.dispatch(content, MessageContext::Background);
        Ok(())
    }

    async fn schedule_local(
        &self,
        user_id: &str,
        content: &PushContent,
        delay: Duration,
    ) -> Result<(), AppError> {
        let token = self
            .delivery_token(user_id)
            .await?
            .ok_or_else(|| AppError::Validation("no push token registered".to_string()))?;

        let client = self.clone();
        let content = content.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match client.deliver(&token, &content).await {
                Ok(()) => client.dispatch(&content, MessageContext::Foreground),
                Err(e) => {
                    let event = content.data["type"].as_str().unwrap_or("scheduled_push");
                    client.failures.report(Channel::Push, event, &e);
                }
            }
        });
        Ok(())
    }

    fn on_message(&self, handler: MessageHandler) {
        let id = self.next_handler.fetch_add(1, Ordering::Relaxed);
        self.handlers.insert(id, handler);
    }
}
