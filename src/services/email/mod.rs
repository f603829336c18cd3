// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email side-channel.
//!
//! Best-effort transactional email through an ordered provider chain.
//! [`EmailService::send`] never fails: it reports `true` for the first
//! provider that accepts the message and `false` when the chain is
//! exhausted. Whether to surface a `false` is the caller's decision.

pub mod log;
pub mod providers;
pub mod templates;
pub mod text;

pub use log::EmailLog;
pub use text::html_to_text;

use crate::error::AppError;
use crate::models::{EmailLogEntry, EmailTemplate};
use crate::time_utils::now_rfc3339;
use async_trait::async_trait;
use std::sync::Arc;

/// A fully-formed message as handed to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    /// Derived from `html`, for providers that want a text part
    pub text: String,
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, email: &OutboundEmail) -> Result<(), AppError>;
}

pub struct EmailService {
    from: String,
    providers: Vec<Arc<dyn EmailProvider>>,
    log: Arc<EmailLog>,
}

impl EmailService {
    pub fn new(from: String, providers: Vec<Arc<dyn EmailProvider>>, log: Arc<EmailLog>) -> Self {
        Self {
            from,
            providers,
            log,
        }
    }

    pub fn log(&self) -> &EmailLog {
        &self.log
    }

    /// Try each provider in order until one accepts the message.
    pub async fn send(&self, template: EmailTemplate) -> bool {
        let email = OutboundEmail {
            from: self.from.clone(),
            text: html_to_text(&template.html),
            to: template.to,
            subject: template.subject,
            html: template.html,
        };

        for provider in &self.providers {
            // A panicking provider is contained like any other failure.
            let attempt = tokio::spawn({
                let provider = provider.clone();
                let email = email.clone();
                async move { provider.send(&email).await }
            })
            .await;

            match attempt {
                Ok(Ok(())) => {
                    tracing::info!(
                        provider = provider.name(),
                        to = %email.to,
                        subject = %email.subject,
                        "Email sent"
                    );
                    self.record(&email, provider.name()).await;
                    return true;
                }
                Ok(Err(e)) => {
                    tracing::warn!(provider = provider.name(), error = %e, "Email provider failed, trying next");
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "Email provider aborted, trying next");
                }
            }
        }

        tracing::warn!(
            to = %email.to,
            providers = self.providers.len(),
            "All email providers failed"
        );
        false
    }

    async fn record(&self, email: &OutboundEmail, method: &str) {
        let entry = EmailLogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            to: email.to.clone(),
            subject: email.subject.clone(),
            html: email.html.clone(),
            text: email.text.clone(),
            sent_at: now_rfc3339(),
            status: "sent".to_string(),
            method: method.to_string(),
        };
        if let Err(e) = self.log.append(entry).await {
            tracing::warn!(error = %e, "Failed to append email log entry");
        }
    }
}
