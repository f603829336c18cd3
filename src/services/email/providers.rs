// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP email providers used in the fallback chain.

use super::{EmailProvider, OutboundEmail};
use crate::config::EmailProviderConfig;
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

const RESEND_URL: &str = "https://api.resend.com/emails";
const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Build the configured chain, preserving order.
pub fn build_chain(configs: &[EmailProviderConfig]) -> Vec<Arc<dyn EmailProvider>> {
    let http = reqwest::Client::new();
    configs
        .iter()
        .map(|config| {
            Arc::new(HttpEmailProvider {
                http: http.clone(),
                config: config.clone(),
            }) as Arc<dyn EmailProvider>
        })
        .collect()
}

/// Split `"Name <addr@host>"` into its parts.
fn parse_mailbox(from: &str) -> (Option<&str>, &str) {
    match (from.find('<'), from.rfind('>')) {
        (Some(start), Some(end)) if start < end => {
            let name = from[..start].trim();
            let addr = from[start + 1..end].trim();
            ((!name.is_empty()).then_some(name), addr)
        }
        _ => (None, from.trim()),
    }
}

pub struct HttpEmailProvider {
    http: reqwest::Client,
    config: EmailProviderConfig,
}

impl HttpEmailProvider {
    async fn post(&self, request: reqwest::RequestBuilder) -> Result<String, AppError> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("{}: {}", self.config.name(), e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "{} HTTP {}: {}",
                self.config.name(),
                status,
                body
            )));
        }
        Ok(body)
    }
}

#[async_trait]
impl EmailProvider for HttpEmailProvider {
    fn name(&self) -> &str {
        self.config.name()
    }

    async fn send(&self, email: &OutboundEmail) -> Result<(), AppError> {
        match &self.config {
            EmailProviderConfig::Resend { api_key } => {
                let body = json!({
                    "from": email.from,
                    "to": [email.to],
                    "subject": email.subject,
                    "html": email.html,
                    "text": email.text,
                });
                let reply = self
                    .post(self.http.post(RESEND_URL).bearer_auth(api_key).json(&body))
                    .await?;
                let parsed: serde_json::Value = serde_json::from_str(&reply).unwrap_or_default();
                if parsed.get("id").is_none() {
                    return Err(AppError::Upstream(format!("resend: unexpected reply {}", reply)));
                }
                Ok(())
            }
            EmailProviderConfig::SendGrid { api_key } => {
                let (name, address) = parse_mailbox(&email.from);
                let body = json!({
                    "personalizations": [{ "to": [{ "email": email.to }] }],
                    "from": { "email": address, "name": name },
                    "subject": email.subject,
                    "content": [
                        { "type": "text/plain", "value": email.text },
                        { "type": "text/html", "value": email.html },
                    ],
                });
                self.post(self.http.post(SENDGRID_URL).bearer_auth(api_key).json(&body))
                    .await?;
                Ok(())
            }
            EmailProviderConfig::Webhook { url } => {
                let body = json!({
                    "from": email.from,
                    "to": email.to,
                    "subject": email.subject,
                    "html": email.html,
                    "text": email.text,
                });
                let reply = self.post(self.http.post(url).json(&body)).await?;
                // An empty 2xx is success; a JSON body must not say otherwise.
                if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&reply) {
                    if parsed.get("success").and_then(|v| v.as_bool()) == Some(false) {
                        let message = parsed
                            .get("message")
                            .and_then(|v| v.as_str())
                            .unwrap_or("rejected");
                        return Err(AppError::Upstream(format!("webhook: {}", message)));
                    }
                }
                Ok(())
            }
        }
    }
}
