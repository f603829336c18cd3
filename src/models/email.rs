// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transactional email payloads and the local delivery log.

use serde::{Deserialize, Serialize};

/// A rendered email, ready for the provider chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// One successful send, appended to the local diagnostic log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailLogEntry {
    pub id: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
    pub sent_at: String,
    /// Always "sent"; failed chains are not logged
    pub status: String,
    /// Name of the provider that accepted the message
    pub method: String,
}
