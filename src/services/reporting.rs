// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Single sink for notification channel failures.
//!
//! Push, email and in-app writes made after a business action has committed
//! must never fail that action. Their errors end up here: one structured
//! log line per failure plus a per-channel counter.

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    InApp,
    Push,
    Email,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::InApp => "in_app",
            Channel::Push => "push",
            Channel::Email => "email",
        }
    }
}

#[derive(Debug, Default)]
pub struct FailureSink {
    in_app: AtomicU64,
    push: AtomicU64,
    email: AtomicU64,
}

impl FailureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a swallowed channel failure.
    pub fn report(&self, channel: Channel, event: &str, error: &dyn Display) {
        self.counter(channel).fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            channel = channel.as_str(),
            event,
            error = %error,
            "Notification channel failed"
        );
    }

    /// Failures seen on a channel since startup.
    pub fn failures(&self, channel: Channel) -> u64 {
        self.counter(channel).load(Ordering::Relaxed)
    }

    fn counter(&self, channel: Channel) -> &AtomicU64 {
        match channel {
            Channel::InApp => &self.in_app,
            Channel::Push => &self.push,
            Channel::Email => &self.email,
        }
    }
}
