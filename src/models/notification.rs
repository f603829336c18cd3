// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-app notification records.

use crate::models::Role;
use serde::{Deserialize, Serialize};

/// Recipient id used for every admin-directed record.
///
/// Admin feeds are scoped by role and type, never by account.
pub const ADMIN_RECIPIENT_ID: &str = "admin";

/// Notification types an admin feed shows. Pickup lifecycle events never appear there.
pub const ADMIN_VISIBLE_TYPES: [&str; 3] = ["user_signup", "driver_signup", "vendor_signup"];

/// Notification type. Open-ended: unknown strings are kept as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationType {
    PickupAccepted,
    PickupCompleted,
    PickupCancelled,
    PickupScheduled,
    UserSignup,
    DriverSignup,
    VendorSignup,
    TestNotification,
    Other(String),
}

impl NotificationType {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationType::PickupAccepted => "pickup_accepted",
            NotificationType::PickupCompleted => "pickup_completed",
            NotificationType::PickupCancelled => "pickup_cancelled",
            NotificationType::PickupScheduled => "pickup_scheduled",
            NotificationType::UserSignup => "user_signup",
            NotificationType::DriverSignup => "driver_signup",
            NotificationType::VendorSignup => "vendor_signup",
            NotificationType::TestNotification => "test_notification",
            NotificationType::Other(s) => s,
        }
    }

    /// `{role}_signup` for the role that just registered.
    pub fn signup_for(role: Role) -> Self {
        match role {
            Role::Driver => NotificationType::DriverSignup,
            Role::Vendor => NotificationType::VendorSignup,
            Role::Admin => NotificationType::UserSignup,
        }
    }
}

impl From<String> for NotificationType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pickup_accepted" => NotificationType::PickupAccepted,
            "pickup_completed" => NotificationType::PickupCompleted,
            "pickup_cancelled" => NotificationType::PickupCancelled,
            "pickup_scheduled" => NotificationType::PickupScheduled,
            "user_signup" => NotificationType::UserSignup,
            "driver_signup" => NotificationType::DriverSignup,
            "vendor_signup" => NotificationType::VendorSignup,
            "test_notification" => NotificationType::TestNotification,
            _ => NotificationType::Other(s),
        }
    }
}

impl From<NotificationType> for String {
    fn from(t: NotificationType) -> Self {
        t.as_str().to_string()
    }
}

/// Notification record stored in `notifications/{id}`.
///
/// `title` and `message` are rendered when the record is created and
/// never re-rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: String,
    pub recipient_id: String,
    pub recipient_role: Role,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_id: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub deleted: bool,
    /// Sole ordering key (newest first)
    pub created_at: String,
}

/// Whose feed is being read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub id: String,
    pub role: Role,
}

impl Recipient {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    /// Any admin session reads the shared admin feed.
    pub fn admin() -> Self {
        Self::new(ADMIN_RECIPIENT_ID, Role::Admin)
    }

    /// Feed identity for a signed-in user.
    pub fn for_session(user_id: &str, role: Role) -> Self {
        match role {
            Role::Admin => Self::admin(),
            _ => Self::new(user_id, role),
        }
    }
}
