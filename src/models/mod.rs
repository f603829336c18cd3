// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod email;
pub mod notification;
pub mod pickup;
pub mod user;

pub use email::{EmailLogEntry, EmailTemplate};
pub use notification::{NotificationRecord, NotificationType, Recipient};
pub use pickup::{AvailabilityEntry, CancellationRecord, Pickup, PickupStatus};
pub use user::{Approval, ApprovalStatus, Role, RoleProfile, UserProfile};
