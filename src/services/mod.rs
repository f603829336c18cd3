// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod approval;
pub mod email;
pub mod fanout;
pub mod feed;
pub mod identity;
pub mod pickup;
pub mod privileged;
pub mod profile;
pub mod push;
pub mod reporting;

pub use approval::{ApprovalService, DeletionOutcome};
pub use email::{EmailLog, EmailProvider, EmailService, OutboundEmail};
pub use fanout::{ChannelOutcome, FanoutEvent, FanoutReport, NotificationFanout, PickupSummary};
pub use feed::{BulkOutcome, NotificationFeed, NotificationStream};
pub use identity::{FirebaseIdentityClient, IdentityProvider};
pub use pickup::{NewPickup, PickupService};
pub use privileged::{CallableFunctionsClient, PrivilegedFunctions};
pub use profile::{ContactUpdate, ProfileService, SignInResult, SignupRequest};
pub use push::{ExpoPushClient, PushTransport};
pub use reporting::{Channel, FailureSink};
