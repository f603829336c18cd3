// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification fan-out.
//!
//! Business actions commit first and then hand a [`FanoutEvent`] to
//! [`NotificationFanout::dispatch`], which decides who gets an in-app
//! record, a push and an email:
//!
//! | Event             | In-app        | Push          | Email          |
//! |-------------------|---------------|---------------|----------------|
//! | Signup            | admin feed    | -             | operator       |
//! | PickupAccepted    | vendor        | vendor        | -              |
//! | PickupCompleted   | vendor        | -             | -              |
//! | PickupCancelled   | vendor        | vendor        | -              |
//! | PickupScheduled   | -             | -             | -              |
//! | DriverApproved    | -             | -             | driver         |
//! | TestNotification  | self          | self (local)  | -              |
//!
//! Channels are independent. A failure on one never stops the others and
//! never reaches the caller; it is reported to the [`FailureSink`] and
//! shows up in the returned [`FanoutReport`].

use crate::db::{collections, to_document, DocumentStore};
use crate::models::{EmailTemplate, NotificationRecord, NotificationType, Recipient, Role, UserProfile};
use crate::services::email::{templates as email_templates, EmailService};
use crate::services::push::{PushContent, PushTransport};
use crate::services::reporting::{Channel, FailureSink};
use crate::time_utils::now_rfc3339;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Delay before a self-test push is delivered.
pub const TEST_NOTIFICATION_DELAY: Duration = Duration::from_secs(2);

/// The parts of a pickup that notification text is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickupSummary {
    pub id: String,
    pub vendor_id: String,
    pub vendor_name: String,
    pub address: String,
    pub bottle_count: u32,
}

#[derive(Debug, Clone)]
pub enum FanoutEvent {
    Signup {
        profile: UserProfile,
    },
    PickupAccepted {
        pickup: PickupSummary,
        driver_name: String,
    },
    PickupCompleted {
        pickup: PickupSummary,
        driver_name: String,
    },
    PickupCancelled {
        pickup: PickupSummary,
        driver_name: String,
        reason: String,
    },
    PickupScheduled {
        pickup: PickupSummary,
    },
    DriverApproved {
        driver: UserProfile,
    },
    TestNotification {
        user_id: String,
        role: Role,
    },
}

impl FanoutEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FanoutEvent::Signup { .. } => "signup",
            FanoutEvent::PickupAccepted { .. } => "pickup_accepted",
            FanoutEvent::PickupCompleted { .. } => "pickup_completed",
            FanoutEvent::PickupCancelled { .. } => "pickup_cancelled",
            FanoutEvent::PickupScheduled { .. } => "pickup_scheduled",
            FanoutEvent::DriverApproved { .. } => "driver_approved",
            FanoutEvent::TestNotification { .. } => "test_notification",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "error", rename_all = "lowercase")]
pub enum ChannelOutcome {
    /// The event does not use this channel
    Skipped,
    Delivered,
    /// Handed off for later delivery; a later failure goes to the sink
    Scheduled,
    Failed(String),
}

impl ChannelOutcome {
    pub fn is_attempted(&self) -> bool {
        !matches!(self, ChannelOutcome::Skipped)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FanoutReport {
    pub in_app: ChannelOutcome,
    pub push: ChannelOutcome,
    pub email: ChannelOutcome,
}

impl FanoutReport {
    fn skipped() -> Self {
        Self {
            in_app: ChannelOutcome::Skipped,
            push: ChannelOutcome::Skipped,
            email: ChannelOutcome::Skipped,
        }
    }
}

/// Title and body text, rendered once when the event fans out.
pub mod templates {
    use super::PickupSummary;
    use crate::models::{Role, UserProfile};

    pub struct Rendered {
        pub title: String,
        pub message: String,
    }

    fn role_label(role: Role) -> &'static str {
        match role {
            Role::Vendor => "Vendor",
            Role::Driver => "Driver",
            Role::Admin => "Admin",
        }
    }

    fn bottles(count: u32) -> String {
        if count == 1 {
            "1 bottle".to_string()
        } else {
            format!("{} bottles", count)
        }
    }

    pub fn signup(profile: &UserProfile) -> Rendered {
        let role = profile.role();
        Rendered {
            title: format!("New {} Signup", role_label(role)),
            message: format!(
                "{} ({}) signed up as a {} and is waiting for approval",
                profile.display_name, profile.email, role
            ),
        }
    }

    pub fn pickup_accepted(pickup: &PickupSummary, driver_name: &str) -> Rendered {
        Rendered {
            title: "Pickup Accepted".to_string(),
            message: format!(
                "{} accepted your pickup of {} at {}",
                driver_name,
                bottles(pickup.bottle_count),
                pickup.address
            ),
        }
    }

    pub fn pickup_completed(pickup: &PickupSummary, driver_name: &str) -> Rendered {
        Rendered {
            title: "Pickup Completed".to_string(),
            message: format!(
                "{} collected {} from {}",
                driver_name,
                bottles(pickup.bottle_count),
                pickup.address
            ),
        }
    }

    pub fn pickup_cancelled(pickup: &PickupSummary, driver_name: &str, reason: &str) -> Rendered {
        Rendered {
            title: "Pickup Cancelled".to_string(),
            message: format!(
                "{} cancelled your pickup at {}. Reason: {}",
                driver_name, pickup.address, reason
            ),
        }
    }

    pub fn test_notification() -> Rendered {
        Rendered {
            title: "Test Notification".to_string(),
            message: "Notifications are working on this device".to_string(),
        }
    }
}

pub struct NotificationFanout {
    store: Arc<dyn DocumentStore>,
    push: Arc<dyn PushTransport>,
    email: Arc<EmailService>,
    sink: Arc<FailureSink>,
    operator_email: String,
}

impl NotificationFanout {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        push: Arc<dyn PushTransport>,
        email: Arc<EmailService>,
        sink: Arc<FailureSink>,
        operator_email: String,
    ) -> Self {
        Self {
            store,
            push,
            email,
            sink,
            operator_email,
        }
    }

    /// Deliver an event on every channel it uses.
    pub async fn dispatch(&self, event: FanoutEvent) -> FanoutReport {
        let name = event.name();
        let mut report = FanoutReport::skipped();

        match &event {
            FanoutEvent::Signup { profile } => {
                if profile.role() == Role::Admin {
                    tracing::debug!(user_id = %profile.id, "Admin accounts do not fan out signups");
                    return report;
                }
                let text = templates::signup(profile);
                report.in_app = self
                    .record(
                        name,
                        Recipient::admin(),
                        NotificationType::signup_for(profile.role()),
                        text,
                        None,
                    )
                    .await;
                report.email = self
                    .send_email(
                        name,
                        email_templates::signup_alert(&self.operator_email, profile),
                    )
                    .await;
            }
            FanoutEvent::PickupAccepted {
                pickup,
                driver_name,
            } => {
                let text = templates::pickup_accepted(pickup, driver_name);
                let content = push_content(&text, NotificationType::PickupAccepted, pickup);
                report.in_app = self
                    .record(
                        name,
                        Recipient::new(&pickup.vendor_id, Role::Vendor),
                        NotificationType::PickupAccepted,
                        text,
                        Some(&pickup.id),
                    )
                    .await;
                report.push = self.push_to(name, &pickup.vendor_id, content).await;
            }
            FanoutEvent::PickupCompleted {
                pickup,
                driver_name,
            } => {
                report.in_app = self
                    .record(
                        name,
                        Recipient::new(&pickup.vendor_id, Role::Vendor),
                        NotificationType::PickupCompleted,
                        templates::pickup_completed(pickup, driver_name),
                        Some(&pickup.id),
                    )
                    .await;
            }
            FanoutEvent::PickupCancelled {
                pickup,
                driver_name,
                reason,
            } => {
                let text = templates::pickup_cancelled(pickup, driver_name, reason);
                let content = push_content(&text, NotificationType::PickupCancelled, pickup);
                report.in_app = self
                    .record(
                        name,
                        Recipient::new(&pickup.vendor_id, Role::Vendor),
                        NotificationType::PickupCancelled,
                        text,
                        Some(&pickup.id),
                    )
                    .await;
                report.push = self.push_to(name, &pickup.vendor_id, content).await;
            }
            FanoutEvent::PickupScheduled { pickup } => {
                // Drivers browse open pickups; nobody is notified yet.
                tracing::info!(
                    pickup_id = %pickup.id,
                    vendor_id = %pickup.vendor_id,
                    bottles = pickup.bottle_count,
                    "Pickup scheduled"
                );
            }
            FanoutEvent::DriverApproved { driver } => {
                report.email = self
                    .send_email(name, email_templates::driver_approved(driver))
                    .await;
            }
            FanoutEvent::TestNotification { user_id, role } => {
                let text = templates::test_notification();
                let content = PushContent {
                    title: text.title.clone(),
                    body: text.message.clone(),
                    data: json!({ "type": NotificationType::TestNotification.as_str() }),
                };
                report.in_app = self
                    .record(
                        name,
                        Recipient::new(user_id, *role),
                        NotificationType::TestNotification,
                        text,
                        None,
                    )
                    .await;
                report.push = self.schedule_to(name, user_id, content).await;
            }
        }

        tracing::debug!(event = name, report = ?report, "Fan-out complete");
        report
    }

    /// Account-approved email for a driver. Vendors get nothing.
    pub async fn driver_approved(&self, driver: &UserProfile) -> FanoutReport {
        self.dispatch(FanoutEvent::DriverApproved {
            driver: driver.clone(),
        })
        .await
    }

    async fn record(
        &self,
        event: &str,
        recipient: Recipient,
        kind: NotificationType,
        text: templates::Rendered,
        pickup_id: Option<&str>,
    ) -> ChannelOutcome {
        let record = NotificationRecord {
            id: uuid::Uuid::new_v4().to_string(),
            recipient_id: recipient.id,
            recipient_role: recipient.role,
            kind,
            title: text.title,
            message: text.message,
            pickup_id: pickup_id.map(str::to_string),
            is_read: false,
            deleted: false,
            created_at: now_rfc3339(),
        };

        let written = match to_document(&record) {
            Ok(doc) => {
                self.store
                    .set(collections::NOTIFICATIONS, &record.id, doc)
                    .await
            }
            Err(e) => Err(e),
        };

        match written {
            Ok(()) => {
                tracing::debug!(
                    notification_id = %record.id,
                    recipient_id = %record.recipient_id,
                    kind = record.kind.as_str(),
                    "Notification recorded"
                );
                ChannelOutcome::Delivered
            }
            Err(e) => self.failed(Channel::InApp, event, e),
        }
    }

    async fn push_to(&self, event: &str, user_id: &str, content: PushContent) -> ChannelOutcome {
        let token = match self.push.delivery_token(user_id).await {
            Ok(Some(token)) => token,
            Ok(None) => return self.failed(Channel::Push, event, "no delivery token"),
            Err(e) => return self.failed(Channel::Push, event, e),
        };

        match self.push.send(&token, &content).await {
            Ok(()) => ChannelOutcome::Delivered,
            Err(e) => self.failed(Channel::Push, event, e),
        }
    }

    async fn schedule_to(&self, event: &str, user_id: &str, content: PushContent) -> ChannelOutcome {
        match self.push.request_permission(user_id).await {
            Ok(true) => {}
            Ok(false) => return self.failed(Channel::Push, event, "push permission not granted"),
            Err(e) => return self.failed(Channel::Push, event, e),
        }

        match self
            .push
            .schedule_local(user_id, &content, TEST_NOTIFICATION_DELAY)
            .await
        {
            Ok(()) => ChannelOutcome::Scheduled,
            Err(e) => self.failed(Channel::Push, event, e),
        }
    }

    async fn send_email(
        &self,
        event: &str,
        template: EmailTemplate,
    ) -> ChannelOutcome {
        if self.email.send(template).await {
            ChannelOutcome::Delivered
        } else {
            self.failed(Channel::Email, event, "all email providers failed")
        }
    }

    fn failed(
        &self,
        channel: Channel,
        event: &str,
        error: impl std::fmt::Display,
    ) -> ChannelOutcome {
        self.sink.report(channel, event, &error);
        ChannelOutcome::Failed(error.to_string())
    }
}

fn push_content(
    text: &templates::Rendered,
    kind: NotificationType,
    pickup: &PickupSummary,
) -> PushContent {
    PushContent {
        title: text.title.clone(),
        body: text.message.clone(),
        data: json!({ "type": kind.as_str(), "pickupId": pickup.id }),
    }
}
