// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin approval decisions for vendor and driver accounts.
//!
//! `pending`, `approved` and `rejected` may follow each other in any
//! order. Each decision is a plain field write; two admins deciding at
//! once simply leave whichever write landed last.

use crate::db::{collections, fields, DocumentStore};
use crate::error::AppError;
use crate::models::{ApprovalStatus, Role, UserProfile};
use crate::services::fanout::NotificationFanout;
use crate::services::privileged::PrivilegedFunctions;
use crate::services::profile::load_profile;
use crate::time_utils::now_rfc3339;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Result of the two-phase account deletion.
///
/// `requires_manual_cleanup` means the profile is gone but the identity
/// account still exists and has to be removed by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionOutcome {
    pub profile_deleted: bool,
    pub requires_manual_cleanup: bool,
    pub email: String,
    pub message: String,
}

pub struct ApprovalService {
    store: Arc<dyn DocumentStore>,
    privileged: Arc<dyn PrivilegedFunctions>,
    fanout: Arc<NotificationFanout>,
}

impl ApprovalService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        privileged: Arc<dyn PrivilegedFunctions>,
        fanout: Arc<NotificationFanout>,
    ) -> Self {
        Self {
            store,
            privileged,
            fanout,
        }
    }

    async fn load_subject(&self, entity_id: &str) -> Result<UserProfile, AppError> {
        let profile = load_profile(self.store.as_ref(), entity_id).await?;
        if profile.role() == Role::Admin {
            return Err(AppError::Validation(
                "Admin accounts have no approval status".to_string(),
            ));
        }
        Ok(profile)
    }

    /// Approve an account and clear any earlier rejection reason.
    ///
    /// Drivers get the account-approved email; vendors are not notified.
    pub async fn approve(&self, entity_id: &str) -> Result<UserProfile, AppError> {
        let mut profile = self.load_subject(entity_id).await?;
        let now = now_rfc3339();

        self.store
            .update(
                collections::USERS,
                entity_id,
                fields([
                    ("approvalStatus", json!("approved")),
                    ("approvedAt", json!(now)),
                    ("rejectionReason", Value::Null),
                    ("updatedAt", json!(now)),
                ]),
            )
            .await?;

        if let Some(approval) = profile.approval_mut() {
            approval.approval_status = ApprovalStatus::Approved;
            approval.approved_at = Some(now.clone());
            approval.rejection_reason = None;
        }
        profile.updated_at = Some(now);
        tracing::info!(user_id = %entity_id, role = %profile.role(), "Account approved");

        if profile.role() == Role::Driver {
            self.fanout.driver_approved(&profile).await;
        }
        Ok(profile)
    }

    /// Reject an account. The reason is shown to the user on sign-in.
    pub async fn reject(&self, entity_id: &str, reason: &str) -> Result<UserProfile, AppError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation(
                "A rejection reason is required".to_string(),
            ));
        }

        let mut profile = self.load_subject(entity_id).await?;
        let now = now_rfc3339();

        self.store
            .update(
                collections::USERS,
                entity_id,
                fields([
                    ("approvalStatus", json!("rejected")),
                    ("rejectionReason", json!(reason)),
                    ("rejectedAt", json!(now)),
                    ("updatedAt", json!(now)),
                ]),
            )
            .await?;

        if let Some(approval) = profile.approval_mut() {
            approval.approval_status = ApprovalStatus::Rejected;
            approval.rejection_reason = Some(reason.to_string());
            approval.rejected_at = Some(now.clone());
        }
        profile.updated_at = Some(now);
        tracing::info!(user_id = %entity_id, role = %profile.role(), "Account rejected");
        Ok(profile)
    }

    /// Delete the profile, then the identity account.
    ///
    /// A failure in the second phase is reported in the outcome and the
    /// profile is not restored.
    pub async fn delete(&self, entity_id: &str, email: &str) -> Result<DeletionOutcome, AppError> {
        self.store.delete(collections::USERS, entity_id).await?;
        tracing::info!(user_id = %entity_id, "Profile deleted");

        let failure = match self.privileged.delete_user_everywhere(entity_id, email).await {
            Ok(response) if response.success => None,
            Ok(response) => Some(response.message),
            Err(e) => Some(e.to_string()),
        };

        Ok(match failure {
            None => DeletionOutcome {
                profile_deleted: true,
                requires_manual_cleanup: false,
                email: email.to_string(),
                message: format!("{} was deleted", email),
            },
            Some(reason) => {
                tracing::warn!(
                    user_id = %entity_id,
                    email,
                    error = %reason,
                    "Identity account deletion failed, manual cleanup required"
                );
                DeletionOutcome {
                    profile_deleted: true,
                    requires_manual_cleanup: true,
                    email: email.to_string(),
                    message: format!(
                        "The profile was deleted but the sign-in account for {} could not be \
                         removed ({}). Delete it manually from the identity provider console \
                         before the address is reused.",
                        email, reason
                    ),
                }
            }
        })
    }
}
