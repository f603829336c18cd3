// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account lifecycle: sign-up, sign-in, contact edits and credentials.
//!
//! The identity provider owns credentials. The `users` document owns
//! everything else, including a mirror of the provider's email-verified
//! flag that is reconciled whenever the user signs in.

use crate::db::{collections, fields, from_document, to_document, DocumentStore, Filter, Query};
use crate::error::AppError;
use crate::models::{Approval, ApprovalStatus, Role, RoleProfile, UserProfile};
use crate::services::fanout::{FanoutEvent, NotificationFanout};
use crate::services::identity::{AccountInfo, AuthSession, AuthStateChange, IdentityProvider};
use crate::time_utils::now_rfc3339;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use validator::{Validate, ValidateEmail};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub display_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub business_category: Option<String>,
    #[serde(default)]
    pub business_location: Option<String>,
    #[serde(default)]
    pub vehicle_info: Option<String>,
}

fn required(value: &Option<String>, what: &str) -> Result<String, AppError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::Validation(format!("{} is required", what))),
    }
}

impl SignupRequest {
    fn role_profile(&self, approval: Approval) -> Result<RoleProfile, AppError> {
        Ok(match self.role {
            Role::Vendor => RoleProfile::Vendor {
                approval,
                business_name: required(&self.business_name, "Business name")?,
                business_category: required(&self.business_category, "Business category")?,
                business_location: required(&self.business_location, "Business location")?,
            },
            Role::Driver => RoleProfile::Driver {
                approval,
                vehicle_info: required(&self.vehicle_info, "Vehicle info")?,
                is_available: false,
            },
            Role::Admin => RoleProfile::Admin,
        })
    }
}

/// Fields a user may edit on their own profile. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContactUpdate {
    #[validate(length(min = 1, max = 100))]
    pub display_name: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(min = 1))]
    pub business_location: Option<String>,
    #[validate(length(min = 1))]
    pub vehicle_info: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SignInResult {
    pub profile: UserProfile,
    pub session: AuthSession,
}

/// Fetch and decode `users/{id}`.
pub async fn load_profile(store: &dyn DocumentStore, user_id: &str) -> Result<UserProfile, AppError> {
    let doc = store
        .get(collections::USERS, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))?;
    from_document(collections::USERS, doc)
}

pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    fanout: Arc<NotificationFanout>,
}

impl ProfileService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        fanout: Arc<NotificationFanout>,
    ) -> Self {
        Self {
            store,
            identity,
            fanout,
        }
    }

    /// Self-service registration. The profile starts `pending` and the
    /// operator is alerted.
    pub async fn sign_up(&self, request: SignupRequest) -> Result<UserProfile, AppError> {
        request.validate()?;
        if request.role == Role::Admin {
            return Err(AppError::Validation(
                "Admin accounts cannot be created by sign-up".to_string(),
            ));
        }
        let role = request.role_profile(Approval::pending())?;

        let profile = self.create(&request, role).await?;
        tracing::info!(user_id = %profile.id, role = %profile.role(), "User signed up");

        self.fanout
            .dispatch(FanoutEvent::Signup {
                profile: profile.clone(),
            })
            .await;
        Ok(profile)
    }

    /// Admin-created account, approved from the start. No signup alert.
    pub async fn invite(&self, request: SignupRequest) -> Result<UserProfile, AppError> {
        request.validate()?;
        let role = request.role_profile(Approval::approved(&now_rfc3339()))?;

        let profile = self.create(&request, role).await?;
        tracing::info!(user_id = %profile.id, role = %profile.role(), "User invited");
        Ok(profile)
    }

    async fn create(&self, request: &SignupRequest, role: RoleProfile) -> Result<UserProfile, AppError> {
        let email = request.email.trim().to_lowercase();
        let session = self
            .identity
            .create_account(&email, &request.password)
            .await?;

        if let Err(e) = self
            .identity
            .send_verification_email(&session.id_token)
            .await
        {
            tracing::warn!(user_id = %session.user_id, error = %e, "Verification email not sent");
        }

        let profile = UserProfile {
            id: session.user_id.clone(),
            email,
            display_name: request.display_name.trim().to_string(),
            phone: request
                .phone
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            email_verified: false,
            push_token: None,
            created_at: now_rfc3339(),
            updated_at: None,
            role,
        };

        self.store
            .set(collections::USERS, &profile.id, to_document(&profile)?)
            .await?;
        Ok(profile)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignInResult, AppError> {
        let session = self.identity.sign_in(email.trim(), password).await?;

        let account = match self.identity.lookup(&session.id_token).await {
            Ok(account) => account,
            Err(e) => {
                tracing::warn!(user_id = %session.user_id, error = %e, "Account lookup failed, skipping reconciliation");
                AccountInfo {
                    user_id: session.user_id.clone(),
                    email: session.email.clone(),
                    email_verified: false,
                }
            }
        };

        let profile = match self
            .on_auth_state_change(AuthStateChange::SignedIn(account))
            .await?
        {
            Some(profile) => profile,
            None => load_profile(self.store.as_ref(), &session.user_id).await?,
        };

        tracing::info!(user_id = %profile.id, role = %profile.role(), "User signed in");
        Ok(SignInResult { profile, session })
    }

    pub async fn sign_out(&self, user_id: &str) -> Result<(), AppError> {
        self.identity.sign_out(user_id).await?;
        self.on_auth_state_change(AuthStateChange::SignedOut {
            user_id: user_id.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Auth-state hook. On sign-in, copies the provider's email-verified
    /// flag into the profile when they disagree (a verified flag is never
    /// downgraded) and returns the current profile.
    pub async fn on_auth_state_change(
        &self,
        change: AuthStateChange,
    ) -> Result<Option<UserProfile>, AppError> {
        match change {
            AuthStateChange::SignedIn(account) => {
                let mut profile = load_profile(self.store.as_ref(), &account.user_id).await?;
                if account.email_verified && !profile.email_verified {
                    let now = now_rfc3339();
                    self.store
                        .update(
                            collections::USERS,
                            &profile.id,
                            fields([
                                ("emailVerified", json!(true)),
                                ("updatedAt", json!(now)),
                            ]),
                        )
                        .await?;
                    profile.email_verified = true;
                    profile.updated_at = Some(now);
                    tracing::info!(user_id = %profile.id, "Email verification recorded");
                }
                Ok(Some(profile))
            }
            AuthStateChange::SignedOut { user_id } => {
                tracing::debug!(user_id = %user_id, "User signed out");
                Ok(None)
            }
        }
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<UserProfile, AppError> {
        load_profile(self.store.as_ref(), user_id).await
    }

    /// Profiles for the admin dashboard, newest first.
    pub async fn list_users(
        &self,
        role: Option<Role>,
        status: Option<ApprovalStatus>,
    ) -> Result<Vec<UserProfile>, AppError> {
        let mut query = Query::new().order_desc("createdAt");
        if let Some(role) = role {
            query = query.filter(Filter::eq("role", role.as_str()));
        }
        if let Some(status) = status {
            let status = match status {
                ApprovalStatus::Pending => "pending",
                ApprovalStatus::Approved => "approved",
                ApprovalStatus::Rejected => "rejected",
            };
            query = query.filter(Filter::eq("approvalStatus", status));
        }

        self.store
            .query(collections::USERS, &query)
            .await?
            .into_iter()
            .map(|doc| from_document(collections::USERS, doc))
            .collect()
    }

    pub async fn update_contact(
        &self,
        user_id: &str,
        update: ContactUpdate,
    ) -> Result<UserProfile, AppError> {
        update.validate()?;
        let profile = load_profile(self.store.as_ref(), user_id).await?;

        let mut changes: Vec<(&str, Value)> = Vec::new();
        if let Some(name) = &update.display_name {
            changes.push(("displayName", json!(name.trim())));
        }
        if let Some(phone) = &update.phone {
            let phone = phone.trim();
            changes.push((
                "phone",
                if phone.is_empty() {
                    Value::Null
                } else {
                    json!(phone)
                },
            ));
        }
        if let Some(location) = &update.business_location {
            if profile.role() != Role::Vendor {
                return Err(AppError::Validation(
                    "Only vendors have a business location".to_string(),
                ));
            }
            changes.push(("businessLocation", json!(location.trim())));
        }
        if let Some(vehicle) = &update.vehicle_info {
            if profile.role() != Role::Driver {
                return Err(AppError::Validation(
                    "Only drivers have vehicle info".to_string(),
                ));
            }
            changes.push(("vehicleInfo", json!(vehicle.trim())));
        }
        if changes.is_empty() {
            return Err(AppError::Validation("Nothing to update".to_string()));
        }
        changes.push(("updatedAt", json!(now_rfc3339())));

        self.store
            .update(collections::USERS, user_id, fields(changes))
            .await?;
        load_profile(self.store.as_ref(), user_id).await
    }

    pub async fn register_push_token(&self, user_id: &str, token: &str) -> Result<(), AppError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Validation("Push token is required".to_string()));
        }
        self.store
            .update(
                collections::USERS,
                user_id,
                fields([("pushToken", json!(token))]),
            )
            .await?;
        tracing::debug!(user_id, "Push token registered");
        Ok(())
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<(), AppError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AppError::Validation("Email is required".to_string()));
        }
        self.identity.send_password_reset(email).await
    }

    pub async fn resend_verification(&self, id_token: &str) -> Result<(), AppError> {
        self.identity.send_verification_email(id_token).await
    }

    /// Change the sign-in email. The new address starts unverified.
    pub async fn change_email(
        &self,
        user_id: &str,
        password: &str,
        new_email: &str,
    ) -> Result<UserProfile, AppError> {
        let new_email = new_email.trim().to_lowercase();
        if !new_email.validate_email() {
            return Err(AppError::Validation("Invalid email address".to_string()));
        }
        let profile = load_profile(self.store.as_ref(), user_id).await?;

        let session = self
            .identity
            .reauthenticate(&profile.email, password)
            .await?;
        self.identity
            .update_email(&session.id_token, &new_email)
            .await?;

        self.store
            .update(
                collections::USERS,
                user_id,
                fields([
                    ("email", json!(new_email)),
                    ("emailVerified", json!(false)),
                    ("updatedAt", json!(now_rfc3339())),
                ]),
            )
            .await?;

        if let Err(e) = self
            .identity
            .send_verification_email(&session.id_token)
            .await
        {
            tracing::warn!(user_id, error = %e, "Verification email not sent");
        }
        load_profile(self.store.as_ref(), user_id).await
    }

    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(
                "Password must be at least 6 characters".to_string(),
            ));
        }
        let profile = load_profile(self.store.as_ref(), user_id).await?;
        let session = self
            .identity
            .reauthenticate(&profile.email, current_password)
            .await?;
        self.identity
            .update_password(&session.id_token, new_password)
            .await?;
        tracing::info!(user_id, "Password changed");
        Ok(())
    }
}
