// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider client.
//!
//! Handles:
//! - Account creation and password sign-in
//! - Verification and password-reset emails
//! - Email/password changes (after reauthentication)
//! - Reading the provider's email-verified flag
//!
//! [`FirebaseIdentityClient`] talks to the Identity Toolkit REST API.

use crate::error::{AppError, AuthErrorKind};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

/// Tokens returned after a successful sign-up or sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: String,
    pub email: String,
    pub id_token: String,
    pub refresh_token: String,
}

/// Account state as the identity provider sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub user_id: String,
    pub email: String,
    pub email_verified: bool,
}

/// Auth-state transitions that profile reconciliation listens to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStateChange {
    SignedIn(AccountInfo),
    SignedOut { user_id: String },
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_account(&self, email: &str, password: &str) -> Result<AuthSession, AppError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AppError>;

    async fn sign_out(&self, user_id: &str) -> Result<(), AppError>;

    async fn send_verification_email(&self, id_token: &str) -> Result<(), AppError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), AppError>;

    async fn reauthenticate(&self, email: &str, password: &str) -> Result<AuthSession, AppError>;

    async fn update_email(&self, id_token: &str, new_email: &str) -> Result<(), AppError>;

    async fn update_password(&self, id_token: &str, new_password: &str) -> Result<(), AppError>;

    async fn lookup(&self, id_token: &str) -> Result<AccountInfo, AppError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: String,
    refresh_token: String,
}

impl From<TokenResponse> for AuthSession {
    fn from(r: TokenResponse) -> Self {
        AuthSession {
            user_id: r.local_id,
            email: r.email,
            id_token: r.id_token,
            refresh_token: r.refresh_token,
        }
    }
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    email_verified: bool,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Identity Toolkit REST client.
#[derive(Clone)]
pub struct FirebaseIdentityClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FirebaseIdentityClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    /// POST to `accounts:{method}` and decode the JSON reply.
    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let url = format!("{}/accounts:{}", self.base_url, method);

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("identity request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(envelope) => {
                    AppError::Auth(AuthErrorKind::from_provider_code(&envelope.error.message))
                }
                Err(_) => AppError::Upstream(format!("identity HTTP {}: {}", status, text)),
            });
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("identity response parse error: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityClient {
    async fn create_account(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let body = json!({ "email": email, "password": password, "returnSecureToken": true });
        let session: TokenResponse = self.call("signUp", &body).await?;
        tracing::info!(user_id = %session.local_id, "Identity account created");
        Ok(session.into())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let body = json!({ "email": email, "password": password, "returnSecureToken": true });
        let session: TokenResponse = self.call("signInWithPassword", &body).await?;
        Ok(session.into())
    }

    async fn sign_out(&self, user_id: &str) -> Result<(), AppError> {
        // ID tokens are stateless; the session ends when the client drops it.
        tracing::debug!(user_id, "Signed out");
        Ok(())
    }

    async fn send_verification_email(&self, id_token: &str) -> Result<(), AppError> {
        let body = json!({ "requestType": "VERIFY_EMAIL", "idToken": id_token });
        let _: serde_json::Value = self.call("sendOobCode", &body).await?;
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AppError> {
        let body = json!({ "requestType": "PASSWORD_RESET", "email": email });
        let _: serde_json::Value = self.call("sendOobCode", &body).await?;
        Ok(())
    }

    async fn reauthenticate(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        self.sign_in(email, password).await
    }

    async fn update_email(&self, id_token: &str, new_email: &str) -> Result<(), AppError> {
        let body = json!({ "idToken": id_token, "email": new_email, "returnSecureToken": true });
        let _: serde_json::Value = self.call("update", &body).await?;
        Ok(())
    }

    async fn update_password(&self, id_token: &str, new_password: &str) -> Result<(), AppError> {
        let body =
            json!({ "idToken": id_token, "password": new_password, "returnSecureToken": true });
        let _: serde_json::Value = self.call("update", &body).await?;
        Ok(())
    }

    async fn lookup(&self, id_token: &str) -> Result<AccountInfo, AppError> {
        let body = json!({ "idToken": id_token });
        let response: LookupResponse = self.call("lookup", &body).await?;
        let user = response
            .users
            .into_iter()
            .next()
            .ok_or(AppError::Auth(AuthErrorKind::UserNotFound))?;
        Ok(AccountInfo {
            user_id: user.local_id,
            email: user.email,
            email_verified: user.email_verified,
        })
    }
}
