// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test harness: in-memory store plus recording fakes for every
//! outside collaborator.

#![allow(dead_code)]

use async_trait::async_trait;
use bottle_pickup_api::config::Config;
use bottle_pickup_api::db::{collections, to_document, DocumentStore, MemoryStore};
use bottle_pickup_api::error::{AppError, AuthErrorKind};
use bottle_pickup_api::models::{Approval, ApprovalStatus, Role, RoleProfile, UserProfile};
use bottle_pickup_api::routes::create_router;
use bottle_pickup_api::services::identity::{AccountInfo, AuthSession, IdentityProvider};
use bottle_pickup_api::services::privileged::{DeleteUserResponse, PrivilegedFunctions};
use bottle_pickup_api::services::push::{MessageHandler, PushContent, PushTransport};
use bottle_pickup_api::services::{EmailLog, EmailProvider, FailureSink, OutboundEmail};
use bottle_pickup_api::{AppState, Externals};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Check if emulator is available via environment variable.
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

// ─── Identity ────────────────────────────────────────────────

#[derive(Clone)]
struct Account {
    user_id: String,
    email: String,
    password: String,
    verified: bool,
}

#[derive(Default)]
pub struct FakeIdentity {
    accounts: DashMap<String, Account>,
    pub verification_emails: AtomicUsize,
    pub fail_verification_email: AtomicBool,
    pub password_resets: Mutex<Vec<String>>,
}

impl FakeIdentity {
    fn id_token(user_id: &str) -> String {
        format!("id-token-{}", user_id)
    }

    fn by_token(&self, id_token: &str) -> Option<Account> {
        self.accounts
            .iter()
            .find(|a| Self::id_token(&a.user_id) == id_token)
            .map(|a| a.value().clone())
    }

    fn session(account: &Account) -> AuthSession {
        AuthSession {
            user_id: account.user_id.clone(),
            email: account.email.clone(),
            id_token: Self::id_token(&account.user_id),
            refresh_token: "refresh".to_string(),
        }
    }

    /// Pretend the user clicked the verification link.
    pub fn mark_verified(&self, email: &str) {
        if let Some(mut account) = self.accounts.get_mut(email) {
            account.verified = true;
        }
    }

    pub fn has_account(&self, email: &str) -> bool {
        self.accounts.contains_key(email)
    }

    pub fn password_of(&self, email: &str) -> Option<String> {
        self.accounts.get(email).map(|a| a.password.clone())
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn create_account(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        if self.accounts.contains_key(email) {
            return Err(AppError::Auth(AuthErrorKind::EmailInUse));
        }
        let account = Account {
            user_id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            password: password.to_string(),
            verified: false,
        };
        let session = Self::session(&account);
        self.accounts.insert(email.to_string(), account);
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let account = self
            .accounts
            .get(email)
            .map(|a| a.value().clone())
            .ok_or(AppError::Auth(AuthErrorKind::UserNotFound))?;
        if account.password != password {
            return Err(AppError::Auth(AuthErrorKind::WrongPassword));
        }
        Ok(Self::session(&account))
    }

    async fn sign_out(&self, _user_id: &str) -> Result<(), AppError> {
        Ok(())
    }

    async fn send_verification_email(&self, _id_token: &str) -> Result<(), AppError> {
        if self.fail_verification_email.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("mail quota exceeded".to_string()));
        }
        self.verification_emails.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AppError> {
        if !self.accounts.contains_key(email) {
            return Err(AppError::Auth(AuthErrorKind::UserNotFound));
        }
        self.password_resets.lock().unwrap().push(email.to_string());
        Ok(())
    }

    async fn reauthenticate(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        self.sign_in(email, password).await
    }

    async fn update_email(&self, id_token: &str, new_email: &str) -> Result<(), AppError> {
        let mut account = self
            .by_token(id_token)
            .ok_or(AppError::InvalidToken)?;
        self.accounts.remove(&account.email);
        account.email = new_email.to_string();
        account.verified = false;
        self.accounts.insert(new_email.to_string(), account);
        Ok(())
    }

    async fn update_password(&self, id_token: &str, new_password: &str) -> Result<(), AppError> {
        let account = self.by_token(id_token).ok_or(AppError::InvalidToken)?;
        if let Some(mut stored) = self.accounts.get_mut(&account.email) {
            stored.password = new_password.to_string();
        }
        Ok(())
    }

    async fn lookup(&self, id_token: &str) -> Result<AccountInfo, AppError> {
        let account = self.by_token(id_token).ok_or(AppError::InvalidToken)?;
        Ok(AccountInfo {
            user_id: account.user_id,
            email: account.email,
            email_verified: account.verified,
        })
    }
}

// ─── Push ────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingPush {
    tokens: DashMap<String, String>,
    pub fail_sends: AtomicBool,
    /// Users whose delivery token was looked up
    pub token_lookups: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<(String, PushContent)>>,
    pub scheduled: Mutex<Vec<(String, PushContent, Duration)>>,
}

impl RecordingPush {
    pub fn set_token(&self, user_id: &str, token: &str) {
        self.tokens.insert(user_id.to_string(), token.to_string());
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn lookups_for(&self, user_id: &str) -> usize {
        self.token_lookups
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == user_id)
            .count()
    }
}

#[async_trait]
impl PushTransport for RecordingPush {
    async fn request_permission(&self, user_id: &str) -> Result<bool, AppError> {
        Ok(self.tokens.contains_key(user_id))
    }

    async fn delivery_token(&self, user_id: &str) -> Result<Option<String>, AppError> {
        self.token_lookups.lock().unwrap().push(user_id.to_string());
        Ok(self.tokens.get(user_id).map(|t| t.value().clone()))
    }

    async fn send(&self, token: &str, content: &PushContent) -> Result<(), AppError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("push service unavailable".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((token.to_string(), content.clone()));
        Ok(())
    }

    async fn schedule_local(
        &self,
        user_id: &str,
        content: &PushContent,
        delay: Duration,
    ) -> Result<(), AppError> {
        self.scheduled
            .lock()
            .unwrap()
            .push((user_id.to_string(), content.clone(), delay));
        Ok(())
    }

    fn on_message(&self, _handler: MessageHandler) {}
}

// ─── Privileged functions ────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivilegedMode {
    Succeed,
    Refuse(String),
    Unreachable,
}

pub struct FakePrivileged {
    pub mode: Mutex<PrivilegedMode>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl Default for FakePrivileged {
    fn default() -> Self {
        Self {
            mode: Mutex::new(PrivilegedMode::Succeed),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakePrivileged {
    pub fn set_mode(&self, mode: PrivilegedMode) {
        *self.mode.lock().unwrap() = mode;
    }
}

#[async_trait]
impl PrivilegedFunctions for FakePrivileged {
    async fn delete_user_everywhere(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<DeleteUserResponse, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((user_id.to_string(), email.to_string()));
        let mode = self.mode.lock().unwrap().clone();
        match mode {
            PrivilegedMode::Succeed => Ok(DeleteUserResponse {
                success: true,
                message: "deleted".to_string(),
            }),
            PrivilegedMode::Refuse(message) => Ok(DeleteUserResponse {
                success: false,
                message,
            }),
            PrivilegedMode::Unreachable => {
                Err(AppError::Upstream("function unreachable".to_string()))
            }
        }
    }
}

// ─── Email ───────────────────────────────────────────────────

pub struct ScriptedProvider {
    name: &'static str,
    pub fails: AtomicBool,
    pub attempts: AtomicUsize,
    pub delivered: Mutex<Vec<OutboundEmail>>,
}

impl ScriptedProvider {
    pub fn ok(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            fails: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
            delivered: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &'static str) -> Arc<Self> {
        let provider = Self::ok(name);
        provider.fails.store(true, Ordering::SeqCst);
        provider
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> Vec<OutboundEmail> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailProvider for ScriptedProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn send(&self, email: &OutboundEmail) -> Result<(), AppError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fails.load(Ordering::SeqCst) {
            return Err(AppError::Upstream(format!("{} HTTP 503", self.name)));
        }
        self.delivered.lock().unwrap().push(email.clone());
        Ok(())
    }
}

// ─── Harness ─────────────────────────────────────────────────

pub struct TestHarness {
    pub state: Arc<AppState>,
    pub store: MemoryStore,
    pub identity: Arc<FakeIdentity>,
    pub push: Arc<RecordingPush>,
    pub privileged: Arc<FakePrivileged>,
    pub mail: Vec<Arc<ScriptedProvider>>,
}

impl TestHarness {
    /// One working email provider.
    pub fn new() -> Self {
        Self::with_email_providers(vec![ScriptedProvider::ok("webhook")])
    }

    pub fn with_email_providers(mail: Vec<Arc<ScriptedProvider>>) -> Self {
        let config = Config::test_default();
        let store = MemoryStore::new();
        let identity = Arc::new(FakeIdentity::default());
        let push = Arc::new(RecordingPush::default());
        let privileged = Arc::new(FakePrivileged::default());

        let externals = Externals {
            identity: identity.clone(),
            privileged: privileged.clone(),
            push: push.clone(),
            email_providers: mail
                .iter()
                .map(|p| p.clone() as Arc<dyn EmailProvider>)
                .collect(),
            failures: Arc::new(FailureSink::new()),
        };

        let state = Arc::new(AppState::new(
            config,
            Arc::new(store.clone()),
            externals,
            EmailLog::in_memory(),
        ));

        Self {
            state,
            store,
            identity,
            push,
            privileged,
            mail,
        }
    }

    pub fn router(&self) -> axum::Router {
        create_router(self.state.clone())
    }

    pub fn signing_key(&self) -> Vec<u8> {
        self.state.config.jwt_signing_key.clone()
    }

    /// A session token for a user, as the sign-in route would mint it.
    pub fn token_for(&self, user_id: &str, role: Role) -> String {
        bottle_pickup_api::middleware::auth::create_jwt(user_id, role, &self.signing_key())
            .unwrap()
    }

    pub async fn seed(&self, profile: &UserProfile) {
        self.store
            .set(
                collections::USERS,
                &profile.id,
                to_document(profile).unwrap(),
            )
            .await
            .unwrap();
    }
}

// ─── Fixtures ────────────────────────────────────────────────

fn approval(status: ApprovalStatus) -> Approval {
    match status {
        ApprovalStatus::Pending => Approval::pending(),
        ApprovalStatus::Approved => Approval::approved("2024-01-01T00:00:00.000Z"),
        ApprovalStatus::Rejected => Approval {
            approval_status: ApprovalStatus::Rejected,
            rejection_reason: Some("Incomplete details".to_string()),
            approved_at: None,
            rejected_at: Some("2024-01-01T00:00:00.000Z".to_string()),
        },
    }
}

fn profile(id: &str, name: &str, role: RoleProfile) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        display_name: name.to_string(),
        phone: None,
        email_verified: true,
        push_token: None,
        created_at: "2024-01-01T00:00:00.000Z".to_string(),
        updated_at: None,
        role,
    }
}

pub fn vendor(id: &str, status: ApprovalStatus) -> UserProfile {
    profile(
        id,
        "Corner Shop",
        RoleProfile::Vendor {
            approval: approval(status),
            business_name: "Corner Shop".to_string(),
            business_category: "Bar".to_string(),
            business_location: "1 Main St".to_string(),
        },
    )
}

pub fn driver(id: &str, status: ApprovalStatus) -> UserProfile {
    profile(
        id,
        "Sam Driver",
        RoleProfile::Driver {
            approval: approval(status),
            vehicle_info: "Blue van".to_string(),
            is_available: true,
        },
    )
}

pub fn admin(id: &str) -> UserProfile {
    profile(id, "Operator", RoleProfile::Admin)
}
