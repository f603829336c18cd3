// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup. Secrets (JWT key, provider API keys)
//! are injected as environment variables by the deployment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default fixed address that receives signup alerts.
pub const DEFAULT_OPERATOR_EMAIL: &str = "operations@bottlepickup.app";

/// One entry in the outbound email provider chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailProviderConfig {
    Resend { api_key: String },
    SendGrid { api_key: String },
    Webhook { url: String },
}

impl EmailProviderConfig {
    pub fn name(&self) -> &'static str {
        match self {
            EmailProviderConfig::Resend { .. } => "resend",
            EmailProviderConfig::SendGrid { .. } => "sendgrid",
            EmailProviderConfig::Webhook { .. } => "webhook",
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend/app origin allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,

    /// Identity Toolkit web API key
    pub identity_api_key: String,
    /// Identity Toolkit base URL (overridable for the auth emulator)
    pub identity_base_url: String,
    /// URL of the privileged `deleteUserEverywhere` function
    pub delete_user_function_url: String,
    /// Bearer token presented to the privileged function
    pub delete_user_function_token: Option<String>,
    /// Push service endpoint
    pub push_endpoint: String,

    /// Address that receives signup alerts
    pub operator_email: String,
    /// Sender address for transactional email
    pub email_from: String,
    /// Provider chain, attempted in order
    pub email_providers: Vec<EmailProviderConfig>,
    /// Where the diagnostic email log lives (in-memory when unset)
    pub email_log_path: Option<PathBuf>,

    /// Poll interval for live Firestore subscriptions
    pub subscription_poll_interval: Duration,
    /// Hard limit for the startup connectivity check
    pub startup_check_timeout: Duration,
}

impl Config {
    /// Config for tests only. No provider is configured.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:8081".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            identity_api_key: "test_api_key".to_string(),
            identity_base_url: "http://localhost:9099/identitytoolkit.googleapis.com/v1"
                .to_string(),
            delete_user_function_url: "http://localhost:5001/test-project/us-central1/deleteUserEverywhere".to_string(),
            delete_user_function_token: None,
            push_endpoint: "http://localhost:9999/push/send".to_string(),
            operator_email: DEFAULT_OPERATOR_EMAIL.to_string(),
            email_from: "Bottle Pickup <noreply@bottlepickup.app>".to_string(),
            email_providers: Vec::new(),
            email_log_path: None,
            subscription_poll_interval: Duration::from_millis(50),
            startup_check_timeout: Duration::from_secs(2),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let gcp_project_id = env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string());

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            identity_api_key: env::var("IDENTITY_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("IDENTITY_API_KEY"))?,
            identity_base_url: env::var("IDENTITY_BASE_URL").unwrap_or_else(|_| {
                "https://identitytoolkit.googleapis.com/v1".to_string()
            }),
            delete_user_function_url: env::var("DELETE_USER_FUNCTION_URL").unwrap_or_else(|_| {
                format!(
                    "https://us-central1-{}.cloudfunctions.net/deleteUserEverywhere",
                    gcp_project_id
                )
            }),
            delete_user_function_token: env::var("DELETE_USER_FUNCTION_TOKEN")
                .ok()
                .map(|v| v.trim().to_string()),
            push_endpoint: env::var("PUSH_ENDPOINT")
                .unwrap_or_else(|_| "https://exp.host/--/api/v2/push/send".to_string()),
            operator_email: env::var("OPERATOR_EMAIL")
                .unwrap_or_else(|_| DEFAULT_OPERATOR_EMAIL.to_string()),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "Bottle Pickup <noreply@bottlepickup.app>".to_string()),
            email_providers: parse_provider_chain(
                &env::var("EMAIL_PROVIDERS").unwrap_or_default(),
                |key| env::var(key).ok().map(|v| v.trim().to_string()),
            )?,
            email_log_path: env::var("EMAIL_LOG_PATH").ok().map(PathBuf::from),
            subscription_poll_interval: Duration::from_millis(
                env::var("SUBSCRIPTION_POLL_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(2000),
            ),
            startup_check_timeout: Duration::from_secs(
                env::var("STARTUP_CHECK_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
            gcp_project_id,
        })
    }
}

/// Parse a comma-separated provider list such as `resend,sendgrid,webhook`.
///
/// `lookup` resolves the credential variable for each named provider.
pub fn parse_provider_chain(
    names: &str,
    lookup: impl Fn(&'static str) -> Option<String>,
) -> Result<Vec<EmailProviderConfig>, ConfigError> {
    names.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| match name.to_ascii_lowercase().as_str() {
            "resend" => Ok(EmailProviderConfig::Resend {
                api_key: lookup("RESEND_API_KEY").ok_or(ConfigError::Missing("RESEND_API_KEY"))?,
            }),
            "sendgrid" => Ok(EmailProviderConfig::SendGrid {
                api_key: lookup("SENDGRID_API_KEY")
                    .ok_or(ConfigError::Missing("SENDGRID_API_KEY"))?,
            }),
            "webhook" => Ok(EmailProviderConfig::Webhook {
                url: lookup("EMAIL_WEBHOOK_URL")
                    .ok_or(ConfigError::Missing("EMAIL_WEBHOOK_URL"))?,
            }),
            _ => Err(ConfigError::Invalid(format!(
                "unknown email provider '{}'",
                name
            ))),
        })
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
