// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Privileged server-side functions (admin only).

use crate::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteUserResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[async_trait]
pub trait PrivilegedFunctions: Send + Sync {
    /// Remove the identity-provider account for `user_id`.
    async fn delete_user_everywhere(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<DeleteUserResponse, AppError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteUserData<'a> {
    user_id: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct CallableRequest<T> {
    data: T,
}

#[derive(Deserialize)]
struct CallableResponse {
    #[serde(default)]
    result: Option<DeleteUserResponse>,
    #[serde(default)]
    error: Option<CallableError>,
}

#[derive(Deserialize)]
struct CallableError {
    message: String,
}

/// Client for an HTTPS callable function.
#[derive(Clone)]
pub struct CallableFunctionsClient {
    http: reqwest::Client,
    delete_user_url: String,
    bearer_token: Option<String>,
}

impl CallableFunctionsClient {
    pub fn new(delete_user_url: String, bearer_token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            delete_user_url,
            bearer_token,
        }
    }
}

#[async_trait]
impl PrivilegedFunctions for CallableFunctionsClient {
    async fn delete_user_everywhere(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<DeleteUserResponse, AppError> {
        let mut request = self.http.post(&self.delete_user_url).json(&CallableRequest {
            data: DeleteUserData { user_id, email },
        });
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("deleteUserEverywhere failed: {}", e)))?;

        let status = response.status();
        let body: CallableResponse = response.json().await.map_err(|e| {
            AppError::Upstream(format!("deleteUserEverywhere HTTP {}: {}", status, e))
        })?;

        if let Some(error) = body.error {
            return Err(AppError::Upstream(error.message));
        }

        body.result.ok_or_else(|| {
            AppError::Upstream(format!("deleteUserEverywhere HTTP {}: empty result", status))
        })
    }
}
