// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin routes: account approval, invitations, deletion and diagnostics.
//!
//! Mounted behind both `require_auth` and `require_admin`.

use crate::error::Result;
use crate::models::{ApprovalStatus, EmailLogEntry, Role, UserProfile};
use crate::services::{Channel, DeletionOutcome, SignupRequest};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/invite", post(invite_user))
        .route("/api/admin/users/{id}/approve", post(approve_user))
        .route("/api/admin/users/{id}/reject", post(reject_user))
        .route("/api/admin/users/{id}/delete", post(delete_user))
        .route("/api/admin/email-log", get(email_log).delete(clear_email_log))
        .route("/api/admin/failures", get(channel_failures))
}

// ─── Accounts ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ListUsersParams {
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    status: Option<ApprovalStatus>,
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListUsersParams>,
) -> Result<Json<Vec<UserProfile>>> {
    Ok(Json(
        state.profiles.list_users(params.role, params.status).await?,
    ))
}

async fn invite_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    let profile = state.profiles.invite(request).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn approve_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.approvals.approve(&id).await?))
}

#[derive(Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    reason: String,
}

async fn reject_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<RejectRequest>,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.approvals.reject(&id, &request.reason).await?))
}

#[derive(Deserialize)]
pub struct DeleteRequest {
    email: String,
}

/// Two-phase delete. A partial failure is still a 200 with
/// `requiresManualCleanup` set.
async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<DeleteRequest>,
) -> Result<Json<DeletionOutcome>> {
    Ok(Json(state.approvals.delete(&id, &request.email).await?))
}

// ─── Diagnostics ─────────────────────────────────────────────

async fn email_log(State(state): State<Arc<AppState>>) -> Json<Vec<EmailLogEntry>> {
    Json(state.email.log().entries().await)
}

async fn clear_email_log(State(state): State<Arc<AppState>>) -> Result<StatusCode> {
    state.email.log().clear().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelFailures {
    pub in_app: u64,
    pub push: u64,
    pub email: u64,
}

async fn channel_failures(State(state): State<Arc<AppState>>) -> Json<ChannelFailures> {
    Json(ChannelFailures {
        in_app: state.failures.failures(Channel::InApp),
        push: state.failures.failures(Channel::Push),
        email: state.failures.failures(Channel::Email),
    })
}
