// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{Pickup, UserProfile};
use crate::services::{ContactUpdate, NewPickup};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/me/contact", put(update_contact))
        .route("/api/me/email", post(change_email))
        .route("/api/me/password", post(change_password))
        .route("/api/me/availability", put(set_availability))
        .route("/api/pickups", get(list_pickups).post(schedule_pickup))
        .route("/api/pickups/{id}/accept", post(accept_pickup))
        .route("/api/pickups/{id}/complete", post(complete_pickup))
        .route("/api/pickups/{id}/cancel", post(cancel_pickup))
}

// ─── User Profile ────────────────────────────────────────────

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.profiles.get_profile(&user.user_id).await?))
}

async fn update_contact(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(update): Json<ContactUpdate>,
) -> Result<Json<UserProfile>> {
    Ok(Json(
        state.profiles.update_contact(&user.user_id, update).await?,
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEmailRequest {
    password: String,
    new_email: String,
}

async fn change_email(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ChangeEmailRequest>,
) -> Result<Json<UserProfile>> {
    let profile = state
        .profiles
        .change_email(&user.user_id, &request.password, &request.new_email)
        .await?;
    Ok(Json(profile))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode> {
    state
        .profiles
        .change_password(
            &user.user_id,
            &request.current_password,
            &request.new_password,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct AvailabilityRequest {
    available: bool,
}

async fn set_availability(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<AvailabilityRequest>,
) -> Result<Json<UserProfile>> {
    let profile = state
        .pickups
        .set_availability(&user.user_id, request.available)
        .await?;
    Ok(Json(profile))
}

// ─── Pickups ─────────────────────────────────────────────────

async fn list_pickups(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Pickup>>> {
    Ok(Json(state.pickups.list_for(&user.user_id, user.role).await?))
}

async fn schedule_pickup(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<NewPickup>,
) -> Result<(StatusCode, Json<Pickup>)> {
    let pickup = state.pickups.schedule(&user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(pickup)))
}

async fn accept_pickup(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Pickup>> {
    Ok(Json(state.pickups.accept(&id, &user.user_id).await?))
}

async fn complete_pickup(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Pickup>> {
    Ok(Json(state.pickups.complete(&id, &user.user_id).await?))
}

#[derive(Deserialize)]
pub struct CancelRequest {
    reason: String,
}

async fn cancel_pickup(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(request): Json<CancelRequest>,
) -> Result<Json<Pickup>> {
    Ok(Json(
        state
            .pickups
            .cancel(&id, &user.user_id, &request.reason)
            .await?,
    ))
}
