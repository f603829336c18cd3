// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password authentication routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, AuthUser, SESSION_COOKIE};
use crate::models::UserProfile;
use crate::services::SignupRequest;
use crate::AppState;

/// Routes that work without a session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/signin", post(signin))
        .route("/auth/password-reset", post(password_reset))
}

/// Routes that act on the current session.
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signout", post(signout))
        .route("/auth/verification", post(resend_verification))
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Register a vendor or driver. The account waits for admin approval.
async fn signup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    let profile = state.profiles.sign_up(request).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

#[derive(Deserialize)]
pub struct SignInRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub profile: UserProfile,
    /// Session JWT, also set as a cookie
    pub token: String,
    /// Identity provider token, needed to resend the verification email
    pub id_token: String,
}

/// Sign in and start a session.
///
/// Pending and rejected accounts can sign in; the profile carries the
/// approval status and any rejection reason for the client to show.
async fn signin(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<SignInRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let result = state
        .profiles
        .sign_in(&request.email, &request.password)
        .await?;

    let token = create_jwt(
        &result.profile.id,
        result.profile.role(),
        &state.config.jwt_signing_key,
    )?;
    let secure = state.config.frontend_url.starts_with("https://");
    let jar = jar.add(session_cookie(token.clone(), secure));

    Ok((
        jar,
        Json(SessionResponse {
            profile: result.profile,
            token,
            id_token: result.session.id_token,
        }),
    ))
}

/// End the session and clear the cookie.
async fn signout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode)> {
    state.profiles.sign_out(&user.user_id).await?;
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, StatusCode::NO_CONTENT))
}

#[derive(Deserialize)]
pub struct PasswordResetRequest {
    email: String,
}

async fn password_reset(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PasswordResetRequest>,
) -> Result<StatusCode> {
    state.profiles.send_password_reset(&request.email).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    id_token: String,
}

async fn resend_verification(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerificationRequest>,
) -> Result<StatusCode> {
    state.profiles.resend_verification(&request.id_token).await?;
    Ok(StatusCode::NO_CONTENT)
}
