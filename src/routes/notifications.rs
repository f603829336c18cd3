// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification feed routes, including the live SSE stream.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{NotificationRecord, Recipient};
use crate::services::feed::is_visible_to;
use crate::services::{BulkOutcome, FanoutEvent, FanoutReport};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post, put},
    Extension, Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/stream", get(stream_notifications))
        .route("/api/notifications/read-all", post(mark_all_read))
        .route("/api/notifications/clear", post(clear_all))
        .route("/api/notifications/test", post(send_test))
        .route("/api/notifications/{id}/read", post(mark_read))
        .route("/api/push-token", put(register_push_token))
}

fn recipient(user: &AuthUser) -> Recipient {
    Recipient::for_session(&user.user_id, user.role)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub notifications: Vec<NotificationRecord>,
    pub unread_count: usize,
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<FeedResponse>> {
    let notifications = state.feed.snapshot(&recipient(&user)).await?;
    let unread_count = notifications.iter().filter(|n| !n.is_read).count();
    Ok(Json(FeedResponse {
        notifications,
        unread_count,
    }))
}

/// Full feed snapshots, one `snapshot` event per change.
async fn stream_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let snapshots = state.feed.subscribe(&recipient(&user)).await?;
    let user_id = user.user_id;

    let events = snapshots.map(move |snapshot| {
        let event = match snapshot {
            Ok(records) => Event::default()
                .event("snapshot")
                .json_data(&records)
                .unwrap_or_else(|e| Event::default().event("error").data(e.to_string())),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Notification subscription failed");
                Event::default().event("error").data(e.to_string())
            }
        };
        Ok(event)
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let record = state.feed.get(&id).await?;
    if !is_visible_to(&recipient(&user), &record) {
        return Err(AppError::NotFound(format!("notification {}", id)));
    }
    state.feed.mark_read(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<BulkOutcome>> {
    Ok(Json(state.feed.mark_all_read(&recipient(&user)).await?))
}

async fn clear_all(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<BulkOutcome>> {
    Ok(Json(state.feed.clear_all(&recipient(&user)).await?))
}

/// Send a test notification to the caller's own feed and device.
async fn send_test(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<FanoutReport> {
    let report = state
        .fanout
        .dispatch(FanoutEvent::TestNotification {
            user_id: user.user_id,
            role: user.role,
        })
        .await;
    Json(report)
}

#[derive(Deserialize)]
pub struct PushTokenRequest {
    token: String,
}

async fn register_push_token(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<PushTokenRequest>,
) -> Result<StatusCode> {
    state
        .profiles
        .register_push_token(&user.user_id, &request.token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
