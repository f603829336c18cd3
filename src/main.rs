// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bottle Pickup API Server
//!
//! Hosts the approval workflow, notification feed and pickup lifecycle
//! for vendors, drivers and the admin.

use bottle_pickup_api::{
    config::Config,
    db::{check_connectivity, DocumentStore, FirestoreStore},
    services::push::{MessageContext, PushContent},
    services::EmailLog,
    AppState, Externals,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Bottle Pickup API");

    let store: Arc<dyn DocumentStore> = Arc::new(
        FirestoreStore::new(&config.gcp_project_id, config.subscription_poll_interval).await?,
    );

    // Nothing works without the database; refuse to start
    check_connectivity(store.as_ref(), config.startup_check_timeout).await?;
    tracing::info!(project = %config.gcp_project_id, "Firestore reachable");

    let email_log = match &config.email_log_path {
        Some(path) => EmailLog::open(path.clone()).await,
        None => EmailLog::in_memory(),
    };
    tracing::info!(
        providers = ?config.email_providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
        "Email provider chain configured"
    );

    let externals = Externals::from_config(&config, store.clone());
    externals.push.on_message(Arc::new(|content: &PushContent, context: MessageContext| {
        tracing::info!(title = %content.title, context = ?context, "Push delivered");
    }));
    let state = Arc::new(AppState::new(config.clone(), store, externals, email_log));

    let app = bottle_pickup_api::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bottle_pickup_api=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
