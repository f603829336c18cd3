// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bottle Pickup: approval workflow and notification fan-out
//!
//! This crate provides the backend API for a bottle pickup marketplace
//! where vendors schedule pickups, drivers collect them and an admin
//! approves both. Account decisions and pickup changes fan out to an
//! in-app feed, push notifications and email.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::DocumentStore;
use services::{
    email::providers, ApprovalService, EmailLog, EmailProvider, EmailService, FailureSink,
    IdentityProvider, NotificationFanout, NotificationFeed, PickupService, PrivilegedFunctions,
    ProfileService, PushTransport,
};
use std::sync::Arc;

/// Outside collaborators the services are built on.
pub struct Externals {
    pub identity: Arc<dyn IdentityProvider>,
    pub privileged: Arc<dyn PrivilegedFunctions>,
    pub push: Arc<dyn PushTransport>,
    pub email_providers: Vec<Arc<dyn EmailProvider>>,
    /// Shared with the fan-out; transports report deferred failures here
    pub failures: Arc<FailureSink>,
}

impl Externals {
    /// HTTP clients for every collaborator, as configured.
    pub fn from_config(config: &Config, store: Arc<dyn DocumentStore>) -> Self {
        let failures = Arc::new(FailureSink::new());
        Self {
            identity: Arc::new(services::FirebaseIdentityClient::new(
                config.identity_base_url.clone(),
                config.identity_api_key.clone(),
            )),
            privileged: Arc::new(services::CallableFunctionsClient::new(
                config.delete_user_function_url.clone(),
                config.delete_user_function_token.clone(),
            )),
            push: Arc::new(services::ExpoPushClient::new(
                config.push_endpoint.clone(),
                store,
                failures.clone(),
            )),
            email_providers: providers::build_chain(&config.email_providers),
            failures,
        }
    }
}

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub failures: Arc<FailureSink>,
    pub email: Arc<EmailService>,
    pub fanout: Arc<NotificationFanout>,
    pub feed: NotificationFeed,
    pub approvals: ApprovalService,
    pub profiles: ProfileService,
    pub pickups: PickupService,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn DocumentStore>,
        externals: Externals,
        email_log: EmailLog,
    ) -> Self {
        let failures = externals.failures;
        let email = Arc::new(EmailService::new(
            config.email_from.clone(),
            externals.email_providers,
            Arc::new(email_log),
        ));
        let fanout = Arc::new(NotificationFanout::new(
            store.clone(),
            externals.push,
            email.clone(),
            failures.clone(),
            config.operator_email.clone(),
        ));

        Self {
            feed: NotificationFeed::new(store.clone()),
            approvals: ApprovalService::new(store.clone(), externals.privileged, fanout.clone()),
            profiles: ProfileService::new(store.clone(), externals.identity, fanout.clone()),
            pickups: PickupService::new(store.clone(), fanout.clone()),
            config,
            store,
            failures,
            email,
            fanout,
        }
    }
}
