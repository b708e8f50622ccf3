// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Betty API: users and subscriptions behind Firebase authentication
//!
//! This crate provides the backend API and admin endpoints for subscription
//! records, with lifecycle rules (renewal, cancellation, expiry) enforced in
//! one place.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Store;
use services::{AccessGate, IdentityService, IdentityVerifier, SubscriptionService};
use std::sync::Arc;
use time_utils::Clock;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn Store>,
    pub access_gate: AccessGate,
    pub identity_service: Arc<IdentityService>,
    pub subscription_service: SubscriptionService,
}

impl AppState {
    /// Wire services around an explicitly constructed store, verifier and clock.
    pub fn new(
        config: Config,
        db: Arc<dyn Store>,
        verifier: Arc<dyn IdentityVerifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let identity_service = Arc::new(IdentityService::new(db.clone(), clock.clone()));
        let access_gate = AccessGate::new(verifier, identity_service.clone());
        let subscription_service = SubscriptionService::new(
            db.clone(),
            clock,
            chrono::Duration::days(config.pre_billing_offset_days),
        );

        Self {
            config,
            db,
            access_gate,
            identity_service,
            subscription_service,
        }
    }
}
