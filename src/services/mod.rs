// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod access_gate;
pub mod firebase_auth;
pub mod identity;
pub mod lifecycle;

pub use access_gate::AccessGate;
pub use firebase_auth::{FirebaseTokenVerifier, IdentityVerifier, VerifyError};
pub use identity::IdentityService;
pub use lifecycle::{SubscriptionService, SubscriptionView};
