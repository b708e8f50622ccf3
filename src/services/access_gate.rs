// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Resolves a bearer credential to an active local user.

use crate::error::{AppError, Result};
use crate::models::User;
use crate::services::firebase_auth::{IdentityVerifier, VerifyError};
use crate::services::identity::IdentityService;
use std::sync::Arc;

pub struct AccessGate {
    verifier: Arc<dyn IdentityVerifier>,
    identity: Arc<IdentityService>,
}

impl AccessGate {
    pub fn new(verifier: Arc<dyn IdentityVerifier>, identity: Arc<IdentityService>) -> Self {
        Self { verifier, identity }
    }

    /// Verify the token and upsert the caller.
    ///
    /// Verification failures become `InvalidToken`; a deactivated account is
    /// reported separately as `AccountDeactivated`. Nothing is retried.
    pub async fn authenticate(&self, bearer_token: &str) -> Result<User> {
        let identity = self
            .verifier
            .verify(bearer_token)
            .await
            .map_err(|err| match err {
                VerifyError::Invalid(reason) => {
                    tracing::warn!(reason = %reason, "Rejected bearer token");
                    AppError::InvalidToken(reason)
                }
                VerifyError::Transient(reason) => AppError::IdentityProvider(reason),
            })?;

        self.identity.upsert(&identity).await
    }
}
