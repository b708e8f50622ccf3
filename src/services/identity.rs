// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local user records for verified external identities.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{User, VerifiedIdentity};
use crate::time_utils::Clock;
use std::sync::Arc;

/// Creates or refreshes the local user on each successful authentication.
pub struct IdentityService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl IdentityService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Create the user on first login, otherwise refresh profile fields and
    /// `last_login_at`. The admin flag is never touched here.
    pub async fn upsert(&self, identity: &VerifiedIdentity) -> Result<User> {
        let now = self.clock.now();

        let Some(mut user) = self.store.get_user(&identity.uid).await? else {
            return self.create(identity).await;
        };

        if !user.is_active {
            tracing::warn!(uid = %user.uid, "Login attempt on deactivated account");
            return Err(AppError::AccountDeactivated);
        }

        if let Some(email) = normalized_email(identity) {
            if email != user.email {
                self.ensure_email_available(&email, &user.uid).await?;
                user.email = email;
            }
            user.email_verified = identity.email_verified;
        }
        if let Some(name) = non_empty(&identity.name) {
            user.display_name = Some(name.to_string());
        }
        if let Some(first) = non_empty(&identity.given_name) {
            user.first_name = Some(first.to_string());
        }
        if let Some(last) = non_empty(&identity.family_name) {
            user.last_name = Some(last.to_string());
        }
        if let Some(phone) = non_empty(&identity.phone_number) {
            user.phone_number = Some(phone.to_string());
        }
        if let Some(photo) = non_empty(&identity.photo_url) {
            user.photo_url = Some(photo.to_string());
        }
        user.last_login_at = Some(now);
        user.updated_at = now;

        self.store.save_user(&user).await?;
        tracing::debug!(uid = %user.uid, "User login refreshed");

        Ok(user)
    }

    pub async fn get_user(&self, uid: &str) -> Result<User> {
        self.store
            .get_user(uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))
    }

    /// Soft activate or deactivate an account. Users are never deleted.
    pub async fn set_active(&self, uid: &str, is_active: bool) -> Result<User> {
        let mut user = self.get_user(uid).await?;
        if user.is_active != is_active {
            user.is_active = is_active;
            user.updated_at = self.clock.now();
            self.store.save_user(&user).await?;
            tracing::info!(uid, is_active, "User active flag changed");
        }
        Ok(user)
    }

    /// Grant or revoke admin rights (admin-only path).
    pub async fn set_admin(&self, uid: &str, is_admin: bool) -> Result<User> {
        let mut user = self.get_user(uid).await?;
        if user.is_admin != is_admin {
            user.is_admin = is_admin;
            user.updated_at = self.clock.now();
            self.store.save_user(&user).await?;
            tracing::info!(uid, is_admin, "User admin flag changed");
        }
        Ok(user)
    }

    async fn create(&self, identity: &VerifiedIdentity) -> Result<User> {
        let email = normalized_email(identity).ok_or_else(|| {
            AppError::InvalidToken("token has no email claim for a new account".to_string())
        })?;
        self.ensure_email_available(&email, &identity.uid).await?;

        let now = self.clock.now();
        let user = User {
            uid: identity.uid.clone(),
            email,
            email_verified: identity.email_verified,
            display_name: non_empty(&identity.name).map(str::to_string),
            first_name: non_empty(&identity.given_name).map(str::to_string),
            last_name: non_empty(&identity.family_name).map(str::to_string),
            phone_number: non_empty(&identity.phone_number).map(str::to_string),
            photo_url: non_empty(&identity.photo_url).map(str::to_string),
            is_active: true,
            is_admin: false,
            last_login_at: Some(now),
            created_at: now,
            updated_at: now,
        };

        self.store.save_user(&user).await?;
        tracing::info!(uid = %user.uid, email = %user.email, "New user created");

        Ok(user)
    }

    async fn ensure_email_available(&self, email: &str, uid: &str) -> Result<()> {
        match self.store.get_user_by_email(email).await? {
            Some(other) if other.uid != uid => {
                tracing::warn!(uid, other_uid = %other.uid, "Email already linked to another user");
                Err(AppError::Forbidden(
                    "email is linked to another account".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Emails compare case-insensitively, so they are stored lower-cased.
fn normalized_email(identity: &VerifiedIdentity) -> Option<String> {
    non_empty(&identity.email).map(str::to_lowercase)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
