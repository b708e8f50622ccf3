// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store used for local development and tests.
//!
//! Each record is replaced wholesale under the map's shard lock, so a save is
//! atomic with respect to concurrent readers.

use crate::db::{SubscriptionStore, UserStore};
use crate::error::AppError;
use crate::models::{Subscription, User};
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    subscriptions: DashMap<String, Subscription>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(uid).map(|u| u.value().clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| u.value().clone()))
    }

    async fn save_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(user.uid.clone(), user.clone());
        Ok(())
    }

    async fn list_users(&self, limit: u32) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        users.truncate(limit as usize);
        Ok(users)
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn get_subscription(&self, id: &str) -> Result<Option<Subscription>, AppError> {
        Ok(self.subscriptions.get(id).map(|s| s.value().clone()))
    }

    async fn save_subscription(&self, subscription: &Subscription) -> Result<(), AppError> {
        self.subscriptions
            .insert(subscription.id.clone(), subscription.clone());
        Ok(())
    }

    async fn list_subscriptions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Subscription>, AppError> {
        let mut subscriptions: Vec<Subscription> = self
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.value().clone())
            .collect();
        subscriptions.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(subscriptions)
    }

    async fn list_subscriptions(&self, limit: u32) -> Result<Vec<Subscription>, AppError> {
        let mut subscriptions: Vec<Subscription> = self
            .subscriptions
            .iter()
            .map(|s| s.value().clone())
            .collect();
        subscriptions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        subscriptions.truncate(limit as usize);
        Ok(subscriptions)
    }
}
