//! Database layer (Firestore, with an in-memory store for local dev and tests).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{Subscription, User};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const SUBSCRIPTIONS: &str = "subscriptions";
}

/// Persistence for user records, keyed by Firebase UID.
///
/// A single `save_user` must be atomic: readers never see a partial write.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError>;

    /// Case-insensitive lookup. Emails are stored lower-cased.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Create or replace a user.
    async fn save_user(&self, user: &User) -> Result<(), AppError>;

    async fn list_users(&self, limit: u32) -> Result<Vec<User>, AppError>;
}

/// Persistence for subscription records, keyed by subscription ID.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn get_subscription(&self, id: &str) -> Result<Option<Subscription>, AppError>;

    /// Create or replace a subscription.
    async fn save_subscription(&self, subscription: &Subscription) -> Result<(), AppError>;

    /// All subscriptions owned by a user, newest start date first.
    async fn list_subscriptions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Subscription>, AppError>;

    async fn list_subscriptions(&self, limit: u32) -> Result<Vec<Subscription>, AppError>;
}

/// Combined store handed to services.
pub trait Store: UserStore + SubscriptionStore {}

impl<T: UserStore + SubscriptionStore> Store for T {}
