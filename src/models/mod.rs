// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod subscription;
pub mod user;

pub use subscription::{NewSubscription, PlanType, Subscription, SubscriptionStatus};
pub use user::{User, VerifiedIdentity};
