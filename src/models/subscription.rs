// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription (payment record) model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Billing plan. Each plan has a fixed period length in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Monthly,
    #[serde(alias = "six_months")]
    SemiAnnual,
    #[serde(alias = "yearly")]
    Annual,
}

impl PlanType {
    pub const fn duration_days(self) -> i64 {
        match self {
            PlanType::Monthly => 30,
            PlanType::SemiAnnual => 182,
            PlanType::Annual => 365,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::days(self.duration_days())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlanType::Monthly => "monthly",
            PlanType::SemiAnnual => "semi_annual",
            PlanType::Annual => "annual",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored lifecycle state. `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription record stored in Firestore.
///
/// Never deleted: cancelled and expired records are kept for financial
/// retention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
pub struct Subscription {
    /// Subscription ID (also used as document ID)
    pub id: String,
    /// Owning user's Firebase UID
    pub user_id: String,
    pub plan_type: PlanType,
    /// Stored status. Read it through `lifecycle::derive_status`.
    pub status: SubscriptionStatus,
    /// Amount paid in minor currency units (e.g. cents)
    pub amount_minor: i64,
    /// ISO 4217 currency code
    pub currency: String,
    /// e.g. "stripe", "paypal"
    pub payment_method: Option<String>,
    /// External payment ID
    pub payment_reference: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub next_billing_date: Option<DateTime<Utc>>,
    pub auto_renew: bool,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for recording a new subscription after a payment event.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub user_id: String,
    pub plan_type: PlanType,
    pub amount_minor: i64,
    pub currency: String,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    pub auto_renew: bool,
    /// Defaults to the current time when absent
    pub start_date: Option<DateTime<Utc>>,
    /// Confirmed payments start out active, others pending
    pub payment_confirmed: bool,
}
