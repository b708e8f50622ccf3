// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription lifecycle: period math, status derivation, and transitions.
//!
//! States are `pending`, `active`, `expired` and `cancelled`:
//!
//! - pending → active only when payment is confirmed (`activate`)
//! - active → expired when the period ends (derived on read, never stored eagerly)
//! - active/expired → active via `renew`, which starts a new billing period;
//!   pending records cannot be renewed
//! - any → cancelled via `cancel`; cancelled is terminal
//!
//! The free functions are pure and operate on values. `SubscriptionService`
//! loads a record, applies a transition to a copy, and persists it, so a failed
//! transition or write leaves the stored record untouched.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{NewSubscription, PlanType, Subscription, SubscriptionStatus};
use crate::time_utils::Clock;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const MAX_CANCELLATION_REASON_LEN: usize = 500;

/// End of a billing period that starts at `start`.
///
/// Fails when the end would fall outside the representable date range.
pub fn compute_end_date(start: DateTime<Utc>, plan: PlanType) -> Result<DateTime<Utc>> {
    start.checked_add_signed(plan.duration()).ok_or_else(|| {
        AppError::BadRequest(format!(
            "a {plan} period starting at {start} ends outside the supported date range"
        ))
    })
}

/// Billing date `offset` before `end_date`, clamped to the supported range.
fn next_billing(end_date: DateTime<Utc>, offset: Duration) -> DateTime<Utc> {
    end_date
        .checked_sub_signed(offset)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Status as of `now`. Always use this instead of the stored value.
pub fn derive_status(subscription: &Subscription, now: DateTime<Utc>) -> SubscriptionStatus {
    if subscription.status == SubscriptionStatus::Cancelled {
        return SubscriptionStatus::Cancelled;
    }
    if now > subscription.end_date {
        return SubscriptionStatus::Expired;
    }
    subscription.status
}

/// Start a new billing period.
///
/// The period begins at the later of the current end date and `now`, so a
/// renewal never lands in the past. Expired subscriptions may be renewed late;
/// pending and cancelled ones are rejected.
pub fn renew(
    subscription: &Subscription,
    now: DateTime<Utc>,
    pre_billing_offset: Duration,
) -> Result<Subscription> {
    // Pending still awaits payment confirmation; only `activate` may start it.
    if matches!(
        subscription.status,
        SubscriptionStatus::Cancelled | SubscriptionStatus::Pending
    ) {
        return Err(AppError::InvalidState {
            operation: "renew",
            status: subscription.status,
        });
    }

    let start_date = subscription.end_date.max(now);
    let end_date = compute_end_date(start_date, subscription.plan_type)?;

    Ok(Subscription {
        status: SubscriptionStatus::Active,
        start_date,
        end_date,
        next_billing_date: Some(next_billing(end_date, pre_billing_offset)),
        updated_at: now,
        ..subscription.clone()
    })
}

/// Cancel, regardless of prior status.
///
/// Cancelling twice yields the same record as cancelling once: the original
/// `cancelled_at` and reason are kept.
pub fn cancel(
    subscription: &Subscription,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Subscription {
    let mut next = Subscription {
        status: SubscriptionStatus::Cancelled,
        auto_renew: false,
        next_billing_date: None,
        cancelled_at: subscription.cancelled_at.or(Some(now)),
        cancellation_reason: subscription.cancellation_reason.clone().or(reason),
        ..subscription.clone()
    };

    if next != *subscription {
        next.updated_at = now;
    }
    next
}

/// Confirm payment on a pending subscription.
pub fn activate(subscription: &Subscription, now: DateTime<Utc>) -> Result<Subscription> {
    if subscription.status != SubscriptionStatus::Pending {
        return Err(AppError::InvalidState {
            operation: "activate",
            status: subscription.status,
        });
    }

    Ok(Subscription {
        status: SubscriptionStatus::Active,
        updated_at: now,
        ..subscription.clone()
    })
}

/// Subscription with read-time derived fields, for display.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub effective_status: SubscriptionStatus,
    pub is_active: bool,
    pub is_expired: bool,
    pub days_remaining: i64,
}

impl SubscriptionView {
    pub fn new(subscription: Subscription, now: DateTime<Utc>) -> Self {
        let effective_status = derive_status(&subscription, now);
        let is_active = effective_status == SubscriptionStatus::Active
            && subscription.start_date <= now
            && now <= subscription.end_date;
        let is_expired = now > subscription.end_date;
        let days_remaining = if is_active {
            (subscription.end_date - now).num_days().max(0)
        } else {
            0
        };

        Self {
            subscription,
            effective_status,
            is_active,
            is_expired,
            days_remaining,
        }
    }
}

/// Store-backed lifecycle operations.
pub struct SubscriptionService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    pre_billing_offset: Duration,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, pre_billing_offset: Duration) -> Self {
        Self {
            store,
            clock,
            pre_billing_offset,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn get_effective_status(&self, subscription: &Subscription) -> SubscriptionStatus {
        derive_status(subscription, self.clock.now())
    }

    pub fn view(&self, subscription: Subscription) -> SubscriptionView {
        SubscriptionView::new(subscription, self.clock.now())
    }

    pub async fn get_subscription(&self, id: &str) -> Result<Subscription> {
        self.store
            .get_subscription(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Subscription {} not found", id)))
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<SubscriptionView>> {
        let now = self.clock.now();
        Ok(self
            .store
            .list_subscriptions_for_user(user_id)
            .await?
            .into_iter()
            .map(|s| SubscriptionView::new(s, now))
            .collect())
    }

    pub async fn list_all(&self, limit: u32) -> Result<Vec<SubscriptionView>> {
        let now = self.clock.now();
        Ok(self
            .store
            .list_subscriptions(limit)
            .await?
            .into_iter()
            .map(|s| SubscriptionView::new(s, now))
            .collect())
    }

    /// Record a subscription for a payment event.
    pub async fn create_subscription(&self, new: NewSubscription) -> Result<Subscription> {
        if new.amount_minor < 0 {
            return Err(AppError::BadRequest(
                "amount must not be negative".to_string(),
            ));
        }
        let currency = new.currency.trim().to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AppError::BadRequest(format!(
                "invalid ISO 4217 currency code: {}",
                new.currency
            )));
        }

        if self.store.get_user(&new.user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", new.user_id)));
        }

        let now = self.clock.now();
        let start_date = new.start_date.unwrap_or(now);
        let end_date = compute_end_date(start_date, new.plan_type)?;
        let status = if new.payment_confirmed {
            SubscriptionStatus::Active
        } else {
            SubscriptionStatus::Pending
        };

        let subscription = Subscription {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: new.user_id,
            plan_type: new.plan_type,
            status,
            amount_minor: new.amount_minor,
            currency,
            payment_method: new.payment_method,
            payment_reference: new.payment_reference,
            start_date,
            end_date,
            next_billing_date: new
                .auto_renew
                .then(|| next_billing(end_date, self.pre_billing_offset)),
            auto_renew: new.auto_renew,
            cancelled_at: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };

        self.store.save_subscription(&subscription).await?;

        tracing::info!(
            subscription_id = %subscription.id,
            uid = %subscription.user_id,
            plan = %subscription.plan_type,
            status = %subscription.status,
            "Subscription created"
        );

        Ok(subscription)
    }

    pub async fn activate_subscription(&self, id: &str) -> Result<Subscription> {
        let current = self.get_subscription(id).await?;
        let next = activate(&current, self.clock.now())?;
        self.store.save_subscription(&next).await?;

        tracing::info!(subscription_id = %id, "Subscription activated");
        Ok(next)
    }

    pub async fn renew_subscription(&self, id: &str) -> Result<Subscription> {
        let current = self.get_subscription(id).await?;
        let next = renew(&current, self.clock.now(), self.pre_billing_offset).inspect_err(|e| {
            tracing::warn!(subscription_id = %id, error = %e, "Renewal rejected");
        })?;
        self.store.save_subscription(&next).await?;

        tracing::info!(
            subscription_id = %id,
            previous_status = %current.status,
            end_date = %next.end_date,
            "Subscription renewed"
        );
        Ok(next)
    }

    pub async fn cancel_subscription(&self, id: &str, reason: Option<String>) -> Result<Subscription> {
        if reason
            .as_ref()
            .is_some_and(|r| r.chars().count() > MAX_CANCELLATION_REASON_LEN)
        {
            return Err(AppError::BadRequest(format!(
                "cancellation reason exceeds {MAX_CANCELLATION_REASON_LEN} characters"
            )));
        }

        let current = self.get_subscription(id).await?;
        let next = cancel(&current, reason, self.clock.now());

        if next == current {
            tracing::debug!(subscription_id = %id, "Subscription already cancelled");
            return Ok(current);
        }

        self.store.save_subscription(&next).await?;

        tracing::info!(
            subscription_id = %id,
            previous_status = %current.status,
            "Subscription cancelled"
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn monthly_from(start: DateTime<Utc>) -> Subscription {
        Subscription {
            id: "sub-1".to_string(),
            user_id: "uid-1".to_string(),
            plan_type: PlanType::Monthly,
            status: SubscriptionStatus::Active,
            amount_minor: 999,
            currency: "USD".to_string(),
            payment_method: Some("stripe".to_string()),
            payment_reference: Some("pi_123".to_string()),
            start_date: start,
            end_date: start + Duration::days(30),
            next_billing_date: Some(start + Duration::days(30)),
            auto_renew: true,
            cancelled_at: None,
            cancellation_reason: None,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn end_date_adds_plan_days() {
        let start = at(2024, 1, 1);
        assert_eq!(compute_end_date(start, PlanType::Monthly).unwrap(), at(2024, 1, 31));
        assert_eq!(compute_end_date(start, PlanType::SemiAnnual).unwrap(), at(2024, 7, 1));
        assert_eq!(compute_end_date(start, PlanType::Annual).unwrap(), at(2024, 12, 31));
    }

    #[test]
    fn longer_plans_end_later() {
        let start = at(2023, 3, 15);
        let monthly = compute_end_date(start, PlanType::Monthly).unwrap();
        let semi = compute_end_date(start, PlanType::SemiAnnual).unwrap();
        let annual = compute_end_date(start, PlanType::Annual).unwrap();
        assert!(monthly < semi && semi < annual);
    }

    #[test]
    fn end_date_past_supported_range_is_rejected() {
        let start = DateTime::<Utc>::MAX_UTC - Duration::days(10);
        assert!(matches!(
            compute_end_date(start, PlanType::Annual),
            Err(AppError::BadRequest(_))
        ));

        // Renewal of a record that already ends near the limit fails the same way.
        let mut sub = monthly_from(at(2024, 1, 1));
        sub.end_date = start;
        assert!(matches!(
            renew(&sub, at(2024, 2, 1), Duration::zero()),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn status_expires_after_end_date() {
        let sub = monthly_from(at(2024, 1, 1));
        assert_eq!(derive_status(&sub, at(2024, 1, 31)), SubscriptionStatus::Active);
        assert_eq!(derive_status(&sub, at(2024, 2, 1)), SubscriptionStatus::Expired);
    }

    #[test]
    fn pending_is_kept_until_end_date() {
        let mut sub = monthly_from(at(2024, 1, 1));
        sub.status = SubscriptionStatus::Pending;
        assert_eq!(derive_status(&sub, at(2024, 1, 10)), SubscriptionStatus::Pending);
        assert_eq!(derive_status(&sub, at(2024, 3, 1)), SubscriptionStatus::Expired);
    }

    #[test]
    fn cancelled_is_never_overridden() {
        let sub = cancel(&monthly_from(at(2024, 1, 1)), None, at(2024, 1, 5));
        for now in [at(2023, 1, 1), at(2024, 1, 10), at(2030, 1, 1)] {
            assert_eq!(derive_status(&sub, now), SubscriptionStatus::Cancelled);
        }
    }

    #[test]
    fn late_renewal_starts_now() {
        let sub = monthly_from(at(2024, 1, 1));
        let renewed = renew(&sub, at(2024, 2, 10), Duration::zero()).unwrap();

        assert_eq!(renewed.start_date, at(2024, 2, 10));
        assert_eq!(renewed.end_date, at(2024, 3, 11));
        assert_eq!(renewed.next_billing_date, Some(at(2024, 3, 11)));
        assert_eq!(renewed.status, SubscriptionStatus::Active);
        assert_eq!(renewed.id, sub.id);
    }

    #[test]
    fn early_renewal_extends_from_end_date() {
        let sub = monthly_from(at(2024, 1, 1));
        let renewed = renew(&sub, at(2024, 1, 20), Duration::days(3)).unwrap();

        assert_eq!(renewed.start_date, at(2024, 1, 31));
        assert_eq!(renewed.end_date, at(2024, 3, 1));
        assert_eq!(renewed.next_billing_date, Some(at(2024, 2, 27)));
    }

    #[test]
    fn renewing_expired_reactivates() {
        let mut sub = monthly_from(at(2024, 1, 1));
        sub.status = SubscriptionStatus::Expired;
        let renewed = renew(&sub, at(2024, 5, 1), Duration::zero()).unwrap();
        assert_eq!(renewed.status, SubscriptionStatus::Active);
        assert_eq!(derive_status(&renewed, at(2024, 5, 2)), SubscriptionStatus::Active);
    }

    #[test]
    fn renewing_cancelled_fails() {
        let sub = cancel(&monthly_from(at(2024, 1, 1)), None, at(2024, 1, 5));
        let err = renew(&sub, at(2024, 2, 10), Duration::zero()).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidState {
                operation: "renew",
                status: SubscriptionStatus::Cancelled
            }
        ));
    }

    #[test]
    fn renewing_pending_fails() {
        let mut sub = monthly_from(at(2024, 1, 1));
        sub.status = SubscriptionStatus::Pending;

        // Also once its end date has passed and it reads as expired.
        for now in [at(2024, 1, 10), at(2024, 3, 1)] {
            let err = renew(&sub, now, Duration::zero()).unwrap_err();
            assert!(matches!(
                err,
                AppError::InvalidState {
                    operation: "renew",
                    status: SubscriptionStatus::Pending
                }
            ));
        }
    }

    #[test]
    fn cancel_is_idempotent() {
        let sub = monthly_from(at(2024, 1, 1));
        let once = cancel(&sub, Some("too expensive".to_string()), at(2024, 1, 5));
        let twice = cancel(&once, Some("changed my mind".to_string()), at(2024, 1, 9));

        assert_eq!(once, twice);
        assert_eq!(twice.status, SubscriptionStatus::Cancelled);
        assert!(!twice.auto_renew);
        assert_eq!(twice.next_billing_date, None);
        assert_eq!(twice.cancelled_at, Some(at(2024, 1, 5)));
        assert_eq!(twice.cancellation_reason.as_deref(), Some("too expensive"));
    }

    #[test]
    fn activate_only_from_pending() {
        let mut sub = monthly_from(at(2024, 1, 1));
        sub.status = SubscriptionStatus::Pending;
        let active = activate(&sub, at(2024, 1, 2)).unwrap();
        assert_eq!(active.status, SubscriptionStatus::Active);

        let err = activate(&active, at(2024, 1, 3)).unwrap_err();
        assert!(matches!(err, AppError::InvalidState { operation: "activate", .. }));
    }

    #[test]
    fn view_derives_display_fields() {
        let sub = monthly_from(at(2024, 1, 1));

        let view = SubscriptionView::new(sub.clone(), at(2024, 1, 21));
        assert!(view.is_active);
        assert!(!view.is_expired);
        assert_eq!(view.days_remaining, 10);

        let view = SubscriptionView::new(sub, at(2024, 2, 1));
        assert_eq!(view.effective_status, SubscriptionStatus::Expired);
        assert!(!view.is_active);
        assert!(view.is_expired);
        assert_eq!(view.days_remaining, 0);
    }

    mod service {
        use super::*;
        use crate::db::{MemoryStore, SubscriptionStore, UserStore};
        use crate::models::User;
        use crate::time_utils::FixedClock;

        async fn service(offset_days: i64) -> (SubscriptionService, Arc<MemoryStore>, Arc<FixedClock>) {
            let store = Arc::new(MemoryStore::new());
            let clock = Arc::new(FixedClock::new(at(2024, 1, 1)));
            store
                .save_user(&User {
                    uid: "uid-1".to_string(),
                    email: "ada@example.com".to_string(),
                    email_verified: true,
                    display_name: None,
                    first_name: None,
                    last_name: None,
                    phone_number: None,
                    photo_url: None,
                    is_active: true,
                    is_admin: false,
                    last_login_at: None,
                    created_at: at(2024, 1, 1),
                    updated_at: at(2024, 1, 1),
                })
                .await
                .unwrap();
            let svc = SubscriptionService::new(
                store.clone(),
                clock.clone(),
                Duration::days(offset_days),
            );
            (svc, store, clock)
        }

        fn new_monthly(payment_confirmed: bool) -> NewSubscription {
            NewSubscription {
                user_id: "uid-1".to_string(),
                plan_type: PlanType::Monthly,
                amount_minor: 999,
                currency: "usd".to_string(),
                payment_method: None,
                payment_reference: None,
                auto_renew: true,
                start_date: None,
                payment_confirmed,
            }
        }

        #[tokio::test]
        async fn create_applies_offset_and_status() {
            let (svc, store, _) = service(3).await;

            let sub = svc.create_subscription(new_monthly(false)).await.unwrap();
            assert_eq!(sub.status, SubscriptionStatus::Pending);
            assert_eq!(sub.currency, "USD");
            assert_eq!(sub.end_date, at(2024, 1, 31));
            assert_eq!(sub.next_billing_date, Some(at(2024, 1, 28)));
            assert_eq!(store.get_subscription(&sub.id).await.unwrap(), Some(sub));

            let sub = svc.create_subscription(new_monthly(true)).await.unwrap();
            assert_eq!(sub.status, SubscriptionStatus::Active);
        }

        #[tokio::test]
        async fn create_rejects_bad_input() {
            let (svc, _, _) = service(0).await;

            let mut bad = new_monthly(true);
            bad.amount_minor = -5;
            assert!(matches!(
                svc.create_subscription(bad).await,
                Err(AppError::BadRequest(_))
            ));

            let mut bad = new_monthly(true);
            bad.currency = "U5D".to_string();
            assert!(matches!(
                svc.create_subscription(bad).await,
                Err(AppError::BadRequest(_))
            ));

            let mut bad = new_monthly(true);
            bad.user_id = "ghost".to_string();
            assert!(matches!(
                svc.create_subscription(bad).await,
                Err(AppError::NotFound(_))
            ));
        }

        #[tokio::test]
        async fn failed_renewal_leaves_record_untouched() {
            let (svc, store, clock) = service(0).await;
            let sub = svc.create_subscription(new_monthly(true)).await.unwrap();

            clock.set(at(2024, 1, 10));
            let cancelled = svc
                .cancel_subscription(&sub.id, Some("moving".to_string()))
                .await
                .unwrap();

            clock.set(at(2024, 2, 10));
            let err = svc.renew_subscription(&sub.id).await.unwrap_err();
            assert!(matches!(
                err,
                AppError::InvalidState {
                    operation: "renew",
                    status: SubscriptionStatus::Cancelled
                }
            ));
            assert_eq!(
                store.get_subscription(&sub.id).await.unwrap(),
                Some(cancelled)
            );
        }

        #[tokio::test]
        async fn renew_expired_persists_new_period() {
            let (svc, store, clock) = service(0).await;
            let sub = svc.create_subscription(new_monthly(true)).await.unwrap();

            clock.set(at(2024, 2, 1));
            assert_eq!(svc.get_effective_status(&sub), SubscriptionStatus::Expired);

            clock.set(at(2024, 2, 10));
            let renewed = svc.renew_subscription(&sub.id).await.unwrap();
            assert_eq!(renewed.start_date, at(2024, 2, 10));
            assert_eq!(renewed.end_date, at(2024, 3, 11));
            assert_eq!(svc.get_effective_status(&renewed), SubscriptionStatus::Active);
            assert_eq!(
                store.get_subscription(&sub.id).await.unwrap(),
                Some(renewed)
            );
        }

        #[tokio::test]
        async fn far_future_start_date_is_rejected_without_write() {
            let (svc, store, _) = service(0).await;

            let mut new = new_monthly(true);
            new.plan_type = PlanType::Annual;
            new.start_date = Some(DateTime::<Utc>::MAX_UTC - Duration::days(1));
            assert!(matches!(
                svc.create_subscription(new).await,
                Err(AppError::BadRequest(_))
            ));
            assert!(store.list_subscriptions(10).await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn pending_subscription_needs_activation_before_renewal() {
            let (svc, store, _) = service(0).await;
            let sub = svc.create_subscription(new_monthly(false)).await.unwrap();

            let err = svc.renew_subscription(&sub.id).await.unwrap_err();
            assert!(matches!(
                err,
                AppError::InvalidState {
                    operation: "renew",
                    status: SubscriptionStatus::Pending
                }
            ));
            assert_eq!(store.get_subscription(&sub.id).await.unwrap(), Some(sub.clone()));

            svc.activate_subscription(&sub.id).await.unwrap();
            let renewed = svc.renew_subscription(&sub.id).await.unwrap();
            assert_eq!(renewed.status, SubscriptionStatus::Active);
        }

        #[tokio::test]
        async fn cancel_reason_length_is_bounded() {
            let (svc, _, _) = service(0).await;
            let sub = svc.create_subscription(new_monthly(true)).await.unwrap();

            let err = svc
                .cancel_subscription(&sub.id, Some("x".repeat(501)))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));

            let unknown = svc.cancel_subscription("nope", None).await.unwrap_err();
            assert!(matches!(unknown, AppError::NotFound(_)));
        }
    }
}
