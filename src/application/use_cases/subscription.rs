use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{clock::Clock, isolation, jwt::Principal, tenant_context::TenantContext},
    domain::entities::{
        subscription::{Subscription, SubscriptionHistory, SubscriptionStatus},
        subscription_plan::SubscriptionPlan,
        tenant::Tenant,
    },
};

// ============================================================================
// Repository Traits
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreateSubscriptionInput {
    pub tenant_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub starts_at: NaiveDate,
    pub expires_at: NaiveDate,
}

/// State written by one transition. `expected_status` makes the write an
/// optimistic compare-and-set so a cancellation racing an activation cannot
/// silently lose an update.
#[derive(Debug, Clone)]
pub struct SubscriptionStateUpdate {
    pub expected_status: SubscriptionStatus,
    pub status: SubscriptionStatus,
    pub starts_at: Option<NaiveDate>,
    pub expires_at: Option<NaiveDate>,
    /// `Some(None)` clears the grace window, `None` leaves it untouched.
    pub grace_period_ends_at: Option<Option<NaiveDate>>,
}

#[async_trait]
pub trait SubscriptionRepoTrait: Send + Sync {
    async fn create(&self, input: &CreateSubscriptionInput) -> AppResult<Subscription>;

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Subscription>>;

    async fn get_by_tenant(&self, tenant_id: Uuid) -> AppResult<Option<Subscription>>;

    async fn set_plan(&self, id: Uuid, plan_id: Uuid) -> AppResult<Subscription>;

    /// Returns `None` when `expected_status` no longer matches (lost the
    /// race); callers decide whether that is a no-op or a retry.
    async fn update_state(
        &self,
        id: Uuid,
        update: &SubscriptionStateUpdate,
    ) -> AppResult<Option<Subscription>>;

    /// Active/trial subscriptions whose expiry and grace have both passed.
    async fn list_lapsed(&self, today: NaiveDate, limit: i64) -> AppResult<Vec<Subscription>>;
}

#[derive(Debug, Clone)]
pub struct HistoryInput {
    pub subscription_id: Uuid,
    pub previous_status: SubscriptionStatus,
    pub new_status: SubscriptionStatus,
    pub reason: String,
    pub actor: Option<Uuid>,
}

#[async_trait]
pub trait SubscriptionHistoryRepoTrait: Send + Sync {
    async fn append(&self, input: &HistoryInput) -> AppResult<SubscriptionHistory>;

    async fn list_by_subscription(
        &self,
        subscription_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<SubscriptionHistory>>;
}

#[async_trait]
pub trait SubscriptionPlanRepoTrait: Send + Sync {
    async fn create(&self, plan: &SubscriptionPlan) -> AppResult<SubscriptionPlan>;

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionPlan>>;

    async fn list(&self, include_inactive: bool) -> AppResult<Vec<SubscriptionPlan>>;

    /// Prospective update: price/currency/active only; live subscriptions
    /// keep the terms their current invoices were generated with.
    async fn update(
        &self,
        id: Uuid,
        price_cents: Option<i64>,
        currency: Option<String>,
        active: Option<bool>,
    ) -> AppResult<SubscriptionPlan>;
}

#[async_trait]
pub trait TenantRepoTrait: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Tenant>>;
}

// ============================================================================
// Views
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub starts_at: NaiveDate,
    pub expires_at: NaiveDate,
    pub grace_period_ends_at: Option<NaiveDate>,
    pub in_grace_period: bool,
    pub usable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    pub previous_status: SubscriptionStatus,
    pub new_status: SubscriptionStatus,
    pub reason: String,
    pub actor: Option<Uuid>,
    pub created_at: Option<chrono::NaiveDateTime>,
}

// ============================================================================
// Use Cases
// ============================================================================

pub const HISTORY_PAGE_LIMIT: i64 = 100;

pub struct SubscriptionUseCases {
    subscription_repo: Arc<dyn SubscriptionRepoTrait>,
    history_repo: Arc<dyn SubscriptionHistoryRepoTrait>,
    plan_repo: Arc<dyn SubscriptionPlanRepoTrait>,
    clock: Arc<dyn Clock>,
    grace_period_days: u32,
}

impl SubscriptionUseCases {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepoTrait>,
        history_repo: Arc<dyn SubscriptionHistoryRepoTrait>,
        plan_repo: Arc<dyn SubscriptionPlanRepoTrait>,
        clock: Arc<dyn Clock>,
        grace_period_days: u32,
    ) -> Self {
        Self {
            subscription_repo,
            history_repo,
            plan_repo,
            clock,
            grace_period_days,
        }
    }

    async fn active_plan(&self, plan_id: Uuid) -> AppResult<SubscriptionPlan> {
        match self.plan_repo.get_by_id(plan_id).await? {
            Some(plan) if plan.active => Ok(plan),
            _ => Err(AppError::PlanUnavailable),
        }
    }

    async fn transition(
        &self,
        subscription: &Subscription,
        update: SubscriptionStateUpdate,
        reason: &str,
        actor: Option<Uuid>,
    ) -> AppResult<Option<Subscription>> {
        let new_status = update.status;
        let updated = self
            .subscription_repo
            .update_state(subscription.id, &update)
            .await?;

        if updated.is_some() {
            self.history_repo
                .append(&HistoryInput {
                    subscription_id: subscription.id,
                    previous_status: subscription.status,
                    new_status,
                    reason: reason.to_string(),
                    actor,
                })
                .await?;
        } else {
            tracing::warn!(
                subscription_id = %subscription.id,
                expected = subscription.status.as_str(),
                attempted = new_status.as_str(),
                reason,
                "Subscription transition lost an optimistic race, skipped"
            );
        }
        Ok(updated)
    }

    /// First plan selection creates the subscription in Pending; while still
    /// Pending (or lapsed) a re-selection just repoints the plan, and a
    /// cancelled subscription re-enters the lifecycle at Pending so the
    /// usual pay-and-activate path can bring the tenant back. A usable
    /// subscription cannot select a plan here.
    pub async fn select_plan(
        &self,
        principal: &Principal,
        tenant_id: Uuid,
        plan_id: Uuid,
    ) -> AppResult<Subscription> {
        isolation::authorize(
            TenantContext::get(),
            Some(tenant_id),
            principal.platform_operator,
        )?;
        let plan = self.active_plan(plan_id).await?;
        let today = self.clock.today();

        match self.subscription_repo.get_by_tenant(tenant_id).await? {
            None => {
                let created = self
                    .subscription_repo
                    .create(&CreateSubscriptionInput {
                        tenant_id,
                        plan_id: plan.id,
                        status: SubscriptionStatus::Pending,
                        starts_at: today,
                        // No entitlement until a payment confirms.
                        expires_at: today,
                    })
                    .await?;
                self.history_repo
                    .append(&HistoryInput {
                        subscription_id: created.id,
                        previous_status: SubscriptionStatus::None,
                        new_status: SubscriptionStatus::Pending,
                        reason: format!("plan {} selected", plan.code),
                        actor: Some(principal.user_id),
                    })
                    .await?;
                Ok(created)
            }
            Some(existing) if existing.is_usable(today) => Err(AppError::InvalidInput(
                "tenant already has a usable subscription".into(),
            )),
            Some(existing) => {
                let updated = self.subscription_repo.set_plan(existing.id, plan.id).await?;
                if updated.status != SubscriptionStatus::Cancelled {
                    return Ok(updated);
                }
                let reopened = self
                    .transition(
                        &updated,
                        SubscriptionStateUpdate {
                            expected_status: SubscriptionStatus::Cancelled,
                            status: SubscriptionStatus::Pending,
                            starts_at: None,
                            expires_at: None,
                            grace_period_ends_at: None,
                        },
                        &format!("plan {} re-selected after cancellation", plan.code),
                        Some(principal.user_id),
                    )
                    .await?;
                match reopened {
                    Some(sub) => Ok(sub),
                    None => self
                        .subscription_repo
                        .get_by_id(updated.id)
                        .await?
                        .ok_or(AppError::NotFound),
                }
            }
        }
    }

    /// Trial entry, parallel to Pending. Requires a plan with trial days.
    pub async fn start_trial(
        &self,
        principal: &Principal,
        tenant_id: Uuid,
        plan_id: Uuid,
    ) -> AppResult<Subscription> {
        isolation::authorize(
            TenantContext::get(),
            Some(tenant_id),
            principal.platform_operator,
        )?;
        let plan = self.active_plan(plan_id).await?;
        if plan.trial_days <= 0 {
            return Err(AppError::PlanUnavailable);
        }
        let today = self.clock.today();
        let trial_end = today + chrono::Days::new(plan.trial_days as u64);

        match self.subscription_repo.get_by_tenant(tenant_id).await? {
            None => {
                let created = self
                    .subscription_repo
                    .create(&CreateSubscriptionInput {
                        tenant_id,
                        plan_id: plan.id,
                        status: SubscriptionStatus::Trial,
                        starts_at: today,
                        expires_at: trial_end,
                    })
                    .await?;
                self.history_repo
                    .append(&HistoryInput {
                        subscription_id: created.id,
                        previous_status: SubscriptionStatus::None,
                        new_status: SubscriptionStatus::Trial,
                        reason: format!("trial started on plan {}", plan.code),
                        actor: Some(principal.user_id),
                    })
                    .await?;
                Ok(created)
            }
            Some(existing) if existing.status == SubscriptionStatus::Pending => {
                let updated = self
                    .transition(
                        &existing,
                        SubscriptionStateUpdate {
                            expected_status: SubscriptionStatus::Pending,
                            status: SubscriptionStatus::Trial,
                            starts_at: Some(today),
                            expires_at: Some(trial_end),
                            grace_period_ends_at: Some(None),
                        },
                        "trial started",
                        Some(principal.user_id),
                    )
                    .await?;
                updated.ok_or(AppError::Internal(
                    "subscription changed concurrently".into(),
                ))
            }
            Some(_) => Err(AppError::InvalidInput(
                "trial is only available before the first activation".into(),
            )),
        }
    }

    /// Confirmed-payment activation. Idempotent: re-activating a
    /// subscription that is still inside its paid window is a no-op apart
    /// from a debug line, because the event pipeline may redeliver.
    pub async fn activate(
        &self,
        subscription_id: Uuid,
        source: &str,
        actor: Option<Uuid>,
    ) -> AppResult<Subscription> {
        let subscription = self
            .subscription_repo
            .get_by_id(subscription_id)
            .await?
            .ok_or(AppError::NotFound)?;
        // Plan check happens before any mutation.
        let plan = self.active_plan(subscription.plan_id).await?;

        let today = self.clock.today();
        if subscription.status == SubscriptionStatus::Active && subscription.expires_at >= today {
            tracing::debug!(
                subscription_id = %subscription.id,
                source,
                "Activation replayed for an already-active period, no-op"
            );
            return Ok(subscription);
        }
        if subscription.status == SubscriptionStatus::Cancelled {
            return Err(AppError::InvalidInput(
                "cancelled subscription cannot be activated".into(),
            ));
        }

        // A renewal paid before the old period lapsed extends from the old
        // expiry; anything else starts a fresh period today.
        let starts_at = if subscription.expires_at >= today
            && subscription.status != SubscriptionStatus::Pending
        {
            subscription.expires_at
        } else {
            today
        };
        let expires_at = plan.billing_cycle.period_end(starts_at);
        let grace_period_ends_at = if self.grace_period_days > 0 {
            Some(expires_at + chrono::Days::new(self.grace_period_days as u64))
        } else {
            None
        };

        let updated = self
            .transition(
                &subscription,
                SubscriptionStateUpdate {
                    expected_status: subscription.status,
                    status: SubscriptionStatus::Active,
                    starts_at: Some(starts_at),
                    expires_at: Some(expires_at),
                    grace_period_ends_at: Some(grace_period_ends_at),
                },
                source,
                actor,
            )
            .await?;

        match updated {
            Some(sub) => Ok(sub),
            // Lost the race; the other writer either activated (replay is
            // then a no-op) or cancelled. Re-read and let the caller's
            // idempotency settle it.
            None => self
                .subscription_repo
                .get_by_id(subscription_id)
                .await?
                .ok_or(AppError::NotFound),
        }
    }

    pub async fn cancel(
        &self,
        principal: &Principal,
        tenant_id: Uuid,
        reason: &str,
    ) -> AppResult<Subscription> {
        isolation::authorize(
            TenantContext::get(),
            Some(tenant_id),
            principal.platform_operator,
        )?;
        let subscription = self
            .subscription_repo
            .get_by_tenant(tenant_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if subscription.status == SubscriptionStatus::Cancelled {
            return Ok(subscription);
        }

        let updated = self
            .transition(
                &subscription,
                SubscriptionStateUpdate {
                    expected_status: subscription.status,
                    status: SubscriptionStatus::Cancelled,
                    starts_at: None,
                    expires_at: None,
                    grace_period_ends_at: Some(None),
                },
                reason,
                Some(principal.user_id),
            )
            .await?;
        updated.ok_or(AppError::Internal(
            "subscription changed concurrently".into(),
        ))
    }

    /// The access gate. Resolves the tenant from the task context, loads the
    /// subscription and evaluates usability at read time. Expiry observed
    /// here is also persisted (lazy counterpart of the sweep).
    pub async fn assert_current_tenant_usable(&self) -> AppResult<()> {
        let tenant_id = TenantContext::require()?;
        let Some(subscription) = self.subscription_repo.get_by_tenant(tenant_id).await? else {
            return Err(AppError::SubscriptionExpired);
        };

        let today = self.clock.today();
        if subscription.is_usable(today) {
            return Ok(());
        }

        if matches!(
            subscription.status,
            SubscriptionStatus::Active | SubscriptionStatus::Trial
        ) {
            // Best effort: the denial stands regardless of who wins the write.
            let _ = self
                .transition(
                    &subscription,
                    SubscriptionStateUpdate {
                        expected_status: subscription.status,
                        status: SubscriptionStatus::Expired,
                        starts_at: None,
                        expires_at: None,
                        grace_period_ends_at: None,
                    },
                    "expiry observed on access",
                    None,
                )
                .await?;
        }
        Err(AppError::SubscriptionExpired)
    }

    /// Scheduled counterpart of the lazy check; returns how many
    /// subscriptions were moved to Expired.
    pub async fn expire_lapsed(&self, limit: i64) -> AppResult<u64> {
        let today = self.clock.today();
        let lapsed = self.subscription_repo.list_lapsed(today, limit).await?;
        let mut expired = 0u64;
        for subscription in lapsed {
            if self
                .transition(
                    &subscription,
                    SubscriptionStateUpdate {
                        expected_status: subscription.status,
                        status: SubscriptionStatus::Expired,
                        starts_at: None,
                        expires_at: None,
                        grace_period_ends_at: None,
                    },
                    "expiry sweep",
                    None,
                )
                .await?
                .is_some()
            {
                expired += 1;
            }
        }
        Ok(expired)
    }

    pub async fn status(
        &self,
        principal: &Principal,
        tenant_id: Uuid,
    ) -> AppResult<SubscriptionView> {
        isolation::authorize(
            TenantContext::get(),
            Some(tenant_id),
            principal.platform_operator,
        )?;
        let subscription = self
            .subscription_repo
            .get_by_tenant(tenant_id)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok(self.view(&subscription))
    }

    /// Snapshot of a subscription with the date-dependent flags resolved
    /// against the current day.
    pub fn view(&self, subscription: &Subscription) -> SubscriptionView {
        let today = self.clock.today();
        SubscriptionView {
            id: subscription.id,
            tenant_id: subscription.tenant_id,
            plan_id: subscription.plan_id,
            status: subscription.status,
            starts_at: subscription.starts_at,
            expires_at: subscription.expires_at,
            grace_period_ends_at: subscription.grace_period_ends_at,
            in_grace_period: subscription.is_in_grace_period(today),
            usable: subscription.is_usable(today),
        }
    }

    pub async fn history(
        &self,
        principal: &Principal,
        tenant_id: Uuid,
    ) -> AppResult<Vec<HistoryView>> {
        isolation::authorize(
            TenantContext::get(),
            Some(tenant_id),
            principal.platform_operator,
        )?;
        let subscription = self
            .subscription_repo
            .get_by_tenant(tenant_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let rows = self
            .history_repo
            .list_by_subscription(subscription.id, HISTORY_PAGE_LIMIT)
            .await?;
        Ok(rows
            .into_iter()
            .map(|h| HistoryView {
                previous_status: h.previous_status,
                new_status: h.new_status,
                reason: h.reason,
                actor: h.actor,
                created_at: h.created_at,
            })
            .collect())
    }
}
