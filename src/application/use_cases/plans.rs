use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{jwt::Principal, use_cases::subscription::SubscriptionPlanRepoTrait},
    domain::entities::subscription_plan::{BillingCycle, SubscriptionPlan},
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlanInput {
    pub code: String,
    pub name: String,
    pub billing_cycle: BillingCycle,
    pub price_cents: i64,
    pub currency: String,
    pub trial_days: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanView {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub billing_cycle: BillingCycle,
    pub price_cents: i64,
    pub currency: String,
    pub trial_days: i32,
    pub active: bool,
}

impl From<SubscriptionPlan> for PlanView {
    fn from(plan: SubscriptionPlan) -> Self {
        PlanView {
            id: plan.id,
            code: plan.code,
            name: plan.name,
            billing_cycle: plan.billing_cycle,
            price_cents: plan.price_cents,
            currency: plan.currency,
            trial_days: plan.trial_days,
            active: plan.active,
        }
    }
}

/// Plan catalog management. Mutations are platform-operator only; price,
/// currency and the active flag apply prospectively — invoices already
/// generated keep their amounts.
pub struct PlanUseCases {
    plan_repo: Arc<dyn SubscriptionPlanRepoTrait>,
}

impl PlanUseCases {
    pub fn new(plan_repo: Arc<dyn SubscriptionPlanRepoTrait>) -> Self {
        Self { plan_repo }
    }

    fn require_operator(principal: &Principal) -> AppResult<()> {
        if principal.platform_operator {
            Ok(())
        } else {
            Err(AppError::CrossTenantAccess)
        }
    }

    pub async fn create(
        &self,
        principal: &Principal,
        input: CreatePlanInput,
    ) -> AppResult<PlanView> {
        Self::require_operator(principal)?;
        if input.price_cents < 0 {
            return Err(AppError::InvalidInput("price cannot be negative".into()));
        }
        if input.currency.len() != 3 {
            return Err(AppError::InvalidInput(
                "currency must be a 3-letter ISO code".into(),
            ));
        }
        let plan = self
            .plan_repo
            .create(&SubscriptionPlan {
                id: Uuid::new_v4(),
                code: input.code,
                name: input.name,
                billing_cycle: input.billing_cycle,
                price_cents: input.price_cents,
                currency: input.currency.to_uppercase(),
                trial_days: input.trial_days,
                active: true,
                created_at: None,
                updated_at: None,
            })
            .await?;
        Ok(plan.into())
    }

    pub async fn update(
        &self,
        principal: &Principal,
        plan_id: Uuid,
        price_cents: Option<i64>,
        currency: Option<String>,
        active: Option<bool>,
    ) -> AppResult<PlanView> {
        Self::require_operator(principal)?;
        if price_cents.is_some_and(|p| p < 0) {
            return Err(AppError::InvalidInput("price cannot be negative".into()));
        }
        let plan = self
            .plan_repo
            .update(plan_id, price_cents, currency.map(|c| c.to_uppercase()), active)
            .await?;
        Ok(plan.into())
    }

    /// Tenants see the active catalog; operators can include retired plans.
    pub async fn list(&self, principal: &Principal) -> AppResult<Vec<PlanView>> {
        let plans = self
            .plan_repo
            .list(principal.platform_operator)
            .await?;
        Ok(plans.into_iter().map(PlanView::from).collect())
    }
}
