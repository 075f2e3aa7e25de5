use std::sync::Arc;

use crate::{
    application::use_cases::{
        billing::BillingUseCases,
        plans::PlanUseCases,
        subscription::{SubscriptionUseCases, TenantRepoTrait},
    },
    infra::config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub subscription_use_cases: Arc<SubscriptionUseCases>,
    pub billing_use_cases: Arc<BillingUseCases>,
    pub plan_use_cases: Arc<PlanUseCases>,
    pub tenant_repo: Arc<dyn TenantRepoTrait>,
}
