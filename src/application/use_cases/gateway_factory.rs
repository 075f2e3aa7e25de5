use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_gateway::PaymentGatewayPort,
    domain::entities::payment::PaymentGateway,
};

/// Picks the gateway implementation for a payment. This is the only place
/// the core branches on gateway identity.
pub struct GatewayFactory {
    gateways: HashMap<PaymentGateway, Arc<dyn PaymentGatewayPort>>,
}

impl GatewayFactory {
    pub fn new(implementations: Vec<Arc<dyn PaymentGatewayPort>>) -> Self {
        let gateways = implementations
            .into_iter()
            .map(|g| (g.gateway(), g))
            .collect();
        Self { gateways }
    }

    pub fn get(&self, gateway: PaymentGateway) -> AppResult<Arc<dyn PaymentGatewayPort>> {
        self.gateways
            .get(&gateway)
            .cloned()
            .ok_or_else(|| AppError::Gateway(format!("{} is not configured", gateway.as_str())))
    }
}
