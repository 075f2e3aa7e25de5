use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::{
    app_error::AppResult,
    application::ports::payment_gateway::{GatewayOrder, GatewayOrderId, PaymentGatewayPort},
    domain::entities::payment::PaymentGateway,
};

/// Gateway double: deterministic order ids, signature validity toggled per
/// test.
pub struct MockGateway {
    kind: PaymentGateway,
    signature_valid: AtomicBool,
    orders: AtomicUsize,
}

impl MockGateway {
    pub fn new(kind: PaymentGateway) -> Self {
        Self {
            kind,
            signature_valid: AtomicBool::new(true),
            orders: AtomicUsize::new(0),
        }
    }

    pub fn set_signature_valid(&self, valid: bool) {
        self.signature_valid.store(valid, Ordering::SeqCst);
    }

    pub fn orders_created(&self) -> usize {
        self.orders.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGatewayPort for MockGateway {
    fn gateway(&self) -> PaymentGateway {
        self.kind
    }

    async fn create_order(
        &self,
        reference: &str,
        amount_cents: i64,
        currency: &str,
    ) -> AppResult<GatewayOrder> {
        let n = self.orders.fetch_add(1, Ordering::SeqCst);
        Ok(GatewayOrder {
            order_id: GatewayOrderId::new(format!("mock_ord_{reference}_{n}")),
            amount_cents,
            currency: currency.to_string(),
        })
    }

    fn verify_signature(&self, _payload: &[u8], _signature: &str) -> bool {
        self.signature_valid.load(Ordering::SeqCst)
    }
}
