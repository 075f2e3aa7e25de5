use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{app_error::AppResult, domain::entities::payment::PaymentGateway};

/// Provider-side order id handed back when an order is initiated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GatewayOrderId(pub String);

impl GatewayOrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GatewayOrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of `create_order`.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayOrder {
    pub order_id: GatewayOrderId,
    pub amount_cents: i64,
    pub currency: String,
}

/// Outcome reported by a gateway callback, after signature verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackOutcome {
    Success,
    Failed,
}

/// Parsed gateway callback body. `gateway_transaction_id` is the idempotency
/// key; everything else locates the payment it resolves.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayCallback {
    pub gateway: PaymentGateway,
    pub gateway_order_id: String,
    pub gateway_transaction_id: String,
    pub status: CallbackOutcome,
    pub failure_reason: Option<String>,
}

/// Capability boundary to an external payment gateway. Reconciliation never
/// branches on gateway identity except to pick the implementation; SDK and
/// wire details stay behind this trait.
#[async_trait]
pub trait PaymentGatewayPort: Send + Sync {
    fn gateway(&self) -> PaymentGateway;

    /// Initiate an order the tenant can pay against. `reference` is our
    /// invoice number, echoed back by the gateway for reconciliation.
    async fn create_order(
        &self,
        reference: &str,
        amount_cents: i64,
        currency: &str,
    ) -> AppResult<GatewayOrder>;

    /// Verify the signature of a raw callback body. A failed verification
    /// must short-circuit the callback before it reaches the ledger.
    fn verify_signature(&self, payload: &[u8], signature: &str) -> bool;
}
