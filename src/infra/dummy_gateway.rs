use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    application::ports::payment_gateway::{GatewayOrder, GatewayOrderId, PaymentGatewayPort},
    domain::entities::payment::PaymentGateway,
};

/// In-process gateway for development and staging. Orders are minted locally
/// and callbacks are signed with a shared secret, so the full callback path
/// can be exercised with curl and no external account.
pub struct DummyGateway {
    secret: SecretString,
}

impl DummyGateway {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn hmac_hex(&self, payload: &[u8]) -> Option<String> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes()).ok()?;
        mac.update(payload);
        Some(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl PaymentGatewayPort for DummyGateway {
    fn gateway(&self) -> PaymentGateway {
        PaymentGateway::Dummy
    }

    async fn create_order(
        &self,
        reference: &str,
        amount_cents: i64,
        currency: &str,
    ) -> AppResult<GatewayOrder> {
        tracing::debug!(reference, amount_cents, currency, "Minting dummy order");
        Ok(GatewayOrder {
            order_id: GatewayOrderId::new(format!("dummy_ord_{}", Uuid::new_v4().simple())),
            amount_cents,
            currency: currency.to_string(),
        })
    }

    fn verify_signature(&self, payload: &[u8], signature: &str) -> bool {
        match self.hmac_hex(payload) {
            Some(expected) => {
                signature.len() == expected.len()
                    && signature
                        .bytes()
                        .zip(expected.bytes())
                        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                        == 0
            }
            None => false,
        }
    }
}
