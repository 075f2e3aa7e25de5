use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_gateway::{GatewayOrder, GatewayOrderId, PaymentGatewayPort},
    domain::entities::payment::PaymentGateway,
};

const RAZORPAY_API_BASE: &str = "https://api.razorpay.com/v1";

/// Razorpay order creation plus webhook signature verification. All amounts
/// are minor units, matching Razorpay's own representation.
pub struct RazorpayGateway {
    client: Client,
    key_id: String,
    key_secret: SecretString,
    webhook_secret: SecretString,
}

impl RazorpayGateway {
    pub fn new(key_id: String, key_secret: SecretString, webhook_secret: SecretString) -> Self {
        Self {
            client: Client::new(),
            key_id,
            key_secret,
            webhook_secret,
        }
    }

    fn auth_header(&self) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!(
            "{}:{}",
            self.key_id,
            self.key_secret.expose_secret()
        ));
        format!("Basic {}", encoded)
    }
}

#[derive(Debug, Deserialize)]
struct RazorpayOrder {
    id: String,
    amount: i64,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorResponse {
    error: RazorpayError,
}

#[derive(Debug, Deserialize)]
struct RazorpayError {
    code: String,
    description: Option<String>,
}

#[async_trait]
impl PaymentGatewayPort for RazorpayGateway {
    fn gateway(&self) -> PaymentGateway {
        PaymentGateway::Razorpay
    }

    async fn create_order(
        &self,
        reference: &str,
        amount_cents: i64,
        currency: &str,
    ) -> AppResult<GatewayOrder> {
        let body = serde_json::json!({
            "amount": amount_cents,
            "currency": currency,
            "receipt": reference,
        });

        let response = self
            .client
            .post(format!("{}/orders", RAZORPAY_API_BASE))
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Razorpay request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Gateway(format!("Failed to read Razorpay response: {}", e)))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Razorpay API error");
            if let Ok(err) = serde_json::from_str::<RazorpayErrorResponse>(&body) {
                return Err(AppError::Gateway(format!(
                    "Razorpay error {}: {}",
                    err.error.code,
                    err.error.description.unwrap_or_default()
                )));
            }
            return Err(AppError::Gateway(format!(
                "Razorpay API error: {} - {}",
                status, body
            )));
        }

        let order: RazorpayOrder = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(body = %body, error = %e, "Failed to parse Razorpay response");
            AppError::Gateway(format!("Failed to parse Razorpay response: {}", e))
        })?;

        Ok(GatewayOrder {
            order_id: GatewayOrderId(order.id),
            amount_cents: order.amount,
            currency: order.currency,
        })
    }

    fn verify_signature(&self, payload: &[u8], signature: &str) -> bool {
        let Ok(mut mac) =
            Hmac::<Sha256>::new_from_slice(self.webhook_secret.expose_secret().as_bytes())
        else {
            return false;
        };
        mac.update(payload);
        let expected = hex::encode(mac.finalize().into_bytes());
        constant_time_compare(signature, &expected)
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
