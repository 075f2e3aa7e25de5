use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::notifier::BillingNotifier,
};

#[derive(Clone)]
pub struct ResendNotifier {
    client: Client,
    api_key: secrecy::SecretString,
    from: String,
}

impl ResendNotifier {
    pub fn new(api_key: secrecy::SecretString, from: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            from,
        }
    }

    async fn send(&self, to: &str, subject: &str, html: &str) -> AppResult<()> {
        let body = ResendReq {
            from: &self.from,
            to: [to],
            subject,
            html,
        };
        self.client
            .post("https://api.resend.com/emails")
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(())
    }
}

#[derive(Serialize)]
struct ResendReq<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[async_trait]
impl BillingNotifier for ResendNotifier {
    async fn payment_failed(
        &self,
        billing_email: &str,
        invoice_number: &str,
        reason: &str,
    ) -> AppResult<()> {
        let subject = format!("Payment failed for invoice {}", invoice_number);
        let html = format!(
            "<p>A payment against invoice <strong>{}</strong> did not go through.</p>\
             <p>Reason reported by the payment gateway: {}</p>\
             <p>Please retry the payment from your billing page to keep your \
             subscription active.</p>",
            invoice_number, reason
        );
        self.send(billing_email, &subject, &html).await
    }
}
