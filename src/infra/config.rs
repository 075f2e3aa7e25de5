use std::net::SocketAddr;
use std::time::Duration;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;

pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub cors_origin: HeaderValue,
    pub jwt_secret: SecretString,
    pub access_token_ttl_secs: i64,
    /// Days after expiry during which a subscription still grants access.
    pub grace_period_days: u32,
    /// Days a generated invoice stays open before it counts as overdue.
    pub invoice_due_days: u32,
    pub billing_event_queue_size: usize,
    pub expiry_sweep_interval: Duration,
    pub resend_api_key: SecretString,
    pub email_from: String,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: SecretString,
    pub razorpay_webhook_secret: SecretString,
    pub dummy_gateway_secret: SecretString,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let database_url: String = get_env("DATABASE_URL");
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let jwt_secret: SecretString = SecretString::new(get_env::<String>("JWT_SECRET").into());
        let access_token_ttl_secs: i64 = get_env_default("ACCESS_TOKEN_TTL_SECS", 86_400);

        let grace_period_days: u32 = get_env_default("GRACE_PERIOD_DAYS", 5);
        let invoice_due_days: u32 = get_env_default("INVOICE_DUE_DAYS", 7);
        let billing_event_queue_size: usize = get_env_default("BILLING_EVENT_QUEUE_SIZE", 1024);
        let expiry_sweep_interval_secs: u64 = get_env_default("EXPIRY_SWEEP_INTERVAL_SECS", 3_600);

        let resend_api_key: SecretString =
            SecretString::new(get_env::<String>("RESEND_API_KEY").into());
        let email_from: String = get_env("EMAIL_FROM");

        let razorpay_key_id: String = get_env("RAZORPAY_KEY_ID");
        let razorpay_key_secret: SecretString =
            SecretString::new(get_env::<String>("RAZORPAY_KEY_SECRET").into());
        let razorpay_webhook_secret: SecretString =
            SecretString::new(get_env::<String>("RAZORPAY_WEBHOOK_SECRET").into());
        let dummy_gateway_secret: SecretString =
            SecretString::new(get_env::<String>("DUMMY_GATEWAY_SECRET").into());

        Self {
            bind_addr,
            database_url,
            cors_origin,
            jwt_secret,
            access_token_ttl_secs,
            grace_period_days,
            invoice_due_days,
            billing_event_queue_size,
            expiry_sweep_interval: Duration::from_secs(expiry_sweep_interval_secs),
            resend_api_key,
            email_from,
            razorpay_key_id,
            razorpay_key_secret,
            razorpay_webhook_secret,
            dummy_gateway_secret,
        }
    }
}
