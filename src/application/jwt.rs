use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};

/// The only two facts the billing core consumes from an authenticated
/// principal are `tenant_id` and `platform_operator`; everything else about
/// identity belongs to the external auth service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub tenant_id: Option<Uuid>,
    #[serde(default)]
    pub platform_operator: bool,
    pub iat: i64,
    pub exp: i64,
}

/// Resolved caller identity handed to use cases. Built by the auth
/// middleware from verified claims; handlers never look at the token again.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub platform_operator: bool,
}

impl TryFrom<Claims> for Principal {
    type Error = AppError;

    fn try_from(claims: Claims) -> AppResult<Self> {
        let user_id = claims
            .sub
            .parse::<Uuid>()
            .map_err(|_| AppError::InvalidCredentials)?;
        Ok(Principal {
            user_id,
            tenant_id: claims.tenant_id,
            platform_operator: claims.platform_operator,
        })
    }
}

pub fn issue(
    user_id: Uuid,
    tenant_id: Option<Uuid>,
    platform_operator: bool,
    secret: &secrecy::SecretString,
    ttl_secs: i64,
) -> AppResult<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        tenant_id,
        platform_operator,
        iat: now,
        exp: now + ttl_secs,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

pub fn verify(token: &str, secret: &secrecy::SecretString) -> AppResult<Claims> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::InvalidCredentials)
}
