//! HS256 session tokens.

use chrono::{Duration, Utc};
use domains::{AdminUser, DomainError, Principal, Result, Role, TokenService};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Sessions are never refreshed; the admin logs in again after a week.
pub const SESSION_TTL: Duration = Duration::days(7);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtTokenService {
    pub fn new(secret: &SecretString) -> Self {
        Self::with_ttl(secret, SESSION_TTL)
    }

    pub fn with_ttl(secret: &SecretString, ttl: Duration) -> Self {
        let key = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
            ttl,
        }
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, user: &AdminUser) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| DomainError::Internal(format!("token signing failed: {e}")))
    }

    fn verify(&self, token: &str) -> Result<Principal> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!(error = %e, "token rejected");
            DomainError::Unauthenticated
        })?;
        let claims = data.claims;
        Ok(Principal {
            id: Uuid::parse_str(&claims.sub).map_err(|_| DomainError::Unauthenticated)?,
            username: claims.username,
            role: claims
                .role
                .parse::<Role>()
                .map_err(|_| DomainError::Unauthenticated)?,
        })
    }
}
