//! # Authentication
//!
//! Single-admin login guarded by a captcha, and bearer-token verification.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::Utc;
use domains::{
    CaptchaVerifier, CredentialHasher, DomainError, Principal, Result, TokenService,
    UserProfile, UserRepository, ValidationErrors,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Hostname the captcha widget reports outside production.
pub const DEFAULT_DEV_HOSTNAME: &str = "localhost";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub production: bool,
    pub expected_dev_hostname: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            production: false,
            expected_dev_hostname: DEFAULT_DEV_HOSTNAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginRequest {
    pub identifier: Option<String>,
    pub password: Option<String>,
    pub captcha_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub token: String,
    pub user: UserProfile,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<dyn TokenService>,
    captcha: Arc<dyn CaptchaVerifier>,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: Arc<dyn TokenService>,
        captcha: Arc<dyn CaptchaVerifier>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            captcha,
            settings,
        }
    }

    pub async fn login(&self, req: LoginRequest, remote_ip: Option<IpAddr>) -> Result<LoginResult> {
        let identifier = non_blank(req.identifier.as_deref());
        let password = req.password.filter(|p| !p.is_empty());
        let captcha_token = non_blank(req.captcha_token.as_deref());

        let mut errors = ValidationErrors::new();
        if identifier.is_none() {
            errors.push("identifier", "identifier is required");
        }
        if password.is_none() {
            errors.push("password", "password is required");
        }
        if captcha_token.is_none() {
            errors.push("captchaToken", "captchaToken is required");
        }
        let (Some(identifier), Some(password), Some(captcha_token)) =
            (identifier, password, captcha_token)
        else {
            return Err(errors.into());
        };

        let verdict = self.captcha.verify(captcha_token, remote_ip).await?;
        if !verdict.success {
            warn!("captcha rejected");
            return Err(DomainError::Captcha);
        }
        if !self.settings.production {
            if let Some(host) = verdict.hostname.as_deref() {
                if host != self.settings.expected_dev_hostname {
                    warn!(hostname = host, "captcha solved on unexpected host");
                    return Err(DomainError::Captcha);
                }
            }
        }

        let email = identifier.to_lowercase();
        let user = self
            .users
            .find_by_login(identifier, &email)
            .await?
            .ok_or(DomainError::InvalidCredentials)?;

        if !self.hasher.verify(&password, &user.password_hash) {
            warn!(user_id = %user.id, "password mismatch");
            return Err(DomainError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user)?;
        self.users.touch_last_login(user.id, Utc::now()).await;
        info!(user_id = %user.id, "admin logged in");

        Ok(LoginResult {
            token,
            user: user.profile(),
        })
    }

    /// Verifies a raw bearer token (without the `Bearer ` prefix).
    pub fn require_auth(&self, token: Option<&str>) -> Result<Principal> {
        let token = non_blank(token).ok_or(DomainError::Unauthenticated)?;
        self.tokens
            .verify(token)
            .map_err(|_| DomainError::Unauthenticated)
    }

    pub async fn me(&self, principal: &Principal) -> Result<UserProfile> {
        self.users
            .find_by_id(principal.id)
            .await?
            .map(|u| u.profile())
            .ok_or(DomainError::NotFound("user"))
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
