//! Google reCAPTCHA server-side verification.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use domains::{CaptchaVerdict, CaptchaVerifier, DomainError, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, error};

pub const SITEVERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,
    hostname: Option<String>,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

pub struct RecaptchaVerifier {
    client: reqwest::Client,
    endpoint: String,
    secret: Option<SecretString>,
}

impl RecaptchaVerifier {
    /// A missing secret is not fatal at startup; every login then fails
    /// with an internal error until one is configured.
    pub fn new(secret: Option<SecretString>) -> Result<Self> {
        Self::with_endpoint(secret, SITEVERIFY_URL)
    }

    pub fn with_endpoint(
        secret: Option<SecretString>,
        endpoint: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DomainError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            secret,
        })
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(&self, token: &str, remote_ip: Option<IpAddr>) -> Result<CaptchaVerdict> {
        let Some(secret) = &self.secret else {
            error!("RECAPTCHA_SECRET_KEY is not configured");
            return Err(DomainError::Internal("captcha secret missing".into()));
        };

        let mut form = vec![
            ("secret", secret.expose_secret().to_string()),
            ("response", token.to_string()),
        ];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip.to_string()));
        }

        let response: SiteverifyResponse = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| DomainError::Internal(format!("siteverify request failed: {e}")))?
            .json()
            .await
            .map_err(|e| DomainError::Internal(format!("siteverify response unreadable: {e}")))?;

        if !response.success {
            debug!(codes = ?response.error_codes, "captcha token rejected by provider");
        }
        Ok(CaptchaVerdict {
            success: response.success,
            hostname: response.hostname,
        })
    }
}
