//! # Auth adapters
//!
//! Password hashing (argon2), session tokens (HS256 JWT) and the reCAPTCHA
//! verifier that guards the login form.

pub mod password;

#[cfg(feature = "auth-jwt")]
pub mod jwt;

#[cfg(feature = "captcha-recaptcha")]
pub mod recaptcha;

pub use password::Argon2Hasher;

#[cfg(feature = "auth-jwt")]
pub use jwt::{Claims, JwtTokenService, SESSION_TTL};

#[cfg(feature = "captcha-recaptcha")]
pub use recaptcha::{RecaptchaVerifier, SITEVERIFY_URL};
