//! # api-adapters
//!
//! The HTTP surface of Folio. Handlers decode requests, hand them to the
//! services crate and map [`domains::DomainError`] onto status codes. No
//! business rule lives here.

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod metrics;
#[cfg(feature = "web-axum")]
pub mod routes;
#[cfg(feature = "web-axum")]
pub mod state;
#[cfg(feature = "web-axum")]
pub mod upload;

#[cfg(feature = "web-axum")]
pub use error::ApiError;
#[cfg(feature = "web-axum")]
pub use metrics::Metrics;
#[cfg(feature = "web-axum")]
pub use routes::{router, HttpConfig};
#[cfg(feature = "web-axum")]
pub use state::AppState;
