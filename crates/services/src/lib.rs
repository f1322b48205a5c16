//! # Services
//!
//! Application use cases. Each service is handed its ports as
//! `Arc<dyn Trait>` and knows nothing about HTTP or storage engines.

pub mod auth;
pub mod gallery;
pub mod history;
pub mod metadata;
pub mod photos;
pub mod validation;

pub use auth::{AuthService, AuthSettings, LoginRequest, LoginResult};
pub use gallery::{GalleryService, ListParams, VisitOutcome};
pub use photos::{PhotoAdminService, PhotoInput, ReorderOutcome};
