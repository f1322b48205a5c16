//! # Storage adapters
//!
//! Implementations of the persistence, media and rate-limit ports.
//! The in-memory adapters and the visit limiter are always compiled;
//! PostgreSQL and local-disk media sit behind features.

pub mod limiter;
pub mod memory;

#[cfg(feature = "media-local")]
pub mod media;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use limiter::{InMemoryVisitLimiter, DEFAULT_VISIT_WINDOW};
pub use memory::{MemoryHistoryRepository, MemoryPhotoRepository, MemoryUserRepository};

#[cfg(feature = "media-local")]
pub use media::{build_public_url, LocalMediaStorage, PUBLIC_PREFIX};

#[cfg(feature = "db-postgres")]
pub use postgres::{connect, PgHistoryRepository, PgPhotoRepository, PgUserRepository};
