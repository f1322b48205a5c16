//! # domains
//!
//! Core entities, query types and port traits of the Folio photo backend.
//! This crate performs no I/O; adapters live in the `*-adapters` crates.

pub mod error;
pub mod models;
pub mod ports;
pub mod query;
pub mod upload;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use ports::*;
pub use query::*;
pub use upload::*;
