//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Request/response model and request classification
//! - Versioned cache stores with SQLite backend and eviction
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod request;
pub mod response;

pub use cache::{CacheDb, CacheVersion, StoreKind, StoreStats};
pub use classify::{Classifier, ResourceClass};
pub use config::{AppConfig, ConfigError, InstallPolicy};
pub use error::Error;
pub use request::{Destination, Request};
pub use response::Response;
