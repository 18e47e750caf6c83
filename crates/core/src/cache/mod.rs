//! SQLite-backed cache stores for intercepted responses.
//!
//! This module provides named, versioned key-value stores persisted in
//! SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Store registry: open, enumerate and delete stores by name
//! - Request-keyed entries with an explicit insertion-order ledger
//! - Oldest-first eviction against a per-store entry budget
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod eviction;
pub mod hash;
pub mod migrations;
pub mod naming;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use naming::{CacheVersion, StoreKind};
pub use stores::StoreStats;
