//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting the store database.

pub mod stats;

pub use stats::{CacheStatsOutput, stats_impl};
