//! Client code for swcache.
//!
//! This crate provides the network boundary, the two caching strategies and
//! the worker lifecycle that drives them.

pub mod engine;
pub mod fetch;

pub use engine::{
    ControlMessage, FetchOutcome, InstallReport, LifecycleHandler, MessageOutcome, PurgeReport, StorePlan,
    StrategyEngine, Worker, WorkerConfig, WorkerState,
};

pub use fetch::{FetchConfig, HttpNetwork, Network};
