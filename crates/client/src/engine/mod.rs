//! Offline caching engine.
//!
//! ### Routing
//! - `image` and `static-asset` requests: cache-first.
//! - `dynamic` requests: network-first.
//! - `excluded` requests: never intercepted.
//!
//! ### Lifecycle
//! - Install precaches the manifest into `{version}-static`.
//! - Activate deletes stores of older versions in the namespace.
//! - `SKIP_WAITING` and `CLEAR_CACHE` control messages.

pub mod lifecycle;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use lifecycle::{
    ControlMessage, FetchOutcome, InstallReport, LifecycleHandler, MessageOutcome, PurgeReport, Worker, WorkerConfig,
    WorkerState,
};
pub use strategy::{
    OFFLINE_ASSET_BODY, OFFLINE_PAGE_BODY, StorePlan, StrategyEngine, offline_asset_response, offline_page_response,
};
