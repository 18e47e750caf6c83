//! Worker lifecycle: install, activate, fetch and control messages.
//!
//! The worker is built from explicit configuration and exposes one async
//! method per lifecycle trigger. Each returns only once its work has settled,
//! so the host knows when it may move to the next state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use swcache_core::request::READ_METHOD;
use swcache_core::{
    AppConfig, CacheDb, CacheVersion, Classifier, Destination, Error, InstallPolicy, Request, ResourceClass,
    Response, StoreKind,
};
use tokio::sync::RwLock;

use super::strategy::{StorePlan, StrategyEngine};
use crate::fetch::{Network, resolve};

/// Worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Waiting for the host to activate, or for `SKIP_WAITING`.
    Installed,
    Activating,
    Active,
    /// Install failed under the strict policy; this version will never activate.
    Redundant,
}

/// Out-of-band control messages sent by pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate without waiting for older workers to release their pages.
    SkipWaiting,
    /// Delete every store in the namespace, across all versions.
    ClearCache,
}

/// Result of intercepting a request.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The engine answered the request.
    Respond(Response),
    /// The engine declined; the host performs its default handling.
    Passthrough,
}

/// What install left in the static store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct InstallReport {
    pub store: String,
    pub precached: usize,
    /// Reason the manifest was skipped, when install degraded.
    pub degraded: Option<String>,
    /// Set when `SKIP_WAITING` arrived before install finished, so the
    /// worker activated straight away.
    pub activated: Option<PurgeReport>,
}

/// Stores removed by activation or a cache clear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct PurgeReport {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

/// Effect of a control message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum MessageOutcome {
    /// `activated` is set when a waiting worker was activated by the message.
    SkipWaiting { activated: Option<PurgeReport> },
    Cleared(PurgeReport),
}

/// One method per lifecycle trigger.
#[async_trait]
pub trait LifecycleHandler: Send + Sync {
    async fn on_install(&self) -> Result<InstallReport, Error>;

    async fn on_activate(&self) -> Result<PurgeReport, Error>;

    async fn on_fetch(&self, request: Request) -> FetchOutcome;

    async fn on_message(&self, message: ControlMessage) -> MessageOutcome;
}

/// Explicit worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub namespace: String,
    pub plan: StorePlan,
    pub manifest: Vec<url::Url>,
    pub install_policy: InstallPolicy,
    pub classifier: Classifier,
}

impl WorkerConfig {
    /// Derive the worker configuration, resolving the manifest against the origin.
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = url::Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("origin: {e}")))?;
        let manifest = config
            .manifest
            .iter()
            .map(|entry| resolve(&origin, entry).map_err(|e| Error::InvalidUrl(format!("{entry}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            namespace: config.namespace.clone(),
            plan: StorePlan::from_config(config),
            manifest,
            install_policy: config.install_policy,
            classifier: config.classifier(),
        })
    }

    pub fn version(&self) -> &CacheVersion {
        self.plan.version()
    }

    /// Whether `store` is ours but from another version.
    fn is_stale(&self, store: &str) -> bool {
        store.starts_with(&self.namespace) && !self.version().owns(store)
    }
}

/// The offline caching worker.
pub struct Worker {
    config: WorkerConfig,
    db: CacheDb,
    network: Arc<dyn Network>,
    engine: StrategyEngine,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
}

impl Worker {
    pub fn new(config: WorkerConfig, db: CacheDb, network: Arc<dyn Network>) -> Self {
        let engine = StrategyEngine::new(db.clone(), network.clone(), config.plan.clone());
        Self {
            config,
            db,
            network,
            engine,
            state: RwLock::new(WorkerState::Parsed),
            skip_waiting: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
        }
    }

    pub fn from_app(config: &AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        Ok(Self::new(WorkerConfig::from_app(config)?, db, network))
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Whether a page asked to activate without waiting.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Whether activation took control of open pages.
    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    pub fn classify(&self, request: &Request) -> ResourceClass {
        self.config.classifier.classify(request)
    }

    /// Wait for background cache writes.
    pub async fn settle(&self) {
        self.engine.settle().await;
    }

    /// Move to `Activating` if the worker is waiting or already active.
    async fn begin_activation(&self) -> Result<(), Error> {
        let mut state = self.state.write().await;
        let previous = *state;
        if !matches!(previous, WorkerState::Installed | WorkerState::Active) {
            return Err(Error::InvalidState(format!("cannot activate a worker that is {previous:?}")));
        }
        tracing::info!(from = ?previous, to = ?WorkerState::Activating, version = %self.config.version(), "worker state");
        *state = WorkerState::Activating;
        Ok(())
    }

    /// Purge stale versions and claim clients.
    async fn activate(&self) -> Result<PurgeReport, Error> {
        self.begin_activation().await?;

        let stale = self.namespace_stores(|name| self.config.is_stale(name)).await;
        let report = self.delete_stores(stale).await;

        self.clients_claimed.store(true, Ordering::SeqCst);
        self.set_state(WorkerState::Active).await;
        tracing::info!(deleted = report.deleted.len(), failed = report.failed.len(), "activated");
        Ok(report)
    }

    /// Activate now if the worker is waiting and `SKIP_WAITING` was received.
    async fn activate_if_skipping(&self) -> Option<PurgeReport> {
        if !self.skip_waiting_requested() || self.state().await != WorkerState::Installed {
            return None;
        }
        match self.activate().await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(error = %e, "skip waiting could not activate");
                None
            }
        }
    }

    async fn set_state(&self, next: WorkerState) {
        let mut state = self.state.write().await;
        let previous = *state;
        tracing::info!(from = ?previous, to = ?next, version = %self.config.version(), "worker state");
        *state = next;
    }

    /// Fetch the whole manifest, then write it only if every asset arrived.
    async fn precache(&self, store: &str) -> Result<usize, Error> {
        let fetches = self.config.manifest.iter().map(|url| async move {
            let request = Request::new(READ_METHOD, url.clone(), Destination::Empty);
            let response = self
                .network
                .fetch(&request)
                .await
                .map_err(|e| Error::InstallFailed { url: url.to_string(), reason: e.to_string() })?;
            if !response.is_cacheable() {
                return Err(Error::InstallFailed {
                    url: url.to_string(),
                    reason: format!("status {}", response.status()),
                });
            }
            Ok::<_, Error>((request, response))
        });

        let fetched = try_join_all(fetches).await?;
        let count = fetched.len();

        self.db
            .put_batch_bounded(store, fetched, self.config.plan.budget(StoreKind::Static))
            .await
            .map_err(|e| Error::InstallFailed { url: store.to_string(), reason: e.to_string() })?;

        Ok(count)
    }

    /// Delete stores concurrently; each failure is independent.
    async fn delete_stores(&self, names: Vec<String>) -> PurgeReport {
        let results = join_all(names.into_iter().map(|name| async move {
            let result = self.db.delete_store(&name).await;
            (name, result)
        }))
        .await;

        let mut report = PurgeReport::default();
        for (name, result) in results {
            match result {
                Ok(_) => report.deleted.push(name),
                Err(e) => {
                    tracing::warn!(store = %name, error = %e, "failed to delete store");
                    report.failed.push(name);
                }
            }
        }
        report
    }

    async fn namespace_stores(&self, filter: impl Fn(&str) -> bool) -> Vec<String> {
        match self.db.list_stores().await {
            Ok(stores) => stores.into_iter().filter(|name| filter(name)).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to list stores");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl LifecycleHandler for Worker {
    async fn on_install(&self) -> Result<InstallReport, Error> {
        self.set_state(WorkerState::Installing).await;
        let store = self.config.version().store_name(StoreKind::Static);

        let result = match self.db.open_store(&store).await {
            Ok(()) => self.precache(&store).await,
            Err(e) => Err(Error::InstallFailed { url: store.clone(), reason: e.to_string() }),
        };

        match result {
            Ok(precached) => {
                tracing::info!(store = %store, precached, "install complete");
                self.set_state(WorkerState::Installed).await;
                Ok(InstallReport { store, precached, degraded: None, activated: self.activate_if_skipping().await })
            }
            Err(e) => match self.config.install_policy {
                InstallPolicy::Strict => {
                    tracing::error!(error = %e, "install failed");
                    self.set_state(WorkerState::Redundant).await;
                    Err(e)
                }
                InstallPolicy::Degrade => {
                    tracing::warn!(error = %e, "install manifest incomplete, continuing without it");
                    self.set_state(WorkerState::Installed).await;
                    Ok(InstallReport {
                        store,
                        precached: 0,
                        degraded: Some(e.to_string()),
                        activated: self.activate_if_skipping().await,
                    })
                }
            },
        }
    }

    async fn on_activate(&self) -> Result<PurgeReport, Error> {
        self.activate().await
    }

    async fn on_fetch(&self, request: Request) -> FetchOutcome {
        let class = self.classify(&request);
        match self.engine.serve(&request, class).await {
            Some(response) => FetchOutcome::Respond(response),
            None => {
                tracing::trace!(url = %request.url(), "passthrough");
                FetchOutcome::Passthrough
            }
        }
    }

    async fn on_message(&self, message: ControlMessage) -> MessageOutcome {
        match message {
            ControlMessage::SkipWaiting => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                tracing::info!("skip waiting requested");
                MessageOutcome::SkipWaiting { activated: self.activate_if_skipping().await }
            }
            ControlMessage::ClearCache => {
                self.engine.settle().await;
                let namespace = self.config.namespace.as_str();
                let stores = self.namespace_stores(|name| name.starts_with(namespace)).await;
                let report = self.delete_stores(stores).await;
                tracing::info!(deleted = report.deleted.len(), "cleared all caches");
                MessageOutcome::Cleared(report)
            }
        }
    }
}
