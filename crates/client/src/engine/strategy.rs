//! Cache-first and network-first strategies.
//!
//! Both strategies recover every network failure locally: the caller always
//! gets a response, either from the network, from any store, or one of the
//! two synthetic offline fallbacks. Storage failures are logged and the write
//! is skipped; they never affect the response handed back.

use std::sync::{Arc, Mutex, PoisonError};

use swcache_core::{AppConfig, CacheDb, CacheVersion, Request, ResourceClass, Response, StoreKind};
use tokio::task::JoinHandle;

use crate::fetch::Network;

/// Body of the fallback served for assets when offline with no cached copy.
pub const OFFLINE_ASSET_BODY: &str = "Offline - No hay conexión a internet";

/// Body of the fallback served for pages when offline with no cached copy.
pub const OFFLINE_PAGE_BODY: &str = "Offline - Página no disponible sin conexión";

const OFFLINE_STATUS: u16 = 503;

/// Synthetic 503 for assets (`text/plain`).
pub fn offline_asset_response() -> Response {
    Response::new(OFFLINE_STATUS, vec![("Content-Type".into(), "text/plain".into())], OFFLINE_ASSET_BODY)
}

/// Synthetic 503 for navigations (`text/html`).
pub fn offline_page_response() -> Response {
    Response::new(OFFLINE_STATUS, vec![("Content-Type".into(), "text/html".into())], OFFLINE_PAGE_BODY)
}

/// Store names and entry budgets for one version.
#[derive(Debug, Clone)]
pub struct StorePlan {
    version: CacheVersion,
    static_budget: Option<usize>,
    dynamic_budget: Option<usize>,
    image_budget: Option<usize>,
}

impl StorePlan {
    /// Plan with the default budgets: static unbounded, dynamic 50, image 100.
    pub fn new(version: CacheVersion) -> Self {
        Self { version, static_budget: None, dynamic_budget: Some(50), image_budget: Some(100) }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            version: config.cache_version(),
            static_budget: config.budget(StoreKind::Static),
            dynamic_budget: config.budget(StoreKind::Dynamic),
            image_budget: config.budget(StoreKind::Image),
        }
    }

    pub fn with_budget(mut self, kind: StoreKind, budget: Option<usize>) -> Self {
        match kind {
            StoreKind::Static => self.static_budget = budget,
            StoreKind::Dynamic => self.dynamic_budget = budget,
            StoreKind::Image => self.image_budget = budget,
        }
        self
    }

    pub fn version(&self) -> &CacheVersion {
        &self.version
    }

    pub fn store_name(&self, kind: StoreKind) -> String {
        self.version.store_name(kind)
    }

    pub fn budget(&self, kind: StoreKind) -> Option<usize> {
        match kind {
            StoreKind::Static => self.static_budget,
            StoreKind::Dynamic => self.dynamic_budget,
            StoreKind::Image => self.image_budget,
        }
    }
}

/// Serves classified requests through the two caching strategies.
///
/// Clones share the store handle, the network and the set of background
/// writes.
#[derive(Clone)]
pub struct StrategyEngine {
    db: CacheDb,
    network: Arc<dyn Network>,
    plan: StorePlan,
    /// Background writes not yet awaited. Dropping a handle detaches the
    /// task, so writes outlive any caller.
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl StrategyEngine {
    pub fn new(db: CacheDb, network: Arc<dyn Network>, plan: StorePlan) -> Self {
        Self { db, network, plan, pending: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn plan(&self) -> &StorePlan {
        &self.plan
    }

    /// Route a request by class. `Excluded` is never served and yields `None`.
    pub async fn serve(&self, request: &Request, class: ResourceClass) -> Option<Response> {
        let response = match class {
            ResourceClass::Image => self.cache_first(request, StoreKind::Image).await,
            ResourceClass::StaticAsset => self.cache_first(request, StoreKind::Static).await,
            ResourceClass::Dynamic => self.network_first(request, StoreKind::Dynamic).await,
            ResourceClass::Excluded => return None,
        };
        Some(response)
    }

    /// Serve from the store when present; otherwise fetch and cache in the background.
    pub async fn cache_first(&self, request: &Request, kind: StoreKind) -> Response {
        let store = self.plan.store_name(kind);

        match self.db.match_in(&store, request).await {
            Ok(Some(hit)) => {
                tracing::debug!(url = %request.url(), store = %store, "cache hit");
                return hit;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(url = %request.url(), store = %store, error = %e, "cache lookup failed"),
        }

        let response = match self.network.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %request.url(), error = %e, offline = e.is_network(), "fetch failed, trying cache");
                return self.fallback(request, offline_asset_response).await;
            }
        };

        if response.is_cacheable() {
            match response.duplicate() {
                Ok(copy) => self.spawn_write(store, self.plan.budget(kind), request.clone(), copy),
                Err(e) => tracing::warn!(url = %request.url(), error = %e, "cannot duplicate response"),
            }
        }

        response
    }

    /// Fetch first and refresh the store; fall back to any store when offline.
    pub async fn network_first(&self, request: &Request, kind: StoreKind) -> Response {
        let store = self.plan.store_name(kind);

        match self.network.fetch(request).await {
            Ok(response) if response.is_cacheable() => {
                match response.duplicate() {
                    Ok(copy) => write_through(&self.db, &store, self.plan.budget(kind), request, copy).await,
                    Err(e) => tracing::warn!(url = %request.url(), error = %e, "cannot duplicate response"),
                }
                response
            }
            Ok(response) => {
                tracing::debug!(url = %request.url(), status = response.status(), "not caching response");
                response
            }
            Err(e) => {
                tracing::warn!(url = %request.url(), error = %e, offline = e.is_network(), "fetch failed, trying cache");
                self.fallback(request, offline_page_response).await
            }
        }
    }

    /// Wait for every background write started so far, including writes
    /// spawned while waiting.
    pub async fn settle(&self) {
        loop {
            let handles = std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::warn!(error = %e, "background cache write aborted");
                }
            }
        }
    }

    async fn fallback(&self, request: &Request, synthetic: fn() -> Response) -> Response {
        match self.db.match_any(request).await {
            Ok(Some(hit)) => {
                tracing::debug!(url = %request.url(), "serving cached copy while offline");
                hit
            }
            Ok(None) => synthetic(),
            Err(e) => {
                tracing::warn!(url = %request.url(), error = %e, "fallback lookup failed");
                synthetic()
            }
        }
    }

    fn spawn_write(&self, store: String, budget: Option<usize>, request: Request, copy: Response) {
        let db = self.db.clone();
        let handle = tokio::spawn(async move {
            write_through(&db, &store, budget, &request, copy).await;
        });

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|handle| !handle.is_finished());
        pending.push(handle);
    }
}

/// Evict and persist `copy` in one step. Failures are logged only.
async fn write_through(db: &CacheDb, store: &str, budget: Option<usize>, request: &Request, copy: Response) {
    match db.put_bounded(store, request, copy, budget).await {
        Ok(evicted) => tracing::debug!(url = %request.url(), store = %store, evicted, "cached response"),
        Err(e) => tracing::warn!(url = %request.url(), store = %store, error = %e, "cache write failed"),
    }
}
