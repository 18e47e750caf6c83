//! In-process network double for engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use swcache_core::{Error, Request, Response};

use crate::fetch::Network;

/// Routes URLs to canned responses, counts calls, and can go offline.
pub(crate) struct MockNetwork {
    routes: Mutex<HashMap<String, (u16, String)>>,
    online: AtomicBool,
    calls: AtomicUsize,
}

impl MockNetwork {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self { routes: Mutex::new(HashMap::new()), online: AtomicBool::new(true), calls: AtomicUsize::new(0) })
    }

    pub(crate) fn route(&self, url: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body.to_string()));
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: network unreachable", request.url())));
        }

        let route = self.routes.lock().unwrap().get(request.url().as_str()).cloned();
        let (status, body) = route.unwrap_or((404, "not found".to_string()));
        Ok(Response::new(status, vec![("Content-Type".into(), "text/html".into())], body))
    }
}
