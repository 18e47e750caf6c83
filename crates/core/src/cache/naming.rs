//! Versioned store naming.
//!
//! Every store is named `{version}-{kind}`. A version tag is replaced on each
//! deployment; stores of older versions become purge candidates once a new
//! version activates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The three stores created per version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Static,
    Dynamic,
    Image,
}

impl StoreKind {
    pub const ALL: [StoreKind; 3] = [StoreKind::Static, StoreKind::Dynamic, StoreKind::Image];

    pub fn suffix(self) -> &'static str {
        match self {
            StoreKind::Static => "static",
            StoreKind::Dynamic => "dynamic",
            StoreKind::Image => "image",
        }
    }
}

/// Deployment version tag that namespaces every store it creates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheVersion(String);

impl CacheVersion {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of this version's store of the given kind.
    pub fn store_name(&self, kind: StoreKind) -> String {
        format!("{}-{}", self.0, kind.suffix())
    }

    /// Whether `store` was created by this version.
    pub fn owns(&self, store: &str) -> bool {
        store.strip_prefix(self.0.as_str()).is_some_and(|rest| rest.starts_with('-'))
    }
}

impl fmt::Display for CacheVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
