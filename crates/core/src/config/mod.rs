//! Engine configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheVersion, StoreKind};
use crate::classify::Classifier;

mod validation;

pub use validation::ConfigError;

/// What to do when the install manifest cannot be fully cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallPolicy {
    /// Fail the install; the host may retry later.
    Strict,
    /// Log the failure and finish install with an incomplete static store.
    #[default]
    Degrade,
}

/// Engine configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite store database.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the install manifest paths are resolved against.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix shared by every store this engine owns.
    ///
    /// Set via SWCACHE_NAMESPACE environment variable.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Current version tag. Must start with `namespace`.
    ///
    /// Set via SWCACHE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Critical assets cached on install.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// User-Agent string for network requests.
    ///
    /// Set via SWCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network request timeout in milliseconds.
    ///
    /// Set via SWCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size in bytes.
    ///
    /// Set via SWCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Entry budget for the static store. Unbounded when unset.
    #[serde(default)]
    pub static_max_entries: Option<usize>,

    /// Entry budget for the dynamic store.
    #[serde(default = "default_dynamic_max_entries")]
    pub dynamic_max_entries: usize,

    /// Entry budget for the image store.
    #[serde(default = "default_image_max_entries")]
    pub image_max_entries: usize,

    /// Install failure handling.
    ///
    /// Set via SWCACHE_INSTALL_POLICY environment variable (`strict` or `degrade`).
    #[serde(default)]
    pub install_policy: InstallPolicy,

    /// Analytics and tracking hosts that are never intercepted.
    #[serde(default = "default_excluded_hosts")]
    pub excluded_hosts: Vec<String>,

    /// Path prefixes (API and edge functions) that are never intercepted.
    #[serde(default = "default_excluded_path_prefixes")]
    pub excluded_path_prefixes: Vec<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8888".into()
}

fn default_namespace() -> String {
    "swcache-".into()
}

fn default_version() -> String {
    "swcache-v1".into()
}

fn default_manifest() -> Vec<String> {
    ["/", "/manifest.json", "/icons/icon-192x192.png", "/icons/icon-512x512.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_dynamic_max_entries() -> usize {
    50
}

fn default_image_max_entries() -> usize {
    100
}

fn default_excluded_hosts() -> Vec<String> {
    [
        "google-analytics.com",
        "analytics.google.com",
        "googletagmanager.com",
        "doubleclick.net",
        "facebook.net",
        "connect.facebook.net",
        "hotjar.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_excluded_path_prefixes() -> Vec<String> {
    vec!["/api/".into(), "/.netlify/functions/".into()]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            namespace: default_namespace(),
            version: default_version(),
            manifest: default_manifest(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            static_max_entries: None,
            dynamic_max_entries: default_dynamic_max_entries(),
            image_max_entries: default_image_max_entries(),
            install_policy: InstallPolicy::default(),
            excluded_hosts: default_excluded_hosts(),
            excluded_path_prefixes: default_excluded_path_prefixes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_version(&self) -> CacheVersion {
        CacheVersion::new(self.version.clone())
    }

    /// Entry budget for a store kind; `None` is unbounded.
    pub fn budget(&self, kind: StoreKind) -> Option<usize> {
        match kind {
            StoreKind::Static => self.static_max_entries,
            StoreKind::Dynamic => Some(self.dynamic_max_entries),
            StoreKind::Image => Some(self.image_max_entries),
        }
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.excluded_hosts.clone(), self.excluded_path_prefixes.clone())
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// Build the layered provider chain without extracting it.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("SWCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    /// Extract and validate a configuration from a provider chain.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./swcache.sqlite"));
        assert_eq!(config.namespace, "swcache-");
        assert_eq!(config.version, "swcache-v1");
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.install_policy, InstallPolicy::Degrade);
        assert!(config.manifest.contains(&"/".to_string()));
        assert!(config.manifest.contains(&"/manifest.json".to_string()));
    }

    #[test]
    fn test_default_budgets() {
        let config = AppConfig::default();
        assert_eq!(config.budget(StoreKind::Static), None);
        assert_eq!(config.budget(StoreKind::Dynamic), Some(50));
        assert_eq!(config.budget(StoreKind::Image), Some(100));
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_env_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SWCACHE_VERSION", "swcache-v7");
            jail.set_env("SWCACHE_IMAGE_MAX_ENTRIES", "12");
            jail.set_env("SWCACHE_INSTALL_POLICY", "strict");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.version, "swcache-v7");
            assert_eq!(config.budget(StoreKind::Image), Some(12));
            assert_eq!(config.install_policy, InstallPolicy::Strict);
            Ok(())
        });
    }

    #[test]
    fn test_toml_file_layer() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "swcache.toml",
                r#"
                namespace = "casa-"
                version = "casa-v3"
                manifest = ["/", "/offline.html"]
                static_max_entries = 200
                "#,
            )?;
            jail.set_env("SWCACHE_CONFIG_FILE", "swcache.toml");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.cache_version().store_name(StoreKind::Static), "casa-v3-static");
            assert_eq!(config.manifest, vec!["/", "/offline.html"]);
            assert_eq!(config.budget(StoreKind::Static), Some(200));
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SWCACHE_NAMESPACE", "casa-");
            jail.set_env("SWCACHE_VERSION", "other-v1");

            let result = AppConfig::load();
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "version"));
            Ok(())
        });
    }
}
