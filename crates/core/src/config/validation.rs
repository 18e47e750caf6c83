//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `namespace` or `version` is empty, or `version` doesn't start with `namespace`
    /// - `origin` is not an absolute http(s) URL
    /// - a manifest entry is empty
    /// - any entry budget is 0
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() {
            return Err(invalid("namespace", "must not be empty"));
        }
        if self.version.is_empty() {
            return Err(invalid("version", "must not be empty"));
        }
        if !self.version.starts_with(&self.namespace) {
            return Err(invalid("version", "must start with the namespace prefix"));
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            Ok(_) => return Err(invalid("origin", "scheme must be http or https")),
            Err(_) => return Err(invalid("origin", "must be an absolute URL")),
        }

        if self.manifest.iter().any(|entry| entry.trim().is_empty()) {
            return Err(invalid("manifest", "entries must not be empty"));
        }

        if self.static_max_entries == Some(0) {
            return Err(invalid("static_max_entries", "must be greater than 0"));
        }
        if self.dynamic_max_entries == 0 {
            return Err(invalid("dynamic_max_entries", "must be greater than 0"));
        }
        if self.image_max_entries == 0 {
            return Err(invalid("image_max_entries", "must be greater than 0"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.manifest.is_empty() {
            tracing::warn!("install manifest is empty; no assets will be precached");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_version_outside_namespace() {
        let config = AppConfig { namespace: "casa-".into(), version: "v2".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "version"));
    }

    #[test]
    fn test_validate_empty_namespace() {
        let config = AppConfig { namespace: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "namespace"));
    }

    #[test]
    fn test_validate_origin() {
        let config = AppConfig { origin: "localhost:8888/app".into(), ..Default::default() };
        assert!(config.validate().is_err());

        let config = AppConfig { origin: "ftp://casa.example".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_blank_manifest_entry() {
        let config = AppConfig { manifest: vec!["/".into(), "  ".into()], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "manifest"));
    }

    #[test]
    fn test_validate_zero_budgets() {
        let config = AppConfig { image_max_entries: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "image_max_entries"));

        let config = AppConfig { static_max_entries: Some(0), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "static_max_entries"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_max_bytes_bounds() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));

        let config = AppConfig { max_bytes: 50 * 1024 * 1024, timeout_ms: 300_000, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_empty_manifest_is_allowed() {
        let config = AppConfig { manifest: Vec::new(), ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
