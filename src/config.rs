use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Tunables for the update check. Every field has a default, so a config
/// file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Path of the entry document relative to the site root.
    pub entry_path: String,
    /// Prefix of the per-version "already reloaded" keys.
    pub guard_prefix: String,
    /// Key holding the last forced reload's unix-millis timestamp.
    pub global_guard_key: String,
    pub cooldown_ms: u64,
    /// Pause between showing the updating notice and navigating.
    pub update_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            entry_path: "/".into(),
            guard_prefix: "app-version-refreshed:".into(),
            global_guard_key: "app-version-last-reload".into(),
            cooldown_ms: 5_000,
            update_delay_ms: 250,
            request_timeout_secs: 10,
        }
    }
}

impl ReconcileConfig {
    /// Defaults, overlaid with the JSON file at `path` when one is given.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let config = match path {
            Some(path) => {
                let content = fs::read_to_string(path)?;
                serde_json::from_str::<ReconcileConfig>(&content)?
            }
            None => ReconcileConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.request_timeout_secs == 0 {
            return Err(AppError::Config("request_timeout_secs must be positive".into()));
        }
        if self.global_guard_key.is_empty() {
            return Err(AppError::Config("global_guard_key must not be empty".into()));
        }
        if self.guard_prefix.is_empty() || self.guard_prefix == self.global_guard_key {
            return Err(AppError::Config(
                "guard_prefix must be non-empty and distinct from global_guard_key".into(),
            ));
        }
        Ok(())
    }

    pub fn update_delay(&self) -> Duration {
        Duration::from_millis(self.update_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_valid() {
        let config = ReconcileConfig::load(None).unwrap();
        assert_eq!(config.cooldown_ms, 5_000);
        assert_eq!(config.entry_path, "/");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn partial_file_overlays_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("reconcile.json");
        fs::write(&path, r#"{"update_delay_ms": 0, "entry_path": "/app/"}"#).unwrap();

        let config = ReconcileConfig::load(Some(&path)).unwrap();
        assert_eq!(config.update_delay(), Duration::ZERO);
        assert_eq!(config.entry_path, "/app/");
        assert_eq!(config.guard_prefix, "app-version-refreshed:");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("reconcile.json");
        fs::write(&path, r#"{"request_timeout_secs": 0}"#).unwrap();
        assert!(matches!(
            ReconcileConfig::load(Some(&path)),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn malformed_file_is_json_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("reconcile.json");
        fs::write(&path, "{").unwrap();
        assert!(matches!(
            ReconcileConfig::load(Some(&path)),
            Err(AppError::Json(_))
        ));
    }
}
