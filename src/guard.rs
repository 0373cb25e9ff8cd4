use crate::clock::Clock;
use crate::config::ReconcileConfig;
use crate::storage::SessionStorage;
use std::sync::Arc;
use tracing::{debug, error};

const HANDLED: &str = "true";

/// Persisted gate that keeps forced reloads from looping.
///
/// Two independent checks: a per-version "already reloaded for this version"
/// flag, and a global cooldown on the last reload's wall-clock time. Storage
/// failures never engage the guard.
pub struct RefreshLoopGuard {
    storage: Arc<dyn SessionStorage>,
    clock: Arc<dyn Clock>,
    prefix: String,
    global_key: String,
    cooldown_ms: i64,
}

impl RefreshLoopGuard {
    pub fn new(
        storage: Arc<dyn SessionStorage>,
        clock: Arc<dyn Clock>,
        config: &ReconcileConfig,
    ) -> Self {
        Self {
            storage,
            clock,
            prefix: config.guard_prefix.clone(),
            global_key: config.global_guard_key.clone(),
            cooldown_ms: i64::try_from(config.cooldown_ms).unwrap_or(i64::MAX),
        }
    }

    fn version_key(&self, version: &str) -> String {
        format!("{}{}", self.prefix, version)
    }

    /// True unless a reload was recorded within the cooldown window.
    pub fn can_attempt(&self) -> bool {
        let raw = match self.storage.get(&self.global_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return true,
            Err(e) => {
                error!("Refresh guard read failed, allowing reload: {e}");
                return true;
            }
        };

        let Ok(last) = raw.trim().parse::<i64>() else {
            debug!("Ignoring unreadable last-reload timestamp {raw:?}");
            return true;
        };

        // A timestamp in the future (clock moved backwards) counts by distance too
        let elapsed = self.clock.now_millis().saturating_sub(last).saturating_abs();
        elapsed >= self.cooldown_ms
    }

    pub fn record_attempt(&self) {
        let now = self.clock.now_millis().to_string();
        if let Err(e) = self.storage.set(&self.global_key, &now) {
            error!("Failed to record reload attempt: {e}");
        }
    }

    pub fn has_already_handled(&self, version: &str) -> bool {
        match self.storage.get(&self.version_key(version)) {
            Ok(value) => value.as_deref() == Some(HANDLED),
            Err(e) => {
                error!("Refresh guard read failed for {version}, treating as unhandled: {e}");
                false
            }
        }
    }

    pub fn mark_handled(&self, version: &str) {
        if let Err(e) = self.storage.set(&self.version_key(version), HANDLED) {
            error!("Failed to mark {version} as handled: {e}");
        }
    }

    pub fn clear_for(&self, version: &str) {
        if let Err(e) = self.storage.remove(&self.version_key(version)) {
            error!("Failed to clear refresh flag for {version}: {e}");
        }
    }

    pub fn clear_global(&self) {
        if let Err(e) = self.storage.remove(&self.global_key) {
            error!("Failed to clear last-reload timestamp: {e}");
        }
    }
}
