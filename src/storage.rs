use crate::error::AppError;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Tab-scoped key/value storage that survives a reload but not the session.
///
/// Every call may fail (quota, storage disabled); callers decide how to degrade.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    fn remove(&self, key: &str) -> Result<(), AppError>;
}

/// In-memory storage. Can be switched into a failing mode to model blocked storage.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    failing: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Storage("storage unavailable".into()));
        }
        Ok(())
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, AppError> {
        self.entries
            .lock()
            .map_err(|_| AppError::Storage("storage lock poisoned".into()))
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        self.check()?;
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.check()?;
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        self.check()?;
        self.entries()?.remove(key);
        Ok(())
    }
}

/// Session storage persisted as a flat JSON object in a single file.
///
/// One file is one browsing session: keep it across reloads, delete it to
/// start a fresh session.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `<data-local-dir>/build-reconcile/session.json`
    pub fn default_path() -> Result<PathBuf, AppError> {
        dirs::data_local_dir()
            .map(|dir| dir.join("build-reconcile").join("session.json"))
            .ok_or_else(|| AppError::Storage("No local data dir".into()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, AppError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(AppError::Storage(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(map)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn locked(&self) -> Result<std::sync::MutexGuard<'_, ()>, AppError> {
        self.lock
            .lock()
            .map_err(|_| AppError::Storage("storage lock poisoned".into()))
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let _guard = self.locked()?;
        Ok(self.read_map()?.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let _guard = self.locked()?;
        let mut map = self.read_map()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        let _guard = self.locked()?;
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}
