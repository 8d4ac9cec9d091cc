use crate::domain::ports::SettingsCache;
use crate::utils::error::{CrmError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// Settings cache persisted as one JSON object in a file.
///
/// Every write rewrites the whole file; the collections it holds are small.
/// The new content goes to a sibling temp file that is renamed over the old
/// one, so readers never see a half-written file.
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(CrmError::Config {
                message: format!("Cache file {} is not a JSON object", self.path.display()),
            }),
        }
    }

    fn store(&self, map: &Map<String, Value>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&serde_json::to_vec_pretty(map)?)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn locked<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| CrmError::validation("settings cache lock poisoned"))?;
        f()
    }
}

impl SettingsCache for FileCache {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        self.locked(|| Ok(self.load()?.get(key).cloned()))
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        self.locked(|| {
            let mut map = self.load()?;
            map.insert(key.to_string(), value.clone());
            self.store(&map)
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.locked(|| {
            let mut map = self.load()?;
            if map.remove(key).is_some() {
                self.store(&map)?;
            }
            Ok(())
        })
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<Value>) -> Option<Value>,
    ) -> Result<()> {
        self.locked(|| {
            let mut map = self.load()?;
            if let Some(value) = f(map.remove(key)) {
                map.insert(key.to_string(), value);
            }
            self.store(&map)
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| CrmError::validation("settings cache lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CrmError::validation("settings cache lock poisoned"))?;
        entries.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CrmError::validation("settings cache lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<Value>) -> Option<Value>,
    ) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CrmError::validation("settings cache lock poisoned"))?;
        if let Some(value) = f(entries.remove(key)) {
            entries.insert(key.to_string(), value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_file_cache_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let cache = FileCache::new(&path);
        assert_eq!(cache.get("operators").unwrap(), None);
        cache.set("operators", &json!(["Sato", "Suzuki"])).unwrap();

        let reopened = FileCache::new(&path);
        assert_eq!(
            reopened.get("operators").unwrap(),
            Some(json!(["Sato", "Suzuki"]))
        );

        reopened.remove("operators").unwrap();
        assert_eq!(cache.get("operators").unwrap(), None);
    }

    #[test]
    fn test_file_cache_rejects_non_object_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        assert!(FileCache::new(&path).get("users").is_err());
    }

    #[test]
    fn test_file_cache_replaces_file_without_leftovers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, r#"{"users": []}"#).unwrap();

        let cache = FileCache::new(&path);
        cache.set("operators", &json!(["Sato"])).unwrap();
        cache
            .update("operators", &mut |old: Option<Value>| {
                let mut items = old?.as_array()?.clone();
                items.push(json!("Ito"));
                Some(Value::Array(items))
            })
            .unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let stored: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stored, json!({"users": [], "operators": ["Sato", "Ito"]}));
    }

    #[test]
    fn test_update_returning_none_removes_key() {
        let cache = MemoryCache::new();
        cache.set("users", &json!(["a"])).unwrap();
        cache.update("users", &mut |_| None).unwrap();
        assert_eq!(cache.get("users").unwrap(), None);
    }

    #[test]
    fn test_memory_cache() {
        let cache = MemoryCache::new();
        cache.set("users", &json!([{"name": "a"}])).unwrap();
        assert_eq!(cache.get("users").unwrap(), Some(json!([{"name": "a"}])));
        cache.remove("users").unwrap();
        assert_eq!(cache.get("users").unwrap(), None);
    }
}
