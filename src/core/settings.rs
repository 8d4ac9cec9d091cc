//! Remote key/value settings and their local mirror.
//!
//! Writes go to the local cache first and then to the remote table. A remote
//! failure does not lose the write: the key joins a pending set stored in the
//! cache itself, and [`SettingsSync::reconcile`] re-sends it later. Pulls never
//! overwrite a key that still has a pending local write.

use crate::core::client::CrmClient;
use crate::domain::fields::setting_columns;
use crate::domain::ports::{SettingsCache, TableBackend};
use crate::domain::query::{Query, Row};
use crate::utils::error::{CrmError, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Collections mirrored into the local cache on pull.
pub const SYNCED_KEYS: [&str; 4] = ["businesses", "operators", "customerTagsByBusiness", "users"];

const PENDING_KEY: &str = "_pendingSync";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SyncOutcome {
    /// Remote and cache agree for these keys.
    Synced { keys: Vec<String> },
    /// Cached locally, not yet accepted remotely.
    Pending { keys: Vec<String>, error: String },
    /// Remote read failed; the cache keeps its previous values.
    Stale { error: String },
}

impl<B: TableBackend> CrmClient<B> {
    pub async fn get_settings(&self) -> Result<BTreeMap<String, Value>> {
        let rows = self
            .backend
            .select(&Query::table(&self.tables.app_settings))
            .await?;

        let mut settings = BTreeMap::new();
        for row in rows {
            let Some(key) = row.get(setting_columns::KEY).and_then(Value::as_str) else {
                continue;
            };
            let value = row.get(setting_columns::VALUE).cloned().unwrap_or(Value::Null);
            settings.insert(key.to_string(), value);
        }
        Ok(settings)
    }

    /// Upsert on the `key` column.
    pub async fn save_setting(&self, key: &str, value: &Value) -> Result<()> {
        let mut row = Row::new();
        row.insert(setting_columns::KEY.to_string(), Value::String(key.to_string()));
        row.insert(setting_columns::VALUE.to_string(), value.clone());
        self.backend
            .upsert(&self.tables.app_settings, vec![row], setting_columns::KEY)
            .await
    }

    pub fn settings_sync<C: SettingsCache>(&self, cache: C) -> SettingsSync<B, C> {
        SettingsSync {
            client: self.clone(),
            cache,
        }
    }
}

pub struct SettingsSync<B: TableBackend, C: SettingsCache> {
    client: CrmClient<B>,
    cache: C,
}

impl<B: TableBackend, C: SettingsCache> SettingsSync<B, C> {
    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn cached(&self, key: &str) -> Result<Option<Value>> {
        self.cache.get(key)
    }

    pub fn pending_keys(&self) -> Result<BTreeSet<String>> {
        Ok(pending_set(self.cache.get(PENDING_KEY)?.as_ref()))
    }

    /// Add or drop one key in the persisted pending set. Runs as a single
    /// cache update so concurrent pushes cannot overwrite each other's keys.
    fn mark_pending(&self, key: &str, pending: bool) -> Result<()> {
        self.cache.update(PENDING_KEY, &mut |current: Option<Value>| {
            let mut keys = pending_set(current.as_ref());
            if pending {
                keys.insert(key.to_string());
            } else {
                keys.remove(key);
            }
            if keys.is_empty() {
                None
            } else {
                Some(Value::Array(keys.into_iter().map(Value::String).collect()))
            }
        })
    }

    /// Copy the mirrored collections from the remote table into the cache.
    pub async fn pull(&self) -> Result<SyncOutcome> {
        let settings = match self.client.get_settings().await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("⚠️ Settings pull failed, keeping cached values: {}", e);
                return Ok(SyncOutcome::Stale {
                    error: e.to_string(),
                });
            }
        };

        let pending = self.pending_keys()?;
        let mut keys = Vec::new();
        for key in SYNCED_KEYS {
            if pending.contains(key) {
                tracing::debug!("Skipping '{}' on pull: local write not yet synced", key);
                continue;
            }
            if let Some(value) = settings.get(key).filter(|v| is_present(v)) {
                self.cache.set(key, value)?;
                keys.push(key.to_string());
            }
        }
        tracing::info!("🔄 Pulled {} settings collections", keys.len());
        Ok(SyncOutcome::Synced { keys })
    }

    /// Cache `value` under `key`, then write it remotely.
    pub async fn push(&self, key: &str, value: &Value) -> Result<SyncOutcome> {
        if key == PENDING_KEY {
            return Err(CrmError::validation(format!("'{}' is a reserved key", key)));
        }
        self.cache.set(key, value)?;

        match self.client.save_setting(key, value).await {
            Ok(()) => {
                self.mark_pending(key, false)?;
                Ok(SyncOutcome::Synced {
                    keys: vec![key.to_string()],
                })
            }
            Err(e) => {
                tracing::warn!("⚠️ Setting '{}' cached but not saved remotely: {}", key, e);
                self.mark_pending(key, true)?;
                Ok(SyncOutcome::Pending {
                    keys: vec![key.to_string()],
                    error: e.to_string(),
                })
            }
        }
    }

    /// Re-send every pending key from the cache.
    pub async fn reconcile(&self) -> Result<SyncOutcome> {
        let pending = self.pending_keys()?;
        let mut synced = Vec::new();
        let mut remaining = Vec::new();
        let mut last_error = None;

        for key in pending {
            let Some(value) = self.cache.get(&key)? else {
                tracing::debug!("Dropping pending '{}': no cached value", key);
                self.mark_pending(&key, false)?;
                continue;
            };
            match self.client.save_setting(&key, &value).await {
                Ok(()) => {
                    self.mark_pending(&key, false)?;
                    synced.push(key);
                }
                Err(e) => {
                    tracing::warn!("⚠️ Reconcile of '{}' failed: {}", key, e);
                    last_error = Some(e.to_string());
                    remaining.push(key);
                }
            }
        }

        match last_error {
            None => {
                tracing::info!("🔄 Reconciled {} pending settings", synced.len());
                Ok(SyncOutcome::Synced { keys: synced })
            }
            Some(error) => Ok(SyncOutcome::Pending {
                keys: remaining,
                error,
            }),
        }
    }
}

fn pending_set(value: Option<&Value>) -> BTreeSet<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => BTreeSet::new(),
    }
}

/// Mirrors the UI's truthiness check: null, false, "" and 0 are not copied.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryBackend, MemoryCache};
    use serde_json::json;

    #[tokio::test]
    async fn test_pull_copies_only_mirrored_collections() {
        let client = CrmClient::new(InMemoryBackend::new());
        client.save_setting("operators", &json!(["Sato"])).await.unwrap();
        client.save_setting("theme", &json!("dark")).await.unwrap();
        client.save_setting("users", &Value::Null).await.unwrap();

        let sync = client.settings_sync(MemoryCache::new());
        let outcome = sync.pull().await.unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Synced {
                keys: vec!["operators".to_string()]
            }
        );
        assert_eq!(sync.cached("operators").unwrap(), Some(json!(["Sato"])));
        assert_eq!(sync.cached("theme").unwrap(), None);
        assert_eq!(sync.cached("users").unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_push_is_pending_and_reconciles() {
        let client = CrmClient::new(InMemoryBackend::new());
        let sync = client.settings_sync(MemoryCache::new());

        client.backend().set_failing("app_settings", true);
        let outcome = sync.push("businesses", &json!(["A"])).await.unwrap();
        assert!(matches!(outcome, SyncOutcome::Pending { .. }));
        assert_eq!(sync.cached("businesses").unwrap(), Some(json!(["A"])));
        assert!(sync.pending_keys().unwrap().contains("businesses"));

        // A pull that fails leaves the cache alone.
        assert!(matches!(sync.pull().await.unwrap(), SyncOutcome::Stale { .. }));
        assert_eq!(sync.cached("businesses").unwrap(), Some(json!(["A"])));

        client.backend().set_failing("app_settings", false);
        let outcome = sync.reconcile().await.unwrap();
        assert_eq!(
            outcome,
            SyncOutcome::Synced {
                keys: vec!["businesses".to_string()]
            }
        );
        assert!(sync.pending_keys().unwrap().is_empty());
        assert_eq!(
            client.get_settings().await.unwrap().get("businesses"),
            Some(&json!(["A"]))
        );
    }

    #[tokio::test]
    async fn test_pull_does_not_clobber_pending_writes() {
        let client = CrmClient::new(InMemoryBackend::new());
        client.save_setting("operators", &json!(["Remote"])).await.unwrap();
        let sync = client.settings_sync(MemoryCache::new());

        client.backend().set_failing("app_settings", true);
        sync.push("operators", &json!(["Local"])).await.unwrap();
        client.backend().set_failing("app_settings", false);

        sync.pull().await.unwrap();
        assert_eq!(sync.cached("operators").unwrap(), Some(json!(["Local"])));
    }

    #[tokio::test]
    async fn test_reserved_key_is_rejected() {
        let client = CrmClient::new(InMemoryBackend::new());
        let sync = client.settings_sync(MemoryCache::new());
        assert!(sync.push(PENDING_KEY, &json!([])).await.is_err());
    }
}
