use crate::adapters::PostgrestBackend;
use crate::config::toml_config::{ClientConfig, TableConfig};
use crate::core::duplicates::NameMatchPolicy;
use crate::domain::ports::TableBackend;
use crate::utils::error::Result;
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;

/// Data-access façade for the telesales UI.
///
/// Holds no state beyond the backend handle and the table names; every
/// record lives in the remote store.
pub struct CrmClient<B: TableBackend> {
    pub(crate) backend: Arc<B>,
    pub(crate) tables: TableConfig,
    pub(crate) name_match: NameMatchPolicy,
}

impl<B: TableBackend> Clone for CrmClient<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            tables: self.tables.clone(),
            name_match: self.name_match,
        }
    }
}

impl<B: TableBackend> CrmClient<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            tables: TableConfig::default(),
            name_match: NameMatchPolicy::default(),
        }
    }

    pub fn with_config(backend: B, config: &ClientConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            tables: config.tables.clone(),
            name_match: config.duplicates.name_match,
        }
    }

    pub fn with_name_match(mut self, policy: NameMatchPolicy) -> Self {
        self.name_match = policy;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl CrmClient<PostgrestBackend> {
    /// Build the HTTP backend from `config`. Fails with `NotInitialized`
    /// when the URL or the API key is missing.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let backend = PostgrestBackend::new(config)?;
        Ok(Self::with_config(backend, config))
    }
}

/// Current UTC time as an ISO-8601 string with millisecond precision.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
