use crate::domain::query::{Query, Row};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Remote table service: select/insert/update/delete/upsert against named tables.
#[async_trait]
pub trait TableBackend: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Row>>;

    /// Exactly one row, or an error.
    async fn select_single(&self, query: &Query) -> Result<Row>;

    /// Returns the stored representation of the inserted rows.
    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>>;

    /// Bulk insert that does not read the stored rows back.
    async fn insert_many(&self, table: &str, rows: Vec<Row>) -> Result<()>;

    async fn update(&self, query: &Query, changes: Row) -> Result<()>;

    async fn delete(&self, query: &Query) -> Result<()>;

    async fn upsert(&self, table: &str, rows: Vec<Row>, on_conflict: &str) -> Result<()>;
}

/// Local key/value mirror for settings collections.
pub trait SettingsCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: &Value) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;

    /// Read-modify-write of one key as a single step. Returning `None`
    /// removes the key.
    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<Value>) -> Option<Value>,
    ) -> Result<()>;
}
