use crate::config::toml_config::ClientConfig;
use crate::domain::ports::TableBackend;
use crate::domain::query::{Query, Row};
use crate::utils::error::{CrmError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use std::time::Duration;

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// HTTP adapter for a PostgREST table API (`<url>/rest/v1/<table>`).
#[derive(Debug, Clone)]
pub struct PostgrestBackend {
    client: Client,
    rest_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

impl PostgrestBackend {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let url = config.backend.url.trim();
        if url.is_empty() {
            return Err(CrmError::NotInitialized {
                what: "the backend URL".to_string(),
            });
        }
        if !config.has_api_key() {
            return Err(CrmError::NotInitialized {
                what: "the API key".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds()))
            .build()?;

        tracing::debug!("📡 PostgREST client ready for {}", url);
        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            api_key: config.backend.anon_key.trim().to_string(),
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let error = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => CrmError::Remote {
                code: body.code,
                message: body
                    .message
                    .unwrap_or_else(|| format!("request failed with status {}", status)),
                details: body.details,
                hint: body.hint,
            },
            Err(_) => CrmError::Remote {
                code: Some(status.as_u16().to_string()),
                message: if text.trim().is_empty() {
                    format!("request failed with status {}", status)
                } else {
                    text
                },
                details: None,
                hint: None,
            },
        };
        tracing::error!("❌ PostgREST request failed: {}", error);
        Err(error)
    }

    fn require_filters(query: &Query, action: &str) -> Result<()> {
        if query.filters.is_empty() {
            return Err(CrmError::validation(format!(
                "Refusing to {} every row of '{}' without a filter",
                action, query.table
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TableBackend for PostgrestBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Row>> {
        tracing::debug!("📡 GET {} {:?}", query.table, query.select_pairs());
        let response = self
            .request(Method::GET, &query.table)
            .query(&query.select_pairs())
            .send()
            .await?;
        let rows: Vec<Row> = Self::check(response).await?.json().await?;
        tracing::debug!("📡 {} rows from {}", rows.len(), query.table);
        Ok(rows)
    }

    async fn select_single(&self, query: &Query) -> Result<Row> {
        tracing::debug!("📡 GET single {} {:?}", query.table, query.select_pairs());
        let response = self
            .request(Method::GET, &query.table)
            .header("Accept", SINGLE_OBJECT)
            .query(&query.select_pairs())
            .send()
            .await?;
        let row: Row = Self::check(response).await?.json().await?;
        Ok(row)
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
        tracing::debug!("📡 POST {} ({} rows)", table, rows.len());
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(&rows)
            .send()
            .await?;
        let inserted: Vec<Row> = Self::check(response).await?.json().await?;
        Ok(inserted)
    }

    async fn insert_many(&self, table: &str, rows: Vec<Row>) -> Result<()> {
        tracing::debug!("📡 POST {} ({} rows, minimal)", table, rows.len());
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update(&self, query: &Query, changes: Row) -> Result<()> {
        Self::require_filters(query, "update")?;
        tracing::debug!(
            "📡 PATCH {} {:?} columns={:?}",
            query.table,
            query.filter_pairs(),
            changes.keys().collect::<Vec<_>>()
        );
        let response = self
            .request(Method::PATCH, &query.table)
            .header("Prefer", "return=minimal")
            .query(&query.filter_pairs())
            .json(&changes)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, query: &Query) -> Result<()> {
        Self::require_filters(query, "delete")?;
        tracing::debug!("📡 DELETE {} {:?}", query.table, query.filter_pairs());
        let response = self
            .request(Method::DELETE, &query.table)
            .query(&query.filter_pairs())
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn upsert(&self, table: &str, rows: Vec<Row>, on_conflict: &str) -> Result<()> {
        tracing::debug!("📡 UPSERT {} on {} ({} rows)", table, on_conflict, rows.len());
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .query(&[("on_conflict", on_conflict)])
            .json(&rows)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
