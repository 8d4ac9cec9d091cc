use crate::core::duplicates::NameMatchPolicy;
use crate::utils::error::{CrmError, Result};
use crate::utils::validation::{
    validate_identifier, validate_path, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_CACHE_PATH: &str = ".teleapo/settings-cache.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub tables: TableConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub duplicates: DuplicateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default = "default_customers_table")]
    pub customers: String,
    #[serde(default = "default_call_history_table")]
    pub call_history: String,
    #[serde(default = "default_settings_table")]
    pub app_settings: String,
}

fn default_customers_table() -> String {
    "customers".to_string()
}

fn default_call_history_table() -> String {
    "call_history".to_string()
}

fn default_settings_table() -> String {
    "app_settings".to_string()
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            customers: default_customers_table(),
            call_history: default_call_history_table(),
            app_settings: default_settings_table(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateConfig {
    #[serde(default)]
    pub name_match: NameMatchPolicy,
}

impl ClientConfig {
    /// Minimal config pointing at `url` with default table names.
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            backend: BackendConfig {
                url: url.into(),
                anon_key: anon_key.into(),
                timeout_seconds: None,
            },
            tables: TableConfig::default(),
            cache: CacheConfig::default(),
            duplicates: DuplicateConfig::default(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;

        toml::from_str(&processed).map_err(|e| CrmError::Config {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Reads `SUPABASE_URL`, `SUPABASE_ANON_KEY`, `TELEAPO_CACHE_PATH` and
    /// `TELEAPO_TIMEOUT_SECONDS`.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("SUPABASE_URL").map_err(|_| CrmError::MissingConfig {
            field: "SUPABASE_URL".to_string(),
        })?;
        let anon_key = std::env::var("SUPABASE_ANON_KEY").unwrap_or_default();

        let mut config = Self::new(url, anon_key);
        config.cache.path = std::env::var("TELEAPO_CACHE_PATH").ok();
        if let Ok(raw) = std::env::var("TELEAPO_TIMEOUT_SECONDS") {
            let seconds = raw.parse().map_err(|_| CrmError::InvalidConfigValue {
                field: "TELEAPO_TIMEOUT_SECONDS".to_string(),
                value: raw.clone(),
                reason: "Expected a whole number of seconds".to_string(),
            })?;
            config.backend.timeout_seconds = Some(seconds);
        }
        Ok(config)
    }

    /// Replaces `${VAR}` with the environment value. Unset variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CrmError::Config {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.backend
            .timeout_seconds
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }

    pub fn cache_path(&self) -> PathBuf {
        PathBuf::from(self.cache.path.as_deref().unwrap_or(DEFAULT_CACHE_PATH))
    }

    /// Whether the API key is present and not an unresolved `${...}` placeholder.
    pub fn has_api_key(&self) -> bool {
        let key = self.backend.anon_key.trim();
        !key.is_empty() && !(key.starts_with("${") && key.ends_with('}'))
    }
}

impl Validate for ClientConfig {
    fn validate(&self) -> Result<()> {
        validate_url("backend.url", &self.backend.url)?;
        if !self.has_api_key() {
            return Err(CrmError::MissingConfig {
                field: "backend.anon_key".to_string(),
            });
        }
        if let Some(timeout) = self.backend.timeout_seconds {
            validate_range("backend.timeout_seconds", timeout, 1, 300)?;
        }

        validate_identifier("tables.customers", &self.tables.customers)?;
        validate_identifier("tables.call_history", &self.tables.call_history)?;
        validate_identifier("tables.app_settings", &self.tables.app_settings)?;

        if let Some(path) = &self.cache.path {
            validate_path("cache.path", path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_minimal_config_uses_default_tables() {
        let config = ClientConfig::from_toml_str(
            r#"
[backend]
url = "https://abc.supabase.co"
anon_key = "public-key"
"#,
        )
        .unwrap();

        assert_eq!(config.tables.customers, "customers");
        assert_eq!(config.tables.call_history, "call_history");
        assert_eq!(config.tables.app_settings, "app_settings");
        assert_eq!(config.timeout_seconds(), DEFAULT_TIMEOUT_SECONDS);
        assert_eq!(config.duplicates.name_match, NameMatchPolicy::Exact);
        assert_eq!(config.cache_path(), PathBuf::from(DEFAULT_CACHE_PATH));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let config = ClientConfig::from_toml_str(
            r#"
[backend]
url = "http://localhost:54321"
anon_key = "k"
timeout_seconds = 5

[tables]
customers = "tele_customers"

[cache]
path = "./settings-cache.json"

[duplicates]
name_match = "normalized"
"#,
        )
        .unwrap();

        assert_eq!(config.tables.customers, "tele_customers");
        assert_eq!(config.tables.call_history, "call_history");
        assert_eq!(config.cache.path.as_deref(), Some("./settings-cache.json"));
        assert_eq!(config.timeout_seconds(), 5);
        assert_eq!(config.duplicates.name_match, NameMatchPolicy::Normalized);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TELEAPO_TEST_ANON_KEY", "secret-from-env");

        let config = ClientConfig::from_toml_str(
            r#"
[backend]
url = "https://abc.supabase.co"
anon_key = "${TELEAPO_TEST_ANON_KEY}"
"#,
        )
        .unwrap();

        assert_eq!(config.backend.anon_key, "secret-from-env");
        assert!(config.has_api_key());
    }

    #[test]
    fn test_unresolved_key_placeholder_fails_validation() {
        let config = ClientConfig::from_toml_str(
            r#"
[backend]
url = "https://abc.supabase.co"
anon_key = "${TELEAPO_TEST_DEFINITELY_UNSET_KEY}"
"#,
        )
        .unwrap();

        assert!(!config.has_api_key());
        assert!(matches!(
            config.validate(),
            Err(CrmError::MissingConfig { .. })
        ));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let mut config = ClientConfig::new("https://abc.supabase.co", "k");
        config.backend.timeout_seconds = Some(0);
        assert!(config.validate().is_err());

        let mut config = ClientConfig::new("https://abc.supabase.co", "k");
        config.tables.customers = "customers;drop".to_string();
        assert!(config.validate().is_err());

        let config = ClientConfig::new("not a url", "k");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[backend]\nurl = \"https://abc.supabase.co\"\nanon_key = \"k\""
        )
        .unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.backend.url, "https://abc.supabase.co");
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = ClientConfig::from_toml_str("[backend\nurl=").unwrap_err();
        assert!(matches!(err, CrmError::Config { .. }));
    }
}
