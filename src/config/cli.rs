use crate::config::toml_config::{ClientConfig, DEFAULT_CACHE_PATH};
use crate::utils::error::{CrmError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_path, Validate};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "teleapo")]
#[command(about = "Customer and call-history client for the telesales table API")]
pub struct CliConfig {
    #[arg(long, global = true, help = "TOML config file; falls back to SUPABASE_* env vars")]
    pub config: Option<String>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Check that the backend answers
    Ping,
    /// List customers, newest first
    List {
        #[arg(long)]
        business: Option<String>,
        #[arg(long, help = "List archived customers instead")]
        archived: bool,
    },
    /// Show one customer with its call history
    Show { id: String },
    /// Create a customer
    Add(AddArgs),
    /// Change selected fields of a customer
    Update {
        id: String,
        #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
        #[arg(long = "clear", value_name = "FIELD")]
        clear: Vec<String>,
    },
    Delete { id: String },
    Archive { id: String },
    Restore { id: String },
    /// Log a call against a customer
    Call(CallArgs),
    /// Bulk-insert customers from a CSV file with camelCase headers
    Import { file: PathBuf },
    /// Find customers that share a company name or phone number
    Dupes(DupesArgs),
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Re-send settings that were cached but not saved remotely
    Reconcile,
}

#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    #[arg(long, default_value = "")]
    pub business: String,
    #[arg(long)]
    pub company: String,
    #[arg(long, default_value = "")]
    pub phone: String,
    #[arg(long, default_value = "")]
    pub contact: String,
    #[arg(long, default_value = "")]
    pub department: String,
    #[arg(long, default_value = "")]
    pub email: String,
    #[arg(long, default_value = "")]
    pub address: String,
    #[arg(long, default_value = "")]
    pub tags: String,
    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Debug, Clone, Args)]
pub struct CallArgs {
    pub customer_id: String,
    #[arg(long)]
    pub result: String,
    #[arg(long, help = "ISO-8601 timestamp; defaults to now")]
    pub date: Option<String>,
    #[arg(long, default_value = "")]
    pub duration: String,
    #[arg(long, default_value = "")]
    pub operator: String,
    #[arg(long, default_value = "")]
    pub memo: String,
    #[arg(long, help = "Overwrite the customer's tags")]
    pub tags: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct DupesArgs {
    #[arg(long, default_value = "")]
    pub business: String,
    #[arg(long, default_value = "")]
    pub company: String,
    #[arg(long, default_value = "")]
    pub phone: String,
    #[arg(long, help = "Search every business and return full records, skipping this id")]
    pub exclude: Option<String>,
    #[arg(long, help = "Search every business and return full records")]
    pub all_businesses: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum SettingsAction {
    /// Copy remote settings into the local cache
    Pull,
    /// Cache a value locally and save it remotely
    Push {
        key: String,
        #[arg(help = "JSON value")]
        value: String,
    },
    /// Print a cached value
    Show { key: String },
    /// Print every remote setting
    Remote,
}

fn parse_assignment(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(field, value)| (field.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{}'", raw))
}

impl CliConfig {
    pub fn client_config(&self) -> Result<ClientConfig> {
        let config = match &self.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Local settings cache location. Needs no backend credentials, so cached
    /// reads work offline.
    pub fn cache_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(ClientConfig::from_file(path)?.cache_path()),
            None => Ok(std::env::var("TELEAPO_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_PATH))),
        }
    }

    /// Whether the command talks to the remote table API.
    pub fn needs_backend(&self) -> bool {
        !matches!(
            self.command,
            Command::Settings {
                action: SettingsAction::Show { .. }
            }
        )
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.config {
            validate_path("config", path)?;
        }
        match &self.command {
            Command::Add(args) => validate_non_empty_string("company", &args.company),
            Command::Update { set, clear, .. } if set.is_empty() && clear.is_empty() => {
                Err(CrmError::validation("update needs at least one --set or --clear"))
            }
            Command::Dupes(args) if args.company.is_empty() && args.phone.is_empty() => {
                Err(CrmError::validation("dupes needs --company or --phone"))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_update_assignments() {
        let cli = CliConfig::try_parse_from([
            "teleapo",
            "update",
            "42",
            "--set",
            "phone=03-1111-2222",
            "--set",
            "notes=call back = tomorrow",
            "--clear",
            "email",
        ])
        .unwrap();

        match cli.command {
            Command::Update { id, set, clear } => {
                assert_eq!(id, "42");
                assert_eq!(
                    set,
                    vec![
                        ("phone".to_string(), "03-1111-2222".to_string()),
                        ("notes".to_string(), "call back = tomorrow".to_string()),
                    ]
                );
                assert_eq!(clear, vec!["email".to_string()]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cached_settings_read_needs_no_backend() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = dir.path().join("cache.json");
        let config = dir.path().join("teleapo.toml");
        std::fs::write(
            &config,
            format!("[backend]\nurl = \"\"\n\n[cache]\npath = {:?}\n", cache),
        )
        .unwrap();
        let config = config.to_string_lossy().to_string();

        let cli = CliConfig::try_parse_from([
            "teleapo", "--config", config.as_str(), "settings", "show", "operators",
        ])
        .unwrap();
        assert!(!cli.needs_backend());
        assert_eq!(cli.cache_path().unwrap(), cache);
        assert!(cli.client_config().is_err());

        let cli = CliConfig::try_parse_from(["teleapo", "--config", config.as_str(), "settings", "pull"])
            .unwrap();
        assert!(cli.needs_backend());
    }

    #[test]
    fn test_validate_rejects_empty_update_and_dupes() {
        let cli = CliConfig::try_parse_from(["teleapo", "update", "42"]).unwrap();
        assert!(cli.validate().is_err());

        let cli = CliConfig::try_parse_from(["teleapo", "dupes", "--business", "b"]).unwrap();
        assert!(cli.validate().is_err());

        let cli = CliConfig::try_parse_from(["teleapo", "--verbose", "list", "--archived"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.validate().is_ok());
    }
}
