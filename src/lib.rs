pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::cli::CliConfig;

pub use crate::adapters::{FileCache, InMemoryBackend, MemoryCache, PostgrestBackend};
pub use crate::config::toml_config::ClientConfig;
pub use crate::core::calls::CallLogged;
pub use crate::core::client::CrmClient;
pub use crate::core::duplicates::NameMatchPolicy;
pub use crate::core::import::read_import_csv;
pub use crate::core::settings::{SettingsSync, SyncOutcome, SYNCED_KEYS};
pub use crate::domain::fields::{CustomerField, CustomerPatch};
pub use crate::domain::model::{
    CallRecord, Customer, CustomerDetail, DuplicateCandidate, DuplicateReport, ImportSummary,
    MatchType, NewCallRecord, NewCustomer,
};
pub use crate::utils::error::{CrmError, Result};
