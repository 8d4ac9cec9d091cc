use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrmError {
    #[error("Client is not initialized: {what} is missing")]
    NotInitialized { what: String },

    #[error("Remote operation failed: {}", format_remote(.code, .message))]
    Remote {
        code: Option<String>,
        message: String,
        details: Option<String>,
        hint: Option<String>,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid configuration value for '{field}': {reason} (value: {value})")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfig { field: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("No importable rows: every entry needs a company name and a phone number")]
    EmptyImport,

    #[error("No row in '{table}' with id '{id}'")]
    NotFound { table: String, id: String },

    #[error("Call record was saved but {step} failed: {source}")]
    PartialWrite {
        step: WriteStep,
        #[source]
        source: Box<CrmError>,
    },
}

fn format_remote(code: &Option<String>, message: &str) -> String {
    match code {
        Some(code) => format!("[{}] {}", code, message),
        None => message.to_string(),
    }
}

/// The follow-up step of an add-call-record sequence that failed after the
/// call row itself was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStep {
    CallCount,
    Tags,
}

impl std::fmt::Display for WriteStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteStep::CallCount => write!(f, "updating the call count"),
            WriteStep::Tags => write!(f, "updating the customer tags"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Remote,
    Network,
    Data,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CrmError {
    pub fn remote(message: impl Into<String>) -> Self {
        CrmError::Remote {
            code: None,
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CrmError::Validation {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            CrmError::NotInitialized { .. }
            | CrmError::Config { .. }
            | CrmError::InvalidConfigValue { .. }
            | CrmError::MissingConfig { .. } => ErrorCategory::Configuration,
            CrmError::Remote { .. } | CrmError::NotFound { .. } => ErrorCategory::Remote,
            CrmError::Http(_) => ErrorCategory::Network,
            CrmError::Serialization(_) | CrmError::Io(_) | CrmError::Csv(_) => {
                ErrorCategory::Data
            }
            CrmError::Validation { .. } | CrmError::EmptyImport => ErrorCategory::Input,
            CrmError::PartialWrite { source, .. } => source.category(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CrmError::EmptyImport => ErrorSeverity::Low,
            CrmError::Http(_)
            | CrmError::Remote { .. }
            | CrmError::NotFound { .. }
            | CrmError::Validation { .. } => ErrorSeverity::Medium,
            CrmError::PartialWrite { .. }
            | CrmError::Serialization(_)
            | CrmError::Io(_)
            | CrmError::Csv(_) => ErrorSeverity::High,
            CrmError::NotInitialized { .. }
            | CrmError::Config { .. }
            | CrmError::InvalidConfigValue { .. }
            | CrmError::MissingConfig { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            CrmError::NotInitialized { what } => {
                format!("The database client could not start because {} is missing.", what)
            }
            CrmError::Remote { message, .. } => format!("The database rejected the request: {}", message),
            CrmError::Http(_) => "Could not reach the database service.".to_string(),
            CrmError::NotFound { id, .. } => format!("Record '{}' does not exist.", id),
            CrmError::EmptyImport => "There is nothing to import.".to_string(),
            CrmError::PartialWrite { step, .. } => format!(
                "The call was recorded, but {} failed. Check the customer record.",
                step
            ),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the [backend] section of the config file or SUPABASE_URL / SUPABASE_ANON_KEY"
            }
            ErrorCategory::Remote => "Check table names, column names and row-level security policies",
            ErrorCategory::Network => "Check network connectivity and the backend URL",
            ErrorCategory::Data => "Check the input file and the local cache file for corruption",
            ErrorCategory::Input => "Check the values passed to the command",
        }
    }
}

pub type Result<T> = std::result::Result<T, CrmError>;
