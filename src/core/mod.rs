pub mod calls;
pub mod client;
pub mod customers;
pub mod duplicates;
pub mod import;
pub mod settings;

pub use crate::domain::model::{
    CallRecord, Customer, CustomerDetail, DuplicateCandidate, DuplicateReport, ImportSummary,
    MatchType, NewCallRecord, NewCustomer,
};
pub use crate::domain::ports::{SettingsCache, TableBackend};
pub use crate::utils::error::Result;
