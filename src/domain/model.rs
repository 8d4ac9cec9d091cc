use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub business_id: String,
    pub company_name: String,
    pub contact_name: String,
    pub department: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub tags: String,
    pub call_count: i64,
    pub last_call_date: String,
    pub notes: String,
    pub is_archived: bool,
    pub archived_at: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub id: String,
    pub customer_id: String,
    pub call_date: String,
    pub result: String,
    pub duration: String,
    pub operator: String,
    pub memo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetail {
    pub customer: Customer,
    pub call_history: Vec<CallRecord>,
}

/// Create payload. Absent fields deserialize to "".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewCustomer {
    pub business_id: String,
    pub company_name: String,
    pub contact_name: String,
    pub department: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub tags: String,
    pub notes: String,
}

impl NewCustomer {
    /// Bulk import only accepts rows that carry both a company name and a phone.
    pub fn is_importable(&self) -> bool {
        !self.company_name.is_empty() && !self.phone.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCallRecord {
    pub customer_id: String,
    #[serde(default)]
    pub call_date: Option<String>,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub memo: String,
    /// When present, overwrites the customer's tags after the call is logged.
    #[serde(default)]
    pub tags: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Both,
    Name,
    Phone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCandidate {
    pub id: String,
    pub business_id: String,
    pub company_name: String,
    pub contact_name: String,
    pub phone: String,
    pub match_type: MatchType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateReport {
    pub same_business: Vec<DuplicateCandidate>,
    pub other_business: Vec<DuplicateCandidate>,
}

impl DuplicateReport {
    pub fn is_empty(&self) -> bool {
        self.same_business.is_empty() && self.other_business.is_empty()
    }
}
