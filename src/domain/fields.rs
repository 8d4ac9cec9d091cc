//! Mapping between the UI's camelCase records and the store's snake_case rows.
//!
//! Reads are lenient: a missing or oddly typed column becomes `""`, `0` or
//! `false`. Writes are strict: create rows carry every column, patches carry
//! only what was explicitly set.

use crate::domain::model::{CallRecord, Customer, NewCallRecord, NewCustomer};
use crate::domain::query::Row;
use crate::utils::error::{CrmError, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub mod call_columns {
    pub const ID: &str = "id";
    pub const CUSTOMER_ID: &str = "customer_id";
    pub const CALL_DATE: &str = "call_date";
    pub const RESULT: &str = "result";
    pub const DURATION: &str = "duration";
    pub const OPERATOR: &str = "operator";
    pub const MEMO: &str = "memo";
}

pub mod setting_columns {
    pub const KEY: &str = "key";
    pub const VALUE: &str = "value";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CustomerField {
    Id,
    BusinessId,
    CompanyName,
    ContactName,
    Department,
    Phone,
    Email,
    Address,
    Tags,
    CallCount,
    LastCallDate,
    Notes,
    IsArchived,
    ArchivedAt,
    CreatedAt,
    UpdatedAt,
}

impl CustomerField {
    pub const ALL: [CustomerField; 16] = [
        CustomerField::Id,
        CustomerField::BusinessId,
        CustomerField::CompanyName,
        CustomerField::ContactName,
        CustomerField::Department,
        CustomerField::Phone,
        CustomerField::Email,
        CustomerField::Address,
        CustomerField::Tags,
        CustomerField::CallCount,
        CustomerField::LastCallDate,
        CustomerField::Notes,
        CustomerField::IsArchived,
        CustomerField::ArchivedAt,
        CustomerField::CreatedAt,
        CustomerField::UpdatedAt,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            CustomerField::Id => "id",
            CustomerField::BusinessId => "business_id",
            CustomerField::CompanyName => "company_name",
            CustomerField::ContactName => "contact_name",
            CustomerField::Department => "department",
            CustomerField::Phone => "phone",
            CustomerField::Email => "email",
            CustomerField::Address => "address",
            CustomerField::Tags => "tags",
            CustomerField::CallCount => "call_count",
            CustomerField::LastCallDate => "last_call_date",
            CustomerField::Notes => "notes",
            CustomerField::IsArchived => "is_archived",
            CustomerField::ArchivedAt => "archived_at",
            CustomerField::CreatedAt => "created_at",
            CustomerField::UpdatedAt => "updated_at",
        }
    }

    pub fn external(&self) -> &'static str {
        match self {
            CustomerField::Id => "id",
            CustomerField::BusinessId => "businessId",
            CustomerField::CompanyName => "companyName",
            CustomerField::ContactName => "contactName",
            CustomerField::Department => "department",
            CustomerField::Phone => "phone",
            CustomerField::Email => "email",
            CustomerField::Address => "address",
            CustomerField::Tags => "tags",
            CustomerField::CallCount => "callCount",
            CustomerField::LastCallDate => "lastCallDate",
            CustomerField::Notes => "notes",
            CustomerField::IsArchived => "isArchived",
            CustomerField::ArchivedAt => "archivedAt",
            CustomerField::CreatedAt => "createdAt",
            CustomerField::UpdatedAt => "updatedAt",
        }
    }

    pub fn from_external(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.external() == name)
    }

    /// Fields a caller may change through an update. Counters, archive state
    /// and audit columns have dedicated operations.
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            CustomerField::CompanyName
                | CustomerField::ContactName
                | CustomerField::Department
                | CustomerField::Phone
                | CustomerField::Email
                | CustomerField::Address
                | CustomerField::Tags
                | CustomerField::Notes
        )
    }
}

/// Sparse set of column changes for a partial customer update.
///
/// Only fields that were explicitly set or cleared are written; everything
/// else is left untouched in storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerPatch {
    changes: BTreeMap<CustomerField, Value>,
}

impl CustomerPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: CustomerField, value: impl Into<String>) -> Result<Self> {
        Self::check_editable(field)?;
        self.changes.insert(field, Value::String(value.into()));
        Ok(self)
    }

    /// Write SQL null to the column.
    pub fn clear(mut self, field: CustomerField) -> Result<Self> {
        Self::check_editable(field)?;
        self.changes.insert(field, Value::Null);
        Ok(self)
    }

    /// Parse a camelCase payload. Keys that are present become changes;
    /// `null` clears the column.
    pub fn from_external(payload: &Map<String, Value>) -> Result<Self> {
        let mut patch = Self::new();
        for (key, value) in payload {
            let field = CustomerField::from_external(key)
                .ok_or_else(|| CrmError::validation(format!("Unknown customer field '{}'", key)))?;
            patch = match value {
                Value::String(s) => patch.set(field, s.clone())?,
                Value::Null => patch.clear(field)?,
                other => {
                    return Err(CrmError::validation(format!(
                        "Field '{}' expects a string, got {}",
                        key, other
                    )))
                }
            };
        }
        Ok(patch)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn to_row(&self) -> Row {
        self.changes
            .iter()
            .map(|(field, value)| (field.column().to_string(), value.clone()))
            .collect()
    }

    fn check_editable(field: CustomerField) -> Result<()> {
        if field.is_editable() {
            Ok(())
        } else {
            Err(CrmError::validation(format!(
                "Field '{}' cannot be changed through an update",
                field.external()
            )))
        }
    }
}

pub(crate) fn text(row: &Row, column: &str) -> String {
    match row.get(column) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(false)) => String::new(),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => String::new(),
        Some(other) => other.to_string(),
    }
}

pub(crate) fn count(row: &Row, column: &str) -> i64 {
    match row.get(column) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(|f| f as i64).unwrap_or(0),
        _ => 0,
    }
}

pub(crate) fn flag(row: &Row, column: &str) -> bool {
    match row.get(column) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
        _ => false,
    }
}

impl Customer {
    pub fn from_row(row: &Row) -> Self {
        use CustomerField as F;
        Self {
            id: text(row, F::Id.column()),
            business_id: text(row, F::BusinessId.column()),
            company_name: text(row, F::CompanyName.column()),
            contact_name: text(row, F::ContactName.column()),
            department: text(row, F::Department.column()),
            phone: text(row, F::Phone.column()),
            email: text(row, F::Email.column()),
            address: text(row, F::Address.column()),
            tags: text(row, F::Tags.column()),
            call_count: count(row, F::CallCount.column()),
            last_call_date: text(row, F::LastCallDate.column()),
            notes: text(row, F::Notes.column()),
            is_archived: flag(row, F::IsArchived.column()),
            archived_at: text(row, F::ArchivedAt.column()),
            created_at: text(row, F::CreatedAt.column()),
            updated_at: text(row, F::UpdatedAt.column()),
        }
    }
}

impl CallRecord {
    pub fn from_row(row: &Row) -> Self {
        use call_columns as C;
        Self {
            id: text(row, C::ID),
            customer_id: text(row, C::CUSTOMER_ID),
            call_date: text(row, C::CALL_DATE),
            result: text(row, C::RESULT),
            duration: text(row, C::DURATION),
            operator: text(row, C::OPERATOR),
            memo: text(row, C::MEMO),
        }
    }
}

#[derive(Serialize)]
struct CustomerInsertRow<'a> {
    business_id: &'a str,
    company_name: &'a str,
    contact_name: &'a str,
    department: &'a str,
    phone: &'a str,
    email: &'a str,
    address: &'a str,
    tags: &'a str,
    call_count: i64,
    notes: &'a str,
    is_archived: bool,
}

impl NewCustomer {
    /// Create row: every column written, new customers start unarchived with no calls.
    pub fn to_row(&self) -> Row {
        let row = CustomerInsertRow {
            business_id: &self.business_id,
            company_name: &self.company_name,
            contact_name: &self.contact_name,
            department: &self.department,
            phone: &self.phone,
            email: &self.email,
            address: &self.address,
            tags: &self.tags,
            call_count: 0,
            notes: &self.notes,
            is_archived: false,
        };
        match serde_json::to_value(row) {
            Ok(Value::Object(map)) => map,
            _ => Row::new(),
        }
    }
}

impl NewCallRecord {
    pub fn to_row(&self, call_date: &str) -> Row {
        use call_columns as C;
        let mut row = Row::new();
        row.insert(C::CUSTOMER_ID.into(), Value::String(self.customer_id.clone()));
        row.insert(C::CALL_DATE.into(), Value::String(call_date.to_string()));
        row.insert(C::RESULT.into(), Value::String(self.result.clone()));
        row.insert(C::DURATION.into(), Value::String(self.duration.clone()));
        row.insert(C::OPERATOR.into(), Value::String(self.operator.clone()));
        row.insert(C::MEMO.into(), Value::String(self.memo.clone()));
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_customer_from_row_coerces_missing_and_odd_values() {
        let customer = Customer::from_row(&row(json!({
            "id": 42,
            "company_name": "Acme",
            "phone": null,
            "call_count": "3",
            "is_archived": null,
        })));

        assert_eq!(customer.id, "42");
        assert_eq!(customer.company_name, "Acme");
        assert_eq!(customer.phone, "");
        assert_eq!(customer.email, "");
        assert_eq!(customer.call_count, 3);
        assert!(!customer.is_archived);
        assert_eq!(customer.archived_at, "");
    }

    #[test]
    fn test_call_count_defaults_to_zero_for_garbage() {
        let customer = Customer::from_row(&row(json!({"call_count": "many"})));
        assert_eq!(customer.call_count, 0);
        let customer = Customer::from_row(&row(json!({"call_count": {"n": 1}})));
        assert_eq!(customer.call_count, 0);
    }

    #[test]
    fn test_new_customer_row_writes_every_column() {
        let new = NewCustomer {
            company_name: "Acme".to_string(),
            phone: "03-1234-5678".to_string(),
            ..Default::default()
        };
        let row = new.to_row();

        assert_eq!(row.get("company_name"), Some(&json!("Acme")));
        assert_eq!(row.get("contact_name"), Some(&json!("")));
        assert_eq!(row.get("business_id"), Some(&json!("")));
        assert_eq!(row.get("notes"), Some(&json!("")));
        assert_eq!(row.get("call_count"), Some(&json!(0)));
        assert_eq!(row.get("is_archived"), Some(&json!(false)));
        assert!(!row.contains_key("id"));
    }

    #[test]
    fn test_new_customer_deserializes_absent_fields_as_empty() {
        let new: NewCustomer = serde_json::from_value(json!({"companyName": "Acme"})).unwrap();
        assert_eq!(new.company_name, "Acme");
        assert_eq!(new.phone, "");
        assert!(!new.is_importable());
    }

    #[test]
    fn test_patch_only_contains_present_fields() {
        let patch = CustomerPatch::from_external(&row(json!({
            "phone": "090-0000-0000",
            "notes": null,
        })))
        .unwrap();

        let out = patch.to_row();
        assert_eq!(out.len(), 2);
        assert_eq!(out.get("phone"), Some(&json!("090-0000-0000")));
        assert_eq!(out.get("notes"), Some(&Value::Null));
        assert!(!out.contains_key("company_name"));
    }

    #[test]
    fn test_patch_rejects_unknown_and_read_only_fields() {
        assert!(CustomerPatch::from_external(&row(json!({"nickname": "x"}))).is_err());
        assert!(CustomerPatch::from_external(&row(json!({"callCount": "9"}))).is_err());
        assert!(CustomerPatch::from_external(&row(json!({"phone": 123}))).is_err());
        assert!(CustomerPatch::new().set(CustomerField::IsArchived, "true").is_err());
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in CustomerField::ALL {
            assert_eq!(CustomerField::from_external(field.external()), Some(field));
        }
    }

    #[test]
    fn test_call_record_row_uses_given_date() {
        let new = NewCallRecord {
            customer_id: "7".to_string(),
            result: "connected".to_string(),
            ..Default::default()
        };
        let out = new.to_row("2026-01-01T00:00:00Z");
        assert_eq!(out.get("call_date"), Some(&json!("2026-01-01T00:00:00Z")));
        assert_eq!(out.get("memo"), Some(&json!("")));
        assert!(!out.contains_key("tags"));
    }
}
