//! Duplicate detection over non-archived customers.
//!
//! A stored customer matches a candidate when the company names are equal or
//! the phone numbers are equal once hyphens and whitespace are stripped. The
//! scan is linear over every non-archived customer.

use crate::core::client::CrmClient;
use crate::domain::fields::CustomerField;
use crate::domain::model::{Customer, DuplicateCandidate, DuplicateReport, MatchType};
use crate::domain::ports::TableBackend;
use crate::domain::query::{IsValue, Query};
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};

/// How company names are compared.
///
/// `Exact` is byte-for-byte equality, so "Acme" and "acme " are different
/// companies. `Normalized` trims, collapses inner whitespace and lowercases
/// before comparing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameMatchPolicy {
    #[default]
    Exact,
    Normalized,
}

impl NameMatchPolicy {
    pub fn names_match(&self, candidate: &str, stored: &str) -> bool {
        if candidate.is_empty() || stored.is_empty() {
            return false;
        }
        match self {
            NameMatchPolicy::Exact => candidate == stored,
            NameMatchPolicy::Normalized => {
                let a = normalize_name(candidate);
                !a.is_empty() && a == normalize_name(stored)
            }
        }
    }
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Phone number with every hyphen and whitespace character removed.
pub fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect()
}

pub fn phones_match(candidate: &str, stored: &str) -> bool {
    let candidate = normalize_phone(candidate);
    !candidate.is_empty() && candidate == normalize_phone(stored)
}

/// Why `stored` duplicates the candidate, if it does.
pub fn classify(
    policy: NameMatchPolicy,
    company_name: &str,
    phone: &str,
    stored: &Customer,
) -> Option<MatchType> {
    let name = policy.names_match(company_name, &stored.company_name);
    let phone = phones_match(phone, &stored.phone);
    match (name, phone) {
        (true, true) => Some(MatchType::Both),
        (true, false) => Some(MatchType::Name),
        (false, true) => Some(MatchType::Phone),
        (false, false) => None,
    }
}

/// Split matches into the candidate's own business and every other one,
/// keeping scan order. Archived customers are skipped.
pub fn partition(
    policy: NameMatchPolicy,
    business_id: &str,
    company_name: &str,
    phone: &str,
    customers: &[Customer],
) -> DuplicateReport {
    let mut report = DuplicateReport::default();
    for customer in customers.iter().filter(|c| !c.is_archived) {
        let Some(match_type) = classify(policy, company_name, phone, customer) else {
            continue;
        };
        let candidate = DuplicateCandidate {
            id: customer.id.clone(),
            business_id: customer.business_id.clone(),
            company_name: customer.company_name.clone(),
            contact_name: customer.contact_name.clone(),
            phone: customer.phone.clone(),
            match_type,
        };
        if customer.business_id == business_id {
            report.same_business.push(candidate);
        } else {
            report.other_business.push(candidate);
        }
    }
    report
}

impl<B: TableBackend> CrmClient<B> {
    async fn active_customers(&self, exclude_id: Option<&str>) -> Result<Vec<Customer>> {
        let mut query = Query::table(&self.tables.customers)
            .not_is(CustomerField::IsArchived.column(), IsValue::True);
        if let Some(id) = exclude_id.filter(|id| !id.is_empty()) {
            query = query.neq(CustomerField::Id.column(), id);
        }
        let rows = self.backend.select(&query).await?;
        Ok(rows.iter().map(Customer::from_row).collect())
    }

    /// Duplicate summary for a prospective customer in `business_id`.
    pub async fn check_duplicates(
        &self,
        business_id: &str,
        company_name: &str,
        phone: &str,
    ) -> Result<DuplicateReport> {
        let customers = self.active_customers(None).await?;
        let report = partition(self.name_match, business_id, company_name, phone, &customers);
        tracing::debug!(
            "🔍 Duplicate scan over {} customers: {} same-business, {} other-business",
            customers.len(),
            report.same_business.len(),
            report.other_business.len()
        );
        Ok(report)
    }

    /// Full records in any business that duplicate the given name or phone,
    /// skipping `exclude_id` (the record being edited).
    pub async fn find_cross_business_duplicates(
        &self,
        company_name: &str,
        phone: &str,
        exclude_id: Option<&str>,
    ) -> Result<Vec<Customer>> {
        let customers = self.active_customers(exclude_id).await?;
        Ok(customers
            .into_iter()
            .filter(|c| classify(self.name_match, company_name, phone, c).is_some())
            .collect())
    }
}
