use crate::core::client::CrmClient;
use crate::domain::model::{ImportSummary, NewCustomer};
use crate::domain::ports::TableBackend;
use crate::utils::error::{CrmError, Result};
use std::path::Path;

impl<B: TableBackend> CrmClient<B> {
    /// Insert every entry that has both a company name and a phone in one
    /// bulk request. The rest are counted as skipped.
    pub async fn bulk_import(&self, customers: Vec<NewCustomer>) -> Result<ImportSummary> {
        let total = customers.len();
        let rows: Vec<_> = customers
            .iter()
            .filter(|c| c.is_importable())
            .map(NewCustomer::to_row)
            .collect();
        if rows.is_empty() {
            return Err(CrmError::EmptyImport);
        }

        let imported = rows.len();
        self.backend.insert_many(&self.tables.customers, rows).await?;
        tracing::info!("📥 Imported {} customers ({} skipped)", imported, total - imported);

        Ok(ImportSummary {
            imported,
            skipped: total - imported,
        })
    }
}

/// Read customers from a CSV file with camelCase headers
/// (`companyName,phone,contactName,...`). Missing columns become "".
pub fn read_import_csv<P: AsRef<Path>>(path: P) -> Result<Vec<NewCustomer>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let mut customers = Vec::new();
    for record in reader.deserialize() {
        let customer: NewCustomer = record?;
        customers.push(customer);
    }
    tracing::debug!("Read {} rows from import file", customers.len());
    Ok(customers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_import_csv_defaults_missing_columns() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "companyName,phone,businessId").unwrap();
        writeln!(file, "Acme, 03-1234-5678 ,biz-1").unwrap();
        writeln!(file, "NoPhone,,biz-1").unwrap();

        let customers = read_import_csv(file.path()).unwrap();
        assert_eq!(customers.len(), 2);
        assert_eq!(customers[0].company_name, "Acme");
        assert_eq!(customers[0].phone, "03-1234-5678");
        assert_eq!(customers[0].email, "");
        assert!(customers[0].is_importable());
        assert!(!customers[1].is_importable());
    }
}
