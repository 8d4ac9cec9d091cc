use crate::core::client::{now_timestamp, CrmClient};
use crate::domain::fields::{call_columns, setting_columns, CustomerField, CustomerPatch};
use crate::domain::model::{CallRecord, Customer, CustomerDetail, NewCustomer};
use crate::domain::ports::TableBackend;
use crate::domain::query::{IsValue, Query, Row};
use crate::utils::error::{CrmError, Result};
use serde_json::Value;

impl<B: TableBackend> CrmClient<B> {
    /// Cheapest possible round trip: one key from the settings table.
    pub async fn ping(&self) -> Result<()> {
        let query = Query::table(&self.tables.app_settings)
            .select(setting_columns::KEY)
            .limit(1);
        self.backend.select(&query).await?;
        Ok(())
    }

    /// Non-archived customers, most recently updated first.
    pub async fn list_customers(&self, business_id: Option<&str>) -> Result<Vec<Customer>> {
        let mut query = Query::table(&self.tables.customers)
            .not_is(CustomerField::IsArchived.column(), IsValue::True)
            .order(CustomerField::UpdatedAt.column(), false);
        if let Some(business_id) = business_id.filter(|b| !b.is_empty()) {
            query = query.eq(CustomerField::BusinessId.column(), business_id);
        }

        let rows = self.backend.select(&query).await?;
        Ok(rows.iter().map(Customer::from_row).collect())
    }

    /// Archived customers, most recently archived first.
    pub async fn list_archived_customers(
        &self,
        business_id: Option<&str>,
    ) -> Result<Vec<Customer>> {
        let mut query = Query::table(&self.tables.customers)
            .is(CustomerField::IsArchived.column(), IsValue::True)
            .order(CustomerField::ArchivedAt.column(), false);
        if let Some(business_id) = business_id.filter(|b| !b.is_empty()) {
            query = query.eq(CustomerField::BusinessId.column(), business_id);
        }

        let rows = self.backend.select(&query).await?;
        Ok(rows.iter().map(Customer::from_row).collect())
    }

    /// Customer plus call history, fetched concurrently.
    ///
    /// A failed history read degrades to an empty history; a failed customer
    /// read is an error.
    pub async fn get_customer(&self, id: &str) -> Result<CustomerDetail> {
        let customer_query = Query::table(&self.tables.customers).eq(CustomerField::Id.column(), id);
        let history_query = self.call_history_query(id);

        let (customer, history) = tokio::join!(
            self.backend.select_single(&customer_query),
            self.backend.select(&history_query)
        );

        let customer = customer.map_err(|e| self.not_found_or(e, id))?;
        let call_history = match history {
            Ok(rows) => rows.iter().map(CallRecord::from_row).collect(),
            Err(e) => {
                tracing::warn!("⚠️ Call history for customer {} unavailable: {}", id, e);
                Vec::new()
            }
        };

        Ok(CustomerDetail {
            customer: Customer::from_row(&customer),
            call_history,
        })
    }

    pub async fn add_customer(&self, payload: NewCustomer) -> Result<Customer> {
        let row = payload.to_row();
        tracing::debug!("INSERT customer row: {:?}", row);

        let inserted = self
            .backend
            .insert(&self.tables.customers, vec![row])
            .await
            .inspect_err(|e| tracing::error!("❌ Customer insert failed: {}", e))?;

        let customer = inserted
            .first()
            .map(Customer::from_row)
            .ok_or_else(|| CrmError::remote("insert returned no rows"))?;
        tracing::info!("✅ Customer {} created", customer.id);
        Ok(customer)
    }

    /// Partial update: only the fields present in `patch` are written.
    pub async fn update_customer(&self, id: &str, patch: &CustomerPatch) -> Result<()> {
        if patch.is_empty() {
            tracing::debug!("Empty patch for customer {}, nothing to write", id);
            return Ok(());
        }
        self.update_customer_row(id, patch.to_row()).await?;
        tracing::info!("✅ Customer {} updated ({} fields)", id, patch.len());
        Ok(())
    }

    pub async fn update_customer_tags(&self, id: &str, tags: &str) -> Result<()> {
        let mut changes = Row::new();
        changes.insert(
            CustomerField::Tags.column().to_string(),
            Value::String(tags.to_string()),
        );
        self.update_customer_row(id, changes).await
    }

    pub async fn delete_customer(&self, id: &str) -> Result<()> {
        let query = Query::table(&self.tables.customers).eq(CustomerField::Id.column(), id);
        self.backend.delete(&query).await?;
        tracing::info!("🗑️ Customer {} deleted", id);
        Ok(())
    }

    pub async fn archive_customer(&self, id: &str) -> Result<()> {
        let mut changes = Row::new();
        changes.insert(CustomerField::IsArchived.column().to_string(), Value::Bool(true));
        changes.insert(
            CustomerField::ArchivedAt.column().to_string(),
            Value::String(now_timestamp()),
        );
        self.update_customer_row(id, changes).await?;
        tracing::info!("📦 Customer {} archived", id);
        Ok(())
    }

    /// Clears both the archive flag and its timestamp.
    pub async fn restore_customer(&self, id: &str) -> Result<()> {
        let mut changes = Row::new();
        changes.insert(CustomerField::IsArchived.column().to_string(), Value::Bool(false));
        changes.insert(CustomerField::ArchivedAt.column().to_string(), Value::Null);
        self.update_customer_row(id, changes).await?;
        tracing::info!("📤 Customer {} restored", id);
        Ok(())
    }

    pub(crate) async fn update_customer_row(&self, id: &str, changes: Row) -> Result<()> {
        let query = Query::table(&self.tables.customers).eq(CustomerField::Id.column(), id);
        self.backend.update(&query, changes).await
    }

    pub(crate) fn call_history_query(&self, customer_id: &str) -> Query {
        Query::table(&self.tables.call_history)
            .eq(call_columns::CUSTOMER_ID, customer_id)
            .order(call_columns::CALL_DATE, false)
    }

    /// PostgREST answers a single-row read of a missing id with PGRST116.
    pub(crate) fn not_found_or(&self, error: CrmError, id: &str) -> CrmError {
        match &error {
            CrmError::Remote { code: Some(code), .. } if code == "PGRST116" => CrmError::NotFound {
                table: self.tables.customers.clone(),
                id: id.to_string(),
            },
            _ => error,
        }
    }
}
