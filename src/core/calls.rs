use crate::core::client::{now_timestamp, CrmClient};
use crate::domain::fields::CustomerField;
use crate::domain::model::{CallRecord, NewCallRecord};
use crate::domain::ports::TableBackend;
use crate::domain::query::{Query, Row};
use crate::utils::error::{CrmError, Result, WriteStep};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallLogged {
    pub record: CallRecord,
    pub call_count: i64,
}

impl<B: TableBackend> CrmClient<B> {
    /// Log a call, then bump the customer's counter and optionally overwrite its tags.
    ///
    /// The three writes are independent round trips. If the counter or tag
    /// update fails the call row stays inserted and the error is a
    /// [`CrmError::PartialWrite`] naming the failed step.
    pub async fn add_call_record(&self, payload: NewCallRecord) -> Result<CallLogged> {
        if payload.customer_id.trim().is_empty() {
            return Err(CrmError::validation("A call record needs a customer id"));
        }
        let call_date = payload
            .call_date
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(now_timestamp);

        let inserted = self
            .backend
            .insert(&self.tables.call_history, vec![payload.to_row(&call_date)])
            .await
            .inspect_err(|e| tracing::error!("❌ Call record insert failed: {}", e))?;
        let record = inserted
            .first()
            .map(CallRecord::from_row)
            .ok_or_else(|| CrmError::remote("insert returned no rows"))?;
        tracing::info!(
            "📞 Call {} logged for customer {} ({})",
            record.id,
            payload.customer_id,
            record.result
        );

        let call_count = self
            .bump_call_count(&payload.customer_id, &call_date)
            .await
            .map_err(|e| partial(WriteStep::CallCount, e))?;

        if let Some(tags) = &payload.tags {
            self.update_customer_tags(&payload.customer_id, tags)
                .await
                .map_err(|e| partial(WriteStep::Tags, e))?;
        }

        Ok(CallLogged { record, call_count })
    }

    /// Read-then-write increment; not atomic against concurrent writers.
    async fn bump_call_count(&self, customer_id: &str, call_date: &str) -> Result<i64> {
        let query = Query::table(&self.tables.customers)
            .select(CustomerField::CallCount.column())
            .eq(CustomerField::Id.column(), customer_id);
        let current = self
            .backend
            .select_single(&query)
            .await
            .map_err(|e| self.not_found_or(e, customer_id))?;
        let count = crate::domain::fields::count(&current, CustomerField::CallCount.column()) + 1;

        let mut changes = Row::new();
        changes.insert(CustomerField::CallCount.column().to_string(), Value::from(count));
        changes.insert(
            CustomerField::LastCallDate.column().to_string(),
            Value::String(call_date.to_string()),
        );
        self.update_customer_row(customer_id, changes).await?;
        Ok(count)
    }

    pub async fn list_call_history(&self, customer_id: &str) -> Result<Vec<CallRecord>> {
        let rows = self
            .backend
            .select(&self.call_history_query(customer_id))
            .await?;
        Ok(rows.iter().map(CallRecord::from_row).collect())
    }
}

fn partial(step: WriteStep, source: CrmError) -> CrmError {
    tracing::error!("❌ Call record committed but {} failed: {}", step, source);
    CrmError::PartialWrite {
        step,
        source: Box::new(source),
    }
}
