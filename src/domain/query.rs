use serde_json::{Map, Value};

/// One table row as the store sees it: snake_case column -> JSON value.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsValue {
    Null,
    True,
    False,
}

impl IsValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            IsValue::Null => "null",
            IsValue::True => "true",
            IsValue::False => "false",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, String),
    Neq(String, String),
    Is(String, IsValue),
    NotIs(String, IsValue),
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(column, _)
            | Filter::Neq(column, _)
            | Filter::Is(column, _)
            | Filter::NotIs(column, _) => column,
        }
    }

    /// PostgREST operator expression, e.g. `eq.42` or `not.is.true`.
    pub fn expression(&self) -> String {
        match self {
            Filter::Eq(_, value) => format!("eq.{}", value),
            Filter::Neq(_, value) => format!("neq.{}", value),
            Filter::Is(_, value) => format!("is.{}", value.as_str()),
            Filter::NotIs(_, value) => format!("not.is.{}", value.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A table read/write target: which table, which rows, in what order.
///
/// Built fluently and handed to a [`TableBackend`](crate::domain::ports::TableBackend),
/// which decides how to evaluate it (HTTP query string, in-memory scan).
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Query {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            table: name.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push(Filter::Eq(column.into(), value.to_string()));
        self
    }

    pub fn neq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push(Filter::Neq(column.into(), value.to_string()));
        self
    }

    pub fn is(mut self, column: impl Into<String>, value: IsValue) -> Self {
        self.filters.push(Filter::Is(column.into(), value));
        self
    }

    pub fn not_is(mut self, column: impl Into<String>, value: IsValue) -> Self {
        self.filters.push(Filter::NotIs(column.into(), value));
        self
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order.push(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, count: usize) -> Self {
        self.limit = Some(count);
        self
    }

    /// Inclusive row range, zero based. `to < from` selects nothing.
    pub fn range(mut self, from: usize, to: usize) -> Self {
        self.offset = Some(from);
        self.limit = Some(if to < from { 0 } else { to - from + 1 });
        self
    }

    /// Query-string pairs for the filter, order and range parts.
    pub fn filter_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .filters
            .iter()
            .map(|f| (f.column().to_string(), f.expression()))
            .collect();

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| {
                    format!(
                        "{}.{}",
                        o.column,
                        if o.ascending { "asc" } else { "desc" }
                    )
                })
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        pairs
    }

    /// Full pairs for a read, `select` first.
    pub fn select_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.columns.clone())];
        pairs.extend(self.filter_pairs());
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_pairs_encode_filters_order_and_range() {
        let query = Query::table("customers")
            .eq("business_id", "biz-1")
            .not_is("is_archived", IsValue::True)
            .order("updated_at", false)
            .range(10, 19);

        assert_eq!(
            query.select_pairs(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("business_id".to_string(), "eq.biz-1".to_string()),
                ("is_archived".to_string(), "not.is.true".to_string()),
                ("order".to_string(), "updated_at.desc".to_string()),
                ("limit".to_string(), "10".to_string()),
                ("offset".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let query = Query::table("call_history").range(5, 4);
        assert_eq!(query.limit, Some(0));
        assert_eq!(query.offset, Some(5));

        let single = Query::table("call_history").range(5, 5);
        assert_eq!(single.limit, Some(1));
    }

    #[test]
    fn test_filter_pairs_skip_select() {
        let query = Query::table("customers").select("call_count").eq("id", 7);
        assert_eq!(
            query.filter_pairs(),
            vec![("id".to_string(), "eq.7".to_string())]
        );
    }

    #[test]
    fn test_multiple_orders_are_joined() {
        let query = Query::table("call_history")
            .order("call_date", false)
            .order("id", true);
        let pairs = query.filter_pairs();
        assert_eq!(pairs[0], ("order".to_string(), "call_date.desc,id.asc".to_string()));
    }
}
