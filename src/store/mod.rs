//! Remote store client.
//!
//! A table-scoped read/insert/delete/upsert interface over the per-user relation
//! tables. Two backends implement it: the local SQLite repository in
//! [`crate::db`] and the PostgREST-style HTTP client in [`rest`].

pub mod rest;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::AppError;

/// A row as exchanged with the store: column name to JSON value.
pub type Row = Map<String, Value>;

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
}

/// The tables the client reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Favorites,
    Ratings,
    Comments,
    UserReads,
    Profiles,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Favorites => "favorites",
            Table::Ratings => "ratings",
            Table::Comments => "comments",
            Table::UserReads => "user_reads",
            Table::Profiles => "profiles",
        }
    }

    /// Every column with its storage class.
    pub fn columns(&self) -> &'static [(&'static str, ColumnKind)] {
        use ColumnKind::*;
        match self {
            Table::Favorites => &[
                ("id", Integer),
                ("user_id", Text),
                ("work_id", Text),
                ("work_title", Text),
                ("work_cover", Text),
                ("created_at", Text),
            ],
            Table::Ratings => &[
                ("id", Integer),
                ("user_id", Text),
                ("work_id", Text),
                ("rating", Integer),
                ("created_at", Text),
                ("updated_at", Text),
            ],
            Table::Comments => &[
                ("id", Integer),
                ("work_id", Text),
                ("user_id", Text),
                ("body", Text),
                ("created_at", Text),
            ],
            Table::UserReads => &[
                ("id", Integer),
                ("user_id", Text),
                ("work_id", Text),
                ("chapter_id", Integer),
                ("chapter_number", Real),
                ("chapter_title", Text),
                ("work_title", Text),
                ("work_cover", Text),
                ("read_at", Text),
            ],
            Table::Profiles => &[
                ("user_id", Text),
                ("username", Text),
                ("full_name", Text),
                ("avatar_url", Text),
            ],
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns().iter().any(|(name, _)| *name == column)
    }

    /// Reject column names the table does not define.
    pub fn check_column(&self, column: &str) -> Result<(), AppError> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "Unknown column {}.{}",
                self.name(),
                column
            )))
        }
    }
}

/// A row predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn is_in<V: Into<Value>>(column: &str, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(column, _) | Filter::In(column, _) => column,
        }
    }
}

/// Result ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

/// A select against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn from(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn is_in<V: Into<Value>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.filters.push(Filter::is_in(column, values));
        self
    }

    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            descending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check every referenced column against the table.
    pub fn validate(&self) -> Result<(), AppError> {
        for filter in &self.filters {
            self.table.check_column(filter.column())?;
        }
        if let Some(order) = &self.order {
            self.table.check_column(&order.column)?;
        }
        Ok(())
    }
}

/// Table-scoped access to the remote relation store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, AppError>;

    async fn insert(&self, table: Table, row: Row) -> Result<(), AppError>;

    /// Delete matching rows and return how many went away.
    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<u64, AppError>;

    /// Insert, or update the row that collides on `conflict` columns.
    async fn upsert(&self, table: Table, row: Row, conflict: &[&str]) -> Result<(), AppError>;
}

/// Serialize a record into a row.
pub fn to_row<T: Serialize>(record: &T) -> Result<Row, AppError> {
    match serde_json::to_value(record)? {
        Value::Object(row) => Ok(row),
        other => Err(AppError::Internal(format!(
            "Expected a JSON object row, got {}",
            other
        ))),
    }
}

/// Deserialize rows into records.
pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, AppError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(Value::Object(row)).map_err(AppError::from))
        .collect()
}

/// Run a select and deserialize the result.
pub async fn select_as<T: DeserializeOwned>(
    store: &dyn RemoteStore,
    query: &Query,
) -> Result<Vec<T>, AppError> {
    from_rows(store.select(query).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FavoriteRow;
    use serde_json::json;

    #[test]
    fn test_to_row_omits_unset_ids() {
        let row = to_row(&FavoriteRow {
            id: None,
            user_id: "u1".to_string(),
            work_id: "me-escolhe".to_string(),
            work_title: "Me Escolhe".to_string(),
            work_cover: String::new(),
            created_at: None,
        })
        .unwrap();
        assert!(!row.contains_key("id"));
        assert!(!row.contains_key("created_at"));
        assert_eq!(row["work_id"], json!("me-escolhe"));
    }

    #[test]
    fn test_to_row_rejects_scalars() {
        assert!(to_row(&5).is_err());
    }

    #[test]
    fn test_query_validation() {
        let ok = Query::from(Table::Ratings)
            .eq("work_id", "a")
            .order_by("created_at", true);
        assert!(ok.validate().is_ok());

        let bad = Query::from(Table::Ratings).eq("rating; DROP TABLE ratings", 1);
        assert_eq!(bad.validate().unwrap_err().error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_in_filter_collects_values() {
        let filter = Filter::is_in("work_id", ["a", "b"]);
        assert_eq!(filter, Filter::In("work_id".to_string(), vec![json!("a"), json!("b")]));
    }
}
