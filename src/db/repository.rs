//! SQLite implementation of the remote store.
//!
//! Statements are assembled per call from validated column names with every value
//! bound as a parameter.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row as _, Sqlite, SqlitePool};

use crate::errors::AppError;
use crate::store::{ColumnKind, Filter, Query, RemoteStore, Row, Table};

/// Database repository for the relation tables.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn check_row(table: Table, row: &Row) -> Result<(), AppError> {
        if row.is_empty() {
            return Err(AppError::Validation(format!(
                "Empty row for {}",
                table.name()
            )));
        }
        for column in row.keys() {
            table.check_column(column)?;
        }
        Ok(())
    }

    /// `INSERT INTO t (cols) VALUES (...)` without a trailing clause.
    fn insert_statement(table: Table, row: &Row) -> QueryBuilder<'static, Sqlite> {
        let columns: Vec<&str> = row.keys().map(String::as_str).collect();
        let mut builder = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            table.name(),
            columns.join(", ")
        ));
        for (i, value) in row.values().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            push_value(&mut builder, value);
        }
        builder.push(")");
        builder
    }
}

#[async_trait]
impl RemoteStore for Repository {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, AppError> {
        query.validate()?;

        let mut builder = QueryBuilder::new(format!("SELECT * FROM {}", query.table.name()));
        push_filters(&mut builder, &query.filters);
        if let Some(order) = &query.order {
            builder.push(format!(
                " ORDER BY {} {}",
                order.column,
                if order.descending { "DESC" } else { "ASC" }
            ));
        }
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit as i64);
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| row_to_json(query.table, row))
            .collect()
    }

    async fn insert(&self, table: Table, row: Row) -> Result<(), AppError> {
        Self::check_row(table, &row)?;
        Self::insert_statement(table, &row)
            .build()
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<u64, AppError> {
        if filters.is_empty() {
            return Err(AppError::Validation(format!(
                "Refusing to delete every row of {}",
                table.name()
            )));
        }
        for filter in filters {
            table.check_column(filter.column())?;
        }

        let mut builder = QueryBuilder::new(format!("DELETE FROM {}", table.name()));
        push_filters(&mut builder, filters);
        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn upsert(&self, table: Table, row: Row, conflict: &[&str]) -> Result<(), AppError> {
        Self::check_row(table, &row)?;
        if conflict.is_empty() {
            return Err(AppError::Validation("Upsert needs conflict columns".to_string()));
        }
        for column in conflict {
            table.check_column(column)?;
        }

        let updates: Vec<String> = row
            .keys()
            .filter(|column| !conflict.contains(&column.as_str()))
            .map(|column| format!("{} = excluded.{}", column, column))
            .collect();

        let mut builder = Self::insert_statement(table, &row);
        builder.push(format!(" ON CONFLICT({}) ", conflict.join(", ")));
        if updates.is_empty() {
            builder.push("DO NOTHING");
        } else {
            builder.push(format!("DO UPDATE SET {}", updates.join(", ")));
        }
        builder.build().execute(&self.pool).await?;
        Ok(())
    }
}

// Helper functions for statement assembly and row conversion

fn push_filters(builder: &mut QueryBuilder<'static, Sqlite>, filters: &[Filter]) {
    for (i, filter) in filters.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        match filter {
            Filter::Eq(column, value) => {
                builder.push(format!("{} = ", column));
                push_value(builder, value);
            }
            Filter::In(_, values) if values.is_empty() => {
                builder.push("0 = 1");
            }
            Filter::In(column, values) => {
                builder.push(format!("{} IN (", column));
                for (j, value) in values.iter().enumerate() {
                    if j > 0 {
                        builder.push(", ");
                    }
                    push_value(builder, value);
                }
                builder.push(")");
            }
        }
    }
}

fn push_value(builder: &mut QueryBuilder<'static, Sqlite>, value: &Value) {
    match value {
        Value::Null => {
            builder.push_bind(None::<String>);
        }
        Value::Bool(b) => {
            builder.push_bind(*b as i64);
        }
        Value::Number(n) => match n.as_i64() {
            Some(i) => {
                builder.push_bind(i);
            }
            None => {
                builder.push_bind(n.as_f64().unwrap_or_default());
            }
        },
        Value::String(s) => {
            builder.push_bind(s.clone());
        }
        other => {
            builder.push_bind(other.to_string());
        }
    }
}

/// Convert a row to JSON, leaving out NULL columns.
fn row_to_json(table: Table, row: &SqliteRow) -> Result<Row, AppError> {
    let mut out = Row::new();
    for (column, kind) in table.columns() {
        let value = match kind {
            ColumnKind::Text => row.try_get::<Option<String>, _>(*column)?.map(Value::String),
            ColumnKind::Integer => row.try_get::<Option<i64>, _>(*column)?.map(Value::from),
            ColumnKind::Real => row.try_get::<Option<f64>, _>(*column)?.map(Value::from),
        };
        if let Some(value) = value {
            out.insert(column.to_string(), value);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::models::{ProfileRow, RatingRow};
    use crate::store::{from_rows, to_row};
    use serde_json::json;
    use tempfile::TempDir;

    async fn repo() -> (Repository, TempDir) {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("test.sqlite")).await.unwrap();
        (Repository::new(pool), dir)
    }

    fn rating(user: &str, work: &str, value: u8) -> Row {
        to_row(&RatingRow {
            id: None,
            user_id: user.to_string(),
            work_id: work.to_string(),
            rating: value,
            created_at: None,
            updated_at: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_select_fill_defaults() {
        let (repo, _dir) = repo().await;
        repo.insert(Table::Ratings, rating("u1", "a", 4)).await.unwrap();

        let rows = repo
            .select(&Query::from(Table::Ratings).eq("work_id", "a"))
            .await
            .unwrap();
        let ratings: Vec<RatingRow> = from_rows(rows).unwrap();
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].rating, 4);
        assert!(ratings[0].id.is_some());
        assert!(ratings[0].created_at.is_some());
    }

    #[tokio::test]
    async fn test_upsert_updates_on_conflict() {
        let (repo, _dir) = repo().await;
        let conflict = ["user_id", "work_id"];
        repo.upsert(Table::Ratings, rating("u1", "a", 4), &conflict)
            .await
            .unwrap();
        repo.upsert(Table::Ratings, rating("u1", "a", 2), &conflict)
            .await
            .unwrap();

        let rows = repo.select(&Query::from(Table::Ratings)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["rating"], json!(2));
    }

    #[tokio::test]
    async fn test_in_filter_order_and_limit() {
        let (repo, _dir) = repo().await;
        repo.insert(Table::Ratings, rating("u1", "a", 1)).await.unwrap();
        repo.insert(Table::Ratings, rating("u2", "b", 5)).await.unwrap();
        repo.insert(Table::Ratings, rating("u3", "c", 3)).await.unwrap();

        let query = Query::from(Table::Ratings)
            .is_in("work_id", ["a", "b"])
            .order_by("rating", true)
            .limit(1);
        let rows = repo.select(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["work_id"], json!("b"));

        let none = repo
            .select(&Query::from(Table::Ratings).is_in("work_id", Vec::<String>::new()))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_delete_counts_rows() {
        let (repo, _dir) = repo().await;
        repo.insert(Table::Ratings, rating("u1", "a", 1)).await.unwrap();

        let deleted = repo
            .delete(
                Table::Ratings,
                &[Filter::eq("user_id", "u1"), Filter::eq("work_id", "a")],
            )
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        let err = repo.delete(Table::Ratings, &[]).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_null_columns_are_omitted() {
        let (repo, _dir) = repo().await;
        let profile = ProfileRow {
            user_id: "u1".to_string(),
            username: "reader".to_string(),
            full_name: None,
            avatar_url: None,
        };
        repo.insert(Table::Profiles, to_row(&profile).unwrap())
            .await
            .unwrap();

        let rows = repo.select(&Query::from(Table::Profiles)).await.unwrap();
        assert!(!rows[0].contains_key("full_name"));
        let profiles: Vec<ProfileRow> = from_rows(rows).unwrap();
        assert_eq!(profiles[0], profile);
    }

    #[tokio::test]
    async fn test_unknown_column_is_rejected() {
        let (repo, _dir) = repo().await;
        let mut row = rating("u1", "a", 1);
        row.insert("1=1; --".to_string(), json!(0));
        let err = repo.insert(Table::Ratings, row).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }
}
