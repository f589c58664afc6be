//! PostgREST-style HTTP backend for the remote store.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;

use super::{Filter, Query, RemoteStore, Row, Table};
use crate::auth::SessionHub;
use crate::errors::AppError;

/// Remote store reached over HTTP.
#[derive(Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
    session: SessionHub,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str, session: SessionHub) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!("webtoon-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            session,
        })
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    /// Attach the API key and the caller's bearer token.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .session
            .current()
            .and_then(|user| user.access_token)
            .unwrap_or_else(|| self.api_key.clone());
        request.header("apikey", &self.api_key).bearer_auth(token)
    }

    async fn send(&self, table: Table, request: RequestBuilder) -> Result<Vec<Row>, AppError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Store request on {} failed with {}: {}", table.name(), status, body);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    AppError::Unauthorized(format!("{} rejected the session", table.name()))
                }
                _ => AppError::Store(format!("{} on {}: {}", status, table.name(), body)),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Render a filter value the way the query string expects it.
fn filter_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Query-string pairs expressing `filters`.
pub fn filter_pairs(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| match filter {
            Filter::Eq(column, value) => (column.clone(), format!("eq.{}", filter_value(value))),
            Filter::In(column, values) => {
                let quoted: Vec<String> = values
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => format!("\"{}\"", s.replace('"', "\\\"")),
                        other => other.to_string(),
                    })
                    .collect();
                (column.clone(), format!("in.({})", quoted.join(",")))
            }
        })
        .collect()
}

/// Query-string pairs for a full select.
pub fn select_pairs(query: &Query) -> Vec<(String, String)> {
    let mut pairs = vec![("select".to_string(), "*".to_string())];
    pairs.extend(filter_pairs(&query.filters));
    if let Some(order) = &query.order {
        let direction = if order.descending { "desc" } else { "asc" };
        pairs.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    if let Some(limit) = query.limit {
        pairs.push(("limit".to_string(), limit.to_string()));
    }
    pairs
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, AppError> {
        query.validate()?;
        let request = self
            .client
            .get(self.table_url(query.table))
            .query(&select_pairs(query));
        self.send(query.table, request).await
    }

    async fn insert(&self, table: Table, row: Row) -> Result<(), AppError> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(&[row]);
        self.send(table, request).await.map(|_| ())
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<u64, AppError> {
        for filter in filters {
            table.check_column(filter.column())?;
        }
        let request = self
            .client
            .delete(self.table_url(table))
            .header("Prefer", "return=representation")
            .query(&filter_pairs(filters));
        Ok(self.send(table, request).await?.len() as u64)
    }

    async fn upsert(&self, table: Table, row: Row, conflict: &[&str]) -> Result<(), AppError> {
        for column in conflict {
            table.check_column(column)?;
        }
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .query(&[("on_conflict", conflict.join(","))])
            .json(&[row]);
        self.send(table, request).await.map(|_| ())
    }
}
