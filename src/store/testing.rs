//! Store wrappers for exercising failure and ordering in tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use super::{Filter, Query, RemoteStore, Row, Table};
use crate::errors::AppError;

/// Wraps a store, counting writes and optionally failing or holding them.
pub struct ScriptedStore {
    inner: Arc<dyn RemoteStore>,
    fail_writes: AtomicBool,
    /// When set, every write waits for a permit
    gate: Option<Semaphore>,
    writes: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedStore {
    pub fn new(inner: Arc<dyn RemoteStore>) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
            gate: None,
            writes: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Hold every write until [`release`](Self::release) hands out permits.
    pub fn gated(inner: Arc<dyn RemoteStore>) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(inner)
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn begin_write(&self) -> Result<(), AppError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?
                .forget();
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(AppError::Store("scripted failure".to_string()));
        }
        Ok(())
    }

    fn end_write(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteStore for ScriptedStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, AppError> {
        self.inner.select(query).await
    }

    async fn insert(&self, table: Table, row: Row) -> Result<(), AppError> {
        self.begin_write().await?;
        let result = self.inner.insert(table, row).await;
        self.end_write();
        result
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<u64, AppError> {
        self.begin_write().await?;
        let result = self.inner.delete(table, filters).await;
        self.end_write();
        result
    }

    async fn upsert(&self, table: Table, row: Row, conflict: &[&str]) -> Result<(), AppError> {
        self.begin_write().await?;
        let result = self.inner.upsert(table, row, conflict).await;
        self.end_write();
        result
    }
}
