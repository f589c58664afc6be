//! Optimistic values with one write in flight per relation.
//!
//! A cell tracks the value shown to the user, the value the store last
//! confirmed, and whether a write is running. New intents always update the
//! shown value at once. Only one write runs at a time; when it finishes and the
//! shown value has moved on, exactly one follow-up write carries the latest
//! intent. A failed write reverts to the confirmed value unless a newer intent
//! has replaced it.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::errors::AppError;

/// A relation value that may not have been looked up yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Relation<T> {
    #[default]
    Unknown,
    Known(T),
}

impl<T> Relation<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Relation::Known(value) => Some(value),
            Relation::Unknown => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct OptimisticCell<T> {
    shown: Relation<T>,
    confirmed: Relation<T>,
    in_flight: bool,
}

impl<T: Clone + PartialEq> OptimisticCell<T> {
    pub fn new() -> Self {
        Self {
            shown: Relation::Unknown,
            confirmed: Relation::Unknown,
            in_flight: false,
        }
    }

    pub fn shown(&self) -> &Relation<T> {
        &self.shown
    }

    pub fn confirmed(&self) -> &Relation<T> {
        &self.confirmed
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Record the value read from the store. Ignored while a write runs.
    pub fn load(&mut self, value: T) {
        if self.in_flight {
            return;
        }
        self.shown = Relation::Known(value.clone());
        self.confirmed = Relation::Known(value);
    }

    /// Forget everything, e.g. after sign-out.
    pub fn reset(&mut self) {
        if !self.in_flight {
            self.shown = Relation::Unknown;
            self.confirmed = Relation::Unknown;
        }
    }

    /// Show `value` now. Returns the write to start, or `None` when a running
    /// write will reconcile it.
    pub fn set(&mut self, value: T) -> Option<T> {
        self.shown = Relation::Known(value.clone());
        if self.in_flight {
            return None;
        }
        self.in_flight = true;
        Some(value)
    }

    /// Report the end of the write of `written`. Returns the follow-up write,
    /// if the shown value still differs from what the store holds.
    pub fn complete(&mut self, written: T, ok: bool) -> Option<T> {
        if ok {
            self.confirmed = Relation::Known(written);
        } else if self.shown == Relation::Known(written) {
            self.shown = self.confirmed.clone();
        }

        match &self.shown {
            Relation::Known(latest) if self.shown != self.confirmed => Some(latest.clone()),
            _ => {
                self.in_flight = false;
                None
            }
        }
    }
}

/// Lock a cell, ignoring poisoning; cell state stays consistent between calls.
pub fn lock<T>(cell: &Mutex<OptimisticCell<T>>) -> MutexGuard<'_, OptimisticCell<T>> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Show `value` and drive writes until the store agrees with the latest intent.
///
/// The lock is never held across a write.
pub async fn apply<T, F, Fut>(cell: &Mutex<OptimisticCell<T>>, value: T, write: F) -> WriteSummary
where
    T: Clone + PartialEq,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<(), AppError>>,
{
    let Some(first) = lock(cell).set(value) else {
        return WriteSummary::Queued;
    };

    let mut summary = WriteSummary::Saved;
    let mut next = Some(first);
    while let Some(value) = next {
        let result = write(value.clone()).await;
        if let Err(e) = &result {
            tracing::warn!("Optimistic write failed: {}", e);
        }
        summary = if result.is_ok() {
            WriteSummary::Saved
        } else {
            WriteSummary::Failed
        };
        next = lock(cell).complete(value, result.is_ok());
    }
    summary
}

/// Result of [`apply`] as seen by the caller that started it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteSummary {
    /// The last write succeeded
    Saved,
    /// The last write failed and the cell reverted
    Failed,
    /// A running write took over this intent
    Queued,
}
