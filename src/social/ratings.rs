//! Ratings and the aggregates derived from them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::watch;

use crate::auth::SessionHub;
use crate::errors::AppError;
use crate::models::{RatingAggregate, RatingBreakdown, RatingRow};
use crate::store::{select_as, to_row, Query, RemoteStore, Table};

use super::optimistic::{self, OptimisticCell, Relation, WriteSummary};
use super::MutationOutcome;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Rows shown under "recent ratings" on a work page.
pub const RECENT_RATINGS: usize = 5;

/// The signed-in user's rating of one work.
#[derive(Clone)]
pub struct RatingState {
    store: Arc<dyn RemoteStore>,
    session: SessionHub,
    work_id: String,
    cell: Arc<Mutex<OptimisticCell<u8>>>,
    /// Bumped after every confirmed rating write
    epoch: Arc<watch::Sender<u64>>,
}

impl RatingState {
    pub fn new(store: Arc<dyn RemoteStore>, session: SessionHub, work_id: &str) -> Self {
        let (epoch, _rx) = watch::channel(0);
        Self {
            store,
            session,
            work_id: work_id.to_string(),
            cell: Arc::new(Mutex::new(OptimisticCell::new())),
            epoch: Arc::new(epoch),
        }
    }

    pub fn relation(&self) -> Relation<u8> {
        *optimistic::lock(&self.cell).shown()
    }

    pub fn current(&self) -> Option<u8> {
        self.relation().known().copied()
    }

    /// Observe confirmed rating changes; aggregates should be recomputed on
    /// every new epoch.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.epoch.subscribe()
    }

    pub fn epoch(&self) -> u64 {
        *self.epoch.borrow()
    }

    /// Look the user's rating up; forget it when signed out.
    pub async fn check(&self) -> Result<Relation<u8>, AppError> {
        let Some(user) = self.session.current() else {
            optimistic::lock(&self.cell).reset();
            return Ok(Relation::Unknown);
        };

        let query = Query::from(Table::Ratings)
            .eq("user_id", user.id.as_str())
            .eq("work_id", self.work_id.as_str())
            .limit(1);
        let rows: Vec<RatingRow> = select_as(self.store.as_ref(), &query).await?;
        if let Some(row) = rows.first() {
            optimistic::lock(&self.cell).load(row.rating);
        }
        Ok(self.relation())
    }

    /// Rate the work. Values outside 1..=5 are rejected before anything changes.
    pub async fn submit(&self, value: u8) -> Result<MutationOutcome, AppError> {
        if !(MIN_RATING..=MAX_RATING).contains(&value) {
            return Err(AppError::Validation(format!(
                "Rating must be between {} and {}, got {}",
                MIN_RATING, MAX_RATING, value
            )));
        }
        let Some(user) = self.session.current() else {
            return Ok(MutationOutcome::SignInRequired);
        };

        let summary = optimistic::apply(&self.cell, value, |rating| {
            let store = Arc::clone(&self.store);
            let epoch = Arc::clone(&self.epoch);
            let row = RatingRow {
                id: None,
                user_id: user.id.clone(),
                work_id: self.work_id.clone(),
                rating,
                created_at: None,
                updated_at: Some(Utc::now()),
            };
            async move {
                store
                    .upsert(Table::Ratings, to_row(&row)?, &["user_id", "work_id"])
                    .await?;
                epoch.send_modify(|n| *n += 1);
                Ok(())
            }
        })
        .await;

        Ok(match summary {
            WriteSummary::Saved => MutationOutcome::Saved,
            WriteSummary::Failed => MutationOutcome::Reverted,
            WriteSummary::Queued => MutationOutcome::Queued,
        })
    }
}

/// Mean and count of a set of ratings; `None` when there are none.
pub fn aggregate_of<'a>(ratings: impl IntoIterator<Item = &'a RatingRow>) -> Option<RatingAggregate> {
    let (sum, total) = ratings
        .into_iter()
        .fold((0u64, 0u32), |(sum, total), r| (sum + r.rating as u64, total + 1));
    (total > 0).then(|| RatingAggregate {
        average: sum as f64 / total as f64,
        total,
    })
}

/// Aggregates for many works with a single query.
pub async fn aggregates_for(
    store: &dyn RemoteStore,
    work_ids: &[String],
) -> Result<HashMap<String, RatingAggregate>, AppError> {
    if work_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let query = Query::from(Table::Ratings).is_in("work_id", work_ids.iter().map(String::as_str));
    let rows: Vec<RatingRow> = select_as(store, &query).await?;

    let mut by_work: HashMap<&str, Vec<&RatingRow>> = HashMap::new();
    for row in &rows {
        by_work.entry(row.work_id.as_str()).or_default().push(row);
    }
    Ok(by_work
        .into_iter()
        .filter_map(|(work_id, rows)| {
            aggregate_of(rows).map(|aggregate| (work_id.to_string(), aggregate))
        })
        .collect())
}

/// Aggregate, distribution and latest rows for one work.
pub async fn breakdown_for(store: &dyn RemoteStore, work_id: &str) -> Result<RatingBreakdown, AppError> {
    let query = Query::from(Table::Ratings)
        .eq("work_id", work_id)
        .order_by("updated_at", true);
    let rows: Vec<RatingRow> = select_as(store, &query).await?;

    let mut distribution = [0u32; 5];
    for row in &rows {
        if (MIN_RATING..=MAX_RATING).contains(&row.rating) {
            distribution[(row.rating - 1) as usize] += 1;
        }
    }

    Ok(RatingBreakdown {
        aggregate: aggregate_of(&rows),
        distribution,
        recent: rows.into_iter().take(RECENT_RATINGS).collect(),
    })
}

/// Every rating a user gave, newest first.
pub async fn ratings_by(store: &dyn RemoteStore, user_id: &str) -> Result<Vec<RatingRow>, AppError> {
    let query = Query::from(Table::Ratings)
        .eq("user_id", user_id)
        .order_by("updated_at", true);
    select_as(store, &query).await
}

/// Round to one decimal for display.
pub fn round_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
