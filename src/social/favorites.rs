//! Favorite marks.

use std::sync::{Arc, Mutex};

use crate::auth::SessionHub;
use crate::errors::AppError;
use crate::models::{FavoriteRow, WorkSummary};
use crate::store::{select_as, to_row, Filter, Query, RemoteStore, Table};

use super::optimistic::{self, OptimisticCell, Relation, WriteSummary};
use super::MutationOutcome;

/// Favorite state of one work for the signed-in user.
#[derive(Clone)]
pub struct FavoriteState {
    store: Arc<dyn RemoteStore>,
    session: SessionHub,
    work: WorkSummary,
    cell: Arc<Mutex<OptimisticCell<bool>>>,
}

impl FavoriteState {
    pub fn new(store: Arc<dyn RemoteStore>, session: SessionHub, work: WorkSummary) -> Self {
        Self {
            store,
            session,
            work,
            cell: Arc::new(Mutex::new(OptimisticCell::new())),
        }
    }

    pub fn relation(&self) -> Relation<bool> {
        optimistic::lock(&self.cell).shown().clone()
    }

    pub fn is_favorite(&self) -> bool {
        self.relation() == Relation::Known(true)
    }

    /// Look the mark up for the current session; forget it when signed out.
    pub async fn check(&self) -> Result<Relation<bool>, AppError> {
        let Some(user) = self.session.current() else {
            optimistic::lock(&self.cell).reset();
            return Ok(Relation::Unknown);
        };

        let query = Query::from(Table::Favorites)
            .eq("user_id", user.id.as_str())
            .eq("work_id", self.work.id.as_str())
            .limit(1);
        let rows = self.store.select(&query).await?;
        optimistic::lock(&self.cell).load(!rows.is_empty());
        Ok(self.relation())
    }

    /// Flip the mark. Unknown counts as not favorited.
    pub async fn toggle(&self) -> MutationOutcome {
        let Some(user) = self.session.current() else {
            return MutationOutcome::SignInRequired;
        };

        let target = !self.is_favorite();
        let summary = optimistic::apply(&self.cell, target, |favorite| {
            let store = Arc::clone(&self.store);
            let user_id = user.id.clone();
            let work = self.work.clone();
            async move {
                if favorite {
                    let row = FavoriteRow {
                        id: None,
                        user_id,
                        work_id: work.id,
                        work_title: work.title,
                        work_cover: work.cover,
                        created_at: None,
                    };
                    store.insert(Table::Favorites, to_row(&row)?).await
                } else {
                    store
                        .delete(
                            Table::Favorites,
                            &[
                                Filter::eq("user_id", user_id),
                                Filter::eq("work_id", work.id),
                            ],
                        )
                        .await
                        .map(|_| ())
                }
            }
        })
        .await;

        match summary {
            WriteSummary::Saved => MutationOutcome::Saved,
            WriteSummary::Failed => MutationOutcome::Reverted,
            WriteSummary::Queued => MutationOutcome::Queued,
        }
    }
}

/// A user's favorites, newest first.
pub async fn favorites_of(store: &dyn RemoteStore, user_id: &str) -> Result<Vec<FavoriteRow>, AppError> {
    let query = Query::from(Table::Favorites)
        .eq("user_id", user_id)
        .order_by("created_at", true);
    select_as(store, &query).await
}
