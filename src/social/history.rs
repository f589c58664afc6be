//! Read history.

use chrono::Utc;

use crate::auth::SessionHub;
use crate::errors::AppError;
use crate::models::{Chapter, ReadMarkRow, WorkSummary};
use crate::store::{select_as, to_row, Query, RemoteStore, Table};

/// Reads listed on the profile page.
pub const RECENT_READS: usize = 20;

/// Remember that the signed-in user opened `chapter`. Failures are logged only;
/// returns whether a mark was written.
pub async fn record_read(
    store: &dyn RemoteStore,
    session: &SessionHub,
    work: &WorkSummary,
    chapter: &Chapter,
) -> bool {
    let Some(user) = session.current() else {
        return false;
    };

    let mark = ReadMarkRow {
        id: None,
        user_id: user.id,
        work_id: work.id.clone(),
        chapter_id: chapter.id,
        chapter_number: chapter.number,
        chapter_title: chapter.title.clone(),
        work_title: work.title.clone(),
        work_cover: work.cover.clone(),
        read_at: Utc::now(),
    };

    let result = match to_row(&mark) {
        Ok(row) => {
            store
                .upsert(Table::UserReads, row, &["user_id", "work_id", "chapter_id"])
                .await
        }
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                "Failed to record read of {} chapter {}: {}",
                work.id,
                chapter.id,
                e
            );
            false
        }
    }
}

/// A user's latest reads, newest first.
pub async fn recent_reads(
    store: &dyn RemoteStore,
    user_id: &str,
    limit: usize,
) -> Result<Vec<ReadMarkRow>, AppError> {
    let query = Query::from(Table::UserReads)
        .eq("user_id", user_id)
        .order_by("read_at", true)
        .limit(limit);
    select_as(store, &query).await
}
