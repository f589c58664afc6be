//! Comment threads on work pages.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::auth::SessionHub;
use crate::errors::AppError;
use crate::models::{Comment, CommentRow, ProfileRow};
use crate::store::{select_as, to_row, Query, RemoteStore, Table};

use super::MutationOutcome;

/// Display name for authors without a profile.
pub const FALLBACK_AUTHOR: &str = "Reader";

/// Comments of one work, newest first.
#[derive(Clone)]
pub struct CommentThread {
    store: Arc<dyn RemoteStore>,
    session: SessionHub,
    work_id: String,
    comments: Arc<Mutex<Vec<Comment>>>,
    sending: Arc<AtomicBool>,
}

impl CommentThread {
    pub fn new(store: Arc<dyn RemoteStore>, session: SessionHub, work_id: &str) -> Self {
        Self {
            store,
            session,
            work_id: work_id.to_string(),
            comments: Arc::new(Mutex::new(Vec::new())),
            sending: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn comments(&self) -> Vec<Comment> {
        self.comments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::SeqCst)
    }

    /// Fetch the thread and resolve author profiles.
    pub async fn load(&self) -> Result<Vec<Comment>, AppError> {
        let query = Query::from(Table::Comments)
            .eq("work_id", self.work_id.as_str())
            .order_by("created_at", true);
        let rows: Vec<CommentRow> = select_as(self.store.as_ref(), &query).await?;

        let mut user_ids: Vec<&str> = rows.iter().map(|r| r.user_id.as_str()).collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let profiles: HashMap<String, ProfileRow> = if user_ids.is_empty() {
            HashMap::new()
        } else {
            let query = Query::from(Table::Profiles).is_in("user_id", user_ids);
            select_as::<ProfileRow>(self.store.as_ref(), &query)
                .await?
                .into_iter()
                .map(|p| (p.user_id.clone(), p))
                .collect()
        };

        let comments: Vec<Comment> = rows
            .into_iter()
            .map(|row| {
                let profile = profiles.get(&row.user_id);
                Comment {
                    id: row.id,
                    author_name: profile
                        .map(|p| p.full_name.clone().unwrap_or_else(|| p.username.clone()))
                        .unwrap_or_else(|| FALLBACK_AUTHOR.to_string()),
                    author_avatar: profile.and_then(|p| p.avatar_url.clone()),
                    user_id: row.user_id,
                    body: row.body,
                    created_at: row.created_at,
                }
            })
            .collect();

        *self.comments.lock().unwrap_or_else(PoisonError::into_inner) = comments.clone();
        Ok(comments)
    }

    /// Post a comment and reload the thread.
    pub async fn post(&self, body: &str) -> Result<MutationOutcome, AppError> {
        let Some(user) = self.session.current() else {
            return Ok(MutationOutcome::SignInRequired);
        };
        let body = body.trim();
        if body.is_empty() {
            return Err(AppError::Validation("Comment is empty".to_string()));
        }
        if self.sending.swap(true, Ordering::SeqCst) {
            return Ok(MutationOutcome::Busy);
        }

        let row = CommentRow {
            id: None,
            work_id: self.work_id.clone(),
            user_id: user.id,
            body: body.to_string(),
            created_at: None,
        };
        let result = match to_row(&row) {
            Ok(row) => self.store.insert(Table::Comments, row).await,
            Err(e) => Err(e),
        };
        self.sending.store(false, Ordering::SeqCst);

        if let Err(e) = result {
            tracing::warn!("Failed to post comment on {}: {}", self.work_id, e);
            return Err(e);
        }
        self.load().await?;
        Ok(MutationOutcome::Saved)
    }
}
