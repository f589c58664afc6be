//! Work page: metadata, chapter list, favorite, rating and comments.

use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;

use crate::auth::SessionSubscription;
use crate::errors::AppError;
use crate::models::{sort_chapters, Chapter, ChapterOrder, Comment, RatingBreakdown, WorkDetail, WorkInfo};
use crate::social::{ratings, CommentThread, FavoriteState, MutationOutcome, RatingState, Relation};
use crate::AppState;

use super::format::relative_time;

#[derive(Debug, Clone, Serialize)]
pub struct DetailState {
    pub work: WorkInfo,
    /// Relative age of the newest chapter
    pub updated: Option<String>,
    pub order: ChapterOrder,
    pub chapters: Vec<Chapter>,
    /// Chapter the "start reading" action opens
    pub first_chapter: Option<u32>,
    pub signed_in: bool,
    pub favorite: Relation<bool>,
    pub rating: Relation<u8>,
    pub breakdown: RatingBreakdown,
    pub comments: Vec<Comment>,
    pub comment_sending: bool,
}

pub struct DetailView {
    app: AppState,
    detail: WorkDetail,
    order: ChapterOrder,
    favorite: FavoriteState,
    rating: RatingState,
    breakdown: RatingBreakdown,
    comments: CommentThread,
    session: SessionSubscription,
    rating_epoch: watch::Receiver<u64>,
}

impl DetailView {
    /// Load the work or fail with `NotFound`.
    pub async fn open(app: &AppState, slug: &str) -> Result<Self, AppError> {
        let detail = app
            .catalog
            .load_detail(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Work {} not found", slug)))?;

        let store = app.store.clone();
        let session = app.session.clone();
        let favorite = FavoriteState::new(store.clone(), session.clone(), detail.info.summary.clone());
        let rating = RatingState::new(store.clone(), session.clone(), detail.id());
        let comments = CommentThread::new(store, session, detail.id());

        let mut view = Self {
            app: app.clone(),
            order: ChapterOrder::default(),
            session: app.session.subscribe(),
            rating_epoch: rating.subscribe(),
            breakdown: RatingBreakdown::default(),
            detail,
            favorite,
            rating,
            comments,
        };
        view.check_relations().await;
        view.reload_breakdown().await;
        if let Err(e) = view.comments.load().await {
            tracing::warn!("Failed to load comments for {}: {}", view.detail.id(), e);
        }
        Ok(view)
    }

    pub fn detail(&self) -> &WorkDetail {
        &self.detail
    }

    pub fn favorite(&self) -> &FavoriteState {
        &self.favorite
    }

    pub fn rating(&self) -> &RatingState {
        &self.rating
    }

    pub fn breakdown(&self) -> &RatingBreakdown {
        &self.breakdown
    }

    pub fn comments(&self) -> &CommentThread {
        &self.comments
    }

    pub fn order(&self) -> ChapterOrder {
        self.order
    }

    pub fn toggle_order(&mut self) -> ChapterOrder {
        self.order = self.order.toggled();
        self.order
    }

    /// Chapters in the selected order.
    pub fn chapters(&self) -> Vec<Chapter> {
        let mut chapters = self.detail.chapters.clone();
        sort_chapters(&mut chapters, self.order);
        chapters
    }

    /// Lowest sequence number.
    pub fn first_chapter(&self) -> Option<u32> {
        let mut chapters = self.detail.chapters.clone();
        sort_chapters(&mut chapters, ChapterOrder::Ascending);
        chapters.first().map(|c| c.id)
    }

    /// React to session transitions and confirmed rating writes. Returns
    /// whether anything was reloaded.
    pub async fn sync(&mut self) -> bool {
        let mut reloaded = false;
        if self.session.take_change().is_some() {
            self.check_relations().await;
            reloaded = true;
        }
        if self.rating_epoch.has_changed().unwrap_or(false) {
            self.rating_epoch.borrow_and_update();
            self.reload_breakdown().await;
            reloaded = true;
        }
        reloaded
    }

    pub async fn toggle_favorite(&mut self) -> MutationOutcome {
        self.favorite.toggle().await
    }

    /// Rate the work and refresh the breakdown once the write lands.
    pub async fn rate(&mut self, value: u8) -> Result<MutationOutcome, AppError> {
        let outcome = self.rating.submit(value).await?;
        self.sync().await;
        Ok(outcome)
    }

    pub async fn post_comment(&mut self, body: &str) -> Result<MutationOutcome, AppError> {
        self.comments.post(body).await
    }

    async fn check_relations(&self) {
        if let Err(e) = self.favorite.check().await {
            tracing::warn!("Failed to check favorite of {}: {}", self.detail.id(), e);
        }
        if let Err(e) = self.rating.check().await {
            tracing::warn!("Failed to check rating of {}: {}", self.detail.id(), e);
        }
    }

    async fn reload_breakdown(&mut self) {
        match ratings::breakdown_for(self.app.store.as_ref(), self.detail.id()).await {
            Ok(breakdown) => self.breakdown = breakdown,
            Err(e) => tracing::warn!("Failed to load ratings of {}: {}", self.detail.id(), e),
        }
    }

    pub fn state(&self) -> DetailState {
        DetailState {
            work: self.detail.info.clone(),
            updated: self
                .detail
                .info
                .summary
                .updated_at
                .map(|at| relative_time(at, Utc::now())),
            order: self.order,
            chapters: self.chapters(),
            first_chapter: self.first_chapter(),
            signed_in: self.app.session.current().is_some(),
            favorite: self.favorite.relation(),
            rating: self.rating.relation(),
            breakdown: self.breakdown.clone(),
            comments: self.comments.comments(),
            comment_sending: self.comments.is_sending(),
        }
    }
}
