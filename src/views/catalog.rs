//! "All works" screen: the filterable catalog feed.

use std::collections::HashMap;

use serde::Serialize;
use tokio::time::Instant;

use crate::catalog::FilterOptions;
use crate::feed::{CuratedShelf, Debouncer, Feed, FeedKind, FeedState};
use crate::models::{FilterSnapshot, RatingAggregate, SortOrder, WorkSummary, DEFAULT_GENRE_ID};
use crate::storage::keys;
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct CatalogState {
    pub options: FilterOptions,
    /// Search box contents, which may run ahead of the applied term
    pub search_input: String,
    pub search_pending: bool,
    pub feed: FeedState,
    pub trending: Vec<WorkSummary>,
    pub ratings: HashMap<String, RatingAggregate>,
}

pub struct CatalogView {
    app: AppState,
    feed: Feed,
    trending: CuratedShelf,
    options: FilterOptions,
    search_input: String,
    search: Debouncer<String>,
    ratings: HashMap<String, RatingAggregate>,
}

impl CatalogView {
    pub async fn open(app: &AppState) -> Self {
        let storage = &app.storage;
        let genre_id = storage
            .read_json::<u32>(FeedKind::Catalog.genre_key())
            .await
            .unwrap_or(DEFAULT_GENRE_ID);

        let feed = Feed::open(
            FeedKind::Catalog,
            FilterSnapshot::for_genre(genre_id),
            app.config.page_size,
            SortOrder::LATEST,
            app.feed_source.clone(),
            Some(storage.clone()),
        )
        .await;

        let mut trending =
            CuratedShelf::open(keys::SHELF_TRENDING, app.config.trending_slugs.clone(), storage).await;
        trending.refresh(&app.catalog, storage).await;

        let mut view = Self {
            app: app.clone(),
            feed,
            trending,
            options: app.catalog.filter_options(&app.config.tag_allowlist),
            search_input: String::new(),
            search: Debouncer::new(app.config.search_debounce),
            ratings: HashMap::new(),
        };
        view.refresh_ratings().await;
        view
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    pub fn feed_mut(&mut self) -> &mut Feed {
        &mut self.feed
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    pub fn ratings(&self) -> &HashMap<String, RatingAggregate> {
        &self.ratings
    }

    pub async fn select_genre(&mut self, genre_id: u32) -> bool {
        if let Err(e) = self
            .app
            .storage
            .write_json(FeedKind::Catalog.genre_key(), &genre_id)
            .await
        {
            tracing::warn!("Failed to remember catalog genre: {}", e);
        }
        let snapshot = self.feed.snapshot().clone().with_genre(genre_id);
        self.feed.set_filter(snapshot).await
    }

    pub async fn toggle_tag(&mut self, tag_id: u32) -> bool {
        let snapshot = self.feed.snapshot().clone().with_tag_toggled(tag_id);
        self.feed.set_filter(snapshot).await
    }

    /// Select a status; choosing the active one again clears it.
    pub async fn toggle_status(&mut self, status_id: u32) -> bool {
        let snapshot = self.feed.snapshot().clone().with_status_toggled(Some(status_id));
        self.feed.set_filter(snapshot).await
    }

    /// Clear every dimension except the genre.
    pub async fn clear_filters(&mut self) -> bool {
        self.search.cancel();
        self.search_input.clear();
        let genre_id = self.feed.snapshot().genre_id;
        self.feed.set_filter(FilterSnapshot::for_genre(genre_id)).await
    }

    /// A keystroke in the search box. The term is applied once typing pauses.
    pub fn type_search(&mut self, input: &str) {
        self.search_input = input.to_string();
        self.search.push(input.to_string());
    }

    /// Apply the pending term if its quiet period is over.
    pub async fn poll_search(&mut self, now: Instant) -> bool {
        match self.search.poll(now) {
            Some(term) => self.apply_search(&term).await,
            None => false,
        }
    }

    /// Wait for typing to pause and apply the term.
    pub async fn settle_search(&mut self) -> bool {
        match self.search.settle().await {
            Some(term) => self.apply_search(&term).await,
            None => false,
        }
    }

    async fn apply_search(&mut self, term: &str) -> bool {
        let snapshot = self.feed.snapshot().clone().with_search(term);
        self.feed.set_filter(snapshot).await
    }

    pub fn reach_end(&mut self) -> bool {
        match self.feed.sentinel() {
            Some(token) => self.feed.on_sentinel_visible(token),
            None => false,
        }
    }

    /// Fetch the current page again, e.g. after a failed load.
    pub fn refresh(&mut self) -> bool {
        self.feed.refresh()
    }

    pub async fn settle(&mut self) {
        self.feed.settle().await;
        self.refresh_ratings().await;
    }

    pub async fn refresh_ratings(&mut self) {
        let shown = self.feed.items().iter().chain(self.trending.items());
        super::refresh_ratings(&self.app, shown, &mut self.ratings).await;
    }

    pub fn state(&self) -> CatalogState {
        CatalogState {
            options: self.options.clone(),
            search_input: self.search_input.clone(),
            search_pending: self.search.is_pending(),
            feed: self.feed.state(),
            trending: self.trending.items().to_vec(),
            ratings: self.ratings.clone(),
        }
    }
}
