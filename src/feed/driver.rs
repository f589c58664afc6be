//! Async driver of a feed controller.
//!
//! Each page request runs as its own task and reports back over a channel, so
//! completions may arrive in any order; the controller decides what applies.
//! A filter change aborts every outstanding task and dropping the feed aborts
//! whatever is left.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::{FilterSnapshot, SortOrder, WorkSummary};
use crate::storage::LocalStorage;

use super::cache::{self, CacheKey};
use super::controller::{FeedController, PageRequest, PageResult, ResultOutcome};
use super::sentinel::{ObservationToken, Sentinel};
use super::source::FeedSource;
use super::FeedKind;

/// Serializable view of a feed for presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedState {
    pub kind: FeedKind,
    pub snapshot: FilterSnapshot,
    pub page: u32,
    pub items: Vec<WorkSummary>,
    pub has_more: bool,
    pub loading: bool,
    pub placeholder: bool,
    pub total: Option<u64>,
    pub sentinel: Option<ObservationToken>,
}

/// A feed controller wired to a source, a cache and a scroll sentinel.
pub struct Feed {
    controller: FeedController,
    source: Arc<dyn FeedSource>,
    storage: Option<LocalStorage>,
    sentinel: Sentinel,
    total: Option<u64>,
    tasks: HashMap<u64, JoinHandle<()>>,
    results_tx: mpsc::UnboundedSender<PageResult>,
    results_rx: mpsc::UnboundedReceiver<PageResult>,
}

impl Feed {
    /// Create the feed, seed it from the cache and request page 1.
    pub async fn open(
        kind: FeedKind,
        snapshot: FilterSnapshot,
        page_size: usize,
        sort: SortOrder,
        source: Arc<dyn FeedSource>,
        storage: Option<LocalStorage>,
    ) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let mut feed = Self {
            controller: FeedController::new(kind, snapshot, page_size, sort),
            source,
            storage,
            sentinel: Sentinel::new(),
            total: None,
            tasks: HashMap::new(),
            results_tx,
            results_rx,
        };
        let request = feed.controller.start();
        feed.seed_from_cache().await;
        feed.dispatch(request);
        tracing::info!("Opened {} feed", kind.as_str());
        feed
    }

    pub fn controller(&self) -> &FeedController {
        &self.controller
    }

    pub fn snapshot(&self) -> &FilterSnapshot {
        self.controller.snapshot()
    }

    pub fn items(&self) -> &[WorkSummary] {
        self.controller.items()
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Token of the sentinel currently attached after the last item.
    pub fn sentinel(&self) -> Option<ObservationToken> {
        self.sentinel.token()
    }

    pub fn state(&self) -> FeedState {
        FeedState {
            kind: self.controller.kind(),
            snapshot: self.controller.snapshot().clone(),
            page: self.controller.page(),
            items: self.controller.items().to_vec(),
            has_more: self.controller.has_more(),
            loading: self.controller.is_loading(),
            placeholder: self.controller.shows_placeholder(),
            total: self.total,
            sentinel: self.sentinel.token(),
        }
    }

    /// Switch to a new snapshot; returns whether anything changed.
    pub async fn set_filter(&mut self, snapshot: FilterSnapshot) -> bool {
        let Some(request) = self.controller.set_filter(snapshot) else {
            return false;
        };
        self.abort_all();
        self.total = None;
        self.seed_from_cache().await;
        self.dispatch(request);
        true
    }

    /// Request the next page if the controller allows it.
    pub fn advance(&mut self) -> bool {
        match self.controller.advance_page() {
            Some(request) => {
                self.dispatch(request);
                true
            }
            None => false,
        }
    }

    /// Fetch the cursor page again, e.g. after it failed. Returns whether a
    /// request went out.
    pub fn refresh(&mut self) -> bool {
        match self.controller.retry() {
            Some(request) => {
                tracing::debug!("Refreshing {} feed page {}", self.kind_str(), request.page);
                self.dispatch(request);
                true
            }
            None => false,
        }
    }

    /// The sentinel observed by the last rendered item became visible.
    pub fn on_sentinel_visible(&mut self, token: ObservationToken) -> bool {
        if !self.sentinel.on_visible(token) {
            return false;
        }
        self.advance()
    }

    /// Wait for the next page result and apply it. `None` when nothing is
    /// outstanding.
    pub async fn next_result(&mut self) -> Option<ResultOutcome> {
        if self.tasks.is_empty() {
            return None;
        }
        let result = self.results_rx.recv().await?;
        self.tasks.remove(&result.ticket);
        Some(self.apply(result).await)
    }

    /// Apply results until no fetch is outstanding.
    pub async fn settle(&mut self) {
        while self.controller.is_loading() {
            if self.next_result().await.is_none() {
                break;
            }
        }
    }

    async fn apply(&mut self, result: PageResult) -> ResultOutcome {
        let page = result.page;
        let total = result.total;
        let outcome = self.controller.on_page_result(result);
        match outcome {
            ResultOutcome::Replaced { count } => {
                tracing::debug!("{} feed page 1 loaded with {} items", self.kind_str(), count);
                self.total = total.or(self.total);
                self.persist().await;
            }
            ResultOutcome::Appended { added } => {
                tracing::debug!("{} feed page {} added {} items", self.kind_str(), page, added);
                self.total = total.or(self.total);
            }
            ResultOutcome::Failed | ResultOutcome::Discarded => {}
        }
        self.sync_sentinel();
        outcome
    }

    fn dispatch(&mut self, request: PageRequest) {
        let source = Arc::clone(&self.source);
        let tx = self.results_tx.clone();
        let ticket = request.ticket;
        let handle = tokio::spawn(async move {
            let result = match source.fetch_page(&request).await {
                Ok(page) => {
                    let total = page.total;
                    request.into_result(Ok(page.works)).with_total(total)
                }
                Err(e) => request.into_result(Err(e)),
            };
            // The feed may be gone already.
            let _ = tx.send(result);
        });
        self.tasks.insert(ticket, handle);
        self.sync_sentinel();
    }

    fn abort_all(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }

    fn sync_sentinel(&mut self) {
        let last = self.controller.items().len().checked_sub(1);
        self.sentinel.sync(last, self.controller.is_loading());
    }

    async fn seed_from_cache(&mut self) {
        let Some(storage) = &self.storage else {
            return;
        };
        let Some(key) = CacheKey::for_snapshot(self.controller.kind(), self.controller.snapshot()) else {
            return;
        };
        if let Some(items) = cache::load(storage, &key).await {
            self.controller.seed(items);
        }
    }

    async fn persist(&self) {
        let Some(storage) = &self.storage else {
            return;
        };
        let Some(key) = CacheKey::for_snapshot(self.controller.kind(), self.controller.snapshot()) else {
            return;
        };
        cache::store(storage, &key, self.controller.items()).await;
    }

    fn kind_str(&self) -> &'static str {
        self.controller.kind().as_str()
    }
}

impl Drop for Feed {
    fn drop(&mut self) {
        self.abort_all();
    }
}
