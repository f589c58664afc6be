//! Feed pagination state machine.
//!
//! The controller never performs I/O. Operations that need a page hand back a
//! [`PageRequest`]; whoever runs the request reports back with a [`PageResult`]
//! carrying the same snapshot, page and ticket. Results for a snapshot or page
//! that is no longer current are dropped, so one list never mixes two snapshots.

use std::collections::HashSet;

use crate::errors::AppError;
use crate::models::{FilterSnapshot, SortOrder, WorkSummary};

use super::FeedKind;

/// A page fetch the caller should run.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// Identifies this request among all issued by one controller
    pub ticket: u64,
    pub kind: FeedKind,
    pub snapshot: FilterSnapshot,
    /// 1-based
    pub page: u32,
    pub page_size: usize,
    pub sort: SortOrder,
}

impl PageRequest {
    /// Items to skip before this page.
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.page_size
    }

    pub fn into_result(self, outcome: Result<Vec<WorkSummary>, AppError>) -> PageResult {
        PageResult {
            ticket: self.ticket,
            snapshot: self.snapshot,
            page: self.page,
            page_size: self.page_size,
            total: None,
            outcome,
        }
    }
}

impl PageResult {
    /// Attach the total match count reported by the source.
    pub fn with_total(mut self, total: Option<u64>) -> Self {
        self.total = total;
        self
    }
}

/// The answer to a [`PageRequest`].
#[derive(Debug, Clone)]
pub struct PageResult {
    pub ticket: u64,
    pub snapshot: FilterSnapshot,
    pub page: u32,
    pub page_size: usize,
    /// Total matches across all pages, when the source knows it
    pub total: Option<u64>,
    pub outcome: Result<Vec<WorkSummary>, AppError>,
}

/// What applying a result did to the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultOutcome {
    /// Page 1 replaced the list
    Replaced { count: usize },
    /// A later page appended its unseen items
    Appended { added: usize },
    /// The fetch failed; list and "more" are untouched
    Failed,
    /// Superseded by a filter change or a newer cursor
    Discarded,
}

/// Filter, cursor and accumulated list of one feed.
#[derive(Debug)]
pub struct FeedController {
    kind: FeedKind,
    page_size: usize,
    sort: SortOrder,
    snapshot: FilterSnapshot,
    /// 1-based cursor of the last requested page
    page: u32,
    items: Vec<WorkSummary>,
    seen: HashSet<String>,
    has_more: bool,
    /// Ticket of the request whose result the loading flag waits for
    in_flight: Option<u64>,
    next_ticket: u64,
    /// Whether a fetched page has landed for the current snapshot
    loaded: bool,
    seeded: bool,
}

impl FeedController {
    pub fn new(kind: FeedKind, snapshot: FilterSnapshot, page_size: usize, sort: SortOrder) -> Self {
        Self {
            kind,
            page_size: page_size.max(1),
            sort,
            snapshot,
            page: 1,
            items: Vec::new(),
            seen: HashSet::new(),
            has_more: true,
            in_flight: None,
            next_ticket: 1,
            loaded: false,
            seeded: false,
        }
    }

    pub fn kind(&self) -> FeedKind {
        self.kind
    }

    pub fn snapshot(&self) -> &FilterSnapshot {
        &self.snapshot
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn items(&self) -> &[WorkSummary] {
        &self.items
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// A fetch for the current snapshot is outstanding.
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Loading with nothing to show, cached or fetched.
    pub fn shows_placeholder(&self) -> bool {
        self.is_loading() && self.items.is_empty()
    }

    /// A fetched page has landed for the current snapshot.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The list currently comes from a cache snapshot, not a fetch.
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Request page 1 of the current snapshot.
    pub fn start(&mut self) -> PageRequest {
        self.page = 1;
        self.issue()
    }

    /// Switch to a new snapshot. Returns the page-1 request, or `None` when
    /// the snapshot is unchanged.
    pub fn set_filter(&mut self, snapshot: FilterSnapshot) -> Option<PageRequest> {
        if snapshot == self.snapshot {
            return None;
        }
        tracing::debug!(
            "{} feed filter changed to genre {} tags {:?} status {:?}",
            self.kind.as_str(),
            snapshot.genre_id,
            snapshot.tag_ids,
            snapshot.status_id
        );
        self.snapshot = snapshot;
        self.items.clear();
        self.seen.clear();
        self.has_more = true;
        self.loaded = false;
        self.seeded = false;
        Some(self.start())
    }

    /// Move the cursor to the next page, unless a fetch is outstanding or
    /// the snapshot is exhausted. Until page 1 has landed the cursor stays put
    /// and page 1 is asked for again.
    pub fn advance_page(&mut self) -> Option<PageRequest> {
        if self.in_flight.is_some() || !self.has_more {
            return None;
        }
        if self.loaded {
            self.page += 1;
        }
        Some(self.issue())
    }

    /// Request the cursor page again, e.g. after it failed.
    pub fn retry(&mut self) -> Option<PageRequest> {
        if self.in_flight.is_some() {
            return None;
        }
        Some(self.issue())
    }

    /// Seed the list from a cached snapshot. Only valid before any page of the
    /// current snapshot has landed; returns whether the seed was taken.
    pub fn seed(&mut self, items: Vec<WorkSummary>) -> bool {
        if self.loaded || self.page != 1 || !self.items.is_empty() || items.is_empty() {
            return false;
        }
        self.replace(items);
        self.seeded = true;
        true
    }

    /// Apply a finished fetch.
    pub fn on_page_result(&mut self, result: PageResult) -> ResultOutcome {
        if self.in_flight == Some(result.ticket) {
            self.in_flight = None;
        }

        if result.snapshot != self.snapshot || result.page != self.page {
            tracing::debug!(
                "Discarding {} feed page {} for a superseded request",
                self.kind.as_str(),
                result.page
            );
            return ResultOutcome::Discarded;
        }

        let items = match result.outcome {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(
                    "Failed to load {} feed page {}: {}",
                    self.kind.as_str(),
                    result.page,
                    e
                );
                if self.page > 1 {
                    // Let the next scroll trigger ask for this page again.
                    self.page -= 1;
                }
                return ResultOutcome::Failed;
            }
        };

        self.has_more = !items.is_empty() && items.len() >= result.page_size;
        self.loaded = true;
        self.seeded = false;

        if result.page == 1 {
            self.replace(items);
            ResultOutcome::Replaced {
                count: self.items.len(),
            }
        } else {
            let before = self.items.len();
            for item in items {
                if self.seen.insert(item.id.clone()) {
                    self.items.push(item);
                }
            }
            ResultOutcome::Appended {
                added: self.items.len() - before,
            }
        }
    }

    fn replace(&mut self, items: Vec<WorkSummary>) {
        self.items.clear();
        self.seen.clear();
        for item in items {
            if self.seen.insert(item.id.clone()) {
                self.items.push(item);
            }
        }
    }

    fn issue(&mut self) -> PageRequest {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(ticket);
        PageRequest {
            ticket,
            kind: self.kind,
            snapshot: self.snapshot.clone(),
            page: self.page,
            page_size: self.page_size,
            sort: self.sort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_summary;

    const SIZE: usize = 4;

    fn controller() -> FeedController {
        FeedController::new(FeedKind::Catalog, FilterSnapshot::default(), SIZE, SortOrder::LATEST)
    }

    fn page_of(request: &PageRequest, len: usize) -> Vec<WorkSummary> {
        (0..len)
            .map(|i| {
                sample_summary(&format!(
                    "g{}-{}",
                    request.snapshot.genre_id,
                    request.offset() + i
                ))
            })
            .collect()
    }

    fn ids(controller: &FeedController) -> Vec<String> {
        controller.items().iter().map(|w| w.id.clone()).collect()
    }

    #[test]
    fn test_first_page_then_append() {
        let mut feed = controller();
        let first = feed.start();
        assert!(feed.shows_placeholder());

        let items = page_of(&first, SIZE);
        assert_eq!(
            feed.on_page_result(first.into_result(Ok(items))),
            ResultOutcome::Replaced { count: SIZE }
        );
        assert!(!feed.is_loading());
        assert!(feed.has_more());

        let second = feed.advance_page().unwrap();
        assert_eq!(second.page, 2);
        let items = page_of(&second, 2);
        assert_eq!(
            feed.on_page_result(second.into_result(Ok(items))),
            ResultOutcome::Appended { added: 2 }
        );
        assert_eq!(feed.items().len(), 6);
        assert!(!feed.has_more());
        assert!(feed.advance_page().is_none());
    }

    #[test]
    fn test_duplicates_across_pages_are_dropped() {
        let mut feed = controller();
        let first = feed.start();
        let mut items = page_of(&first, SIZE);
        items.push(items[0].clone());
        feed.on_page_result(first.into_result(Ok(items)));
        assert_eq!(feed.items().len(), SIZE);

        let second = feed.advance_page().unwrap();
        let mut items = page_of(&second, 3);
        items.insert(0, sample_summary("g1-0"));
        assert_eq!(
            feed.on_page_result(second.into_result(Ok(items))),
            ResultOutcome::Appended { added: 3 }
        );
        assert!(feed.has_more());
        assert_eq!(ids(&feed).iter().filter(|id| *id == "g1-0").count(), 1);
    }

    #[test]
    fn test_filter_change_discards_late_result() {
        let mut feed = controller();
        let first = feed.start();
        let items = page_of(&first, SIZE);
        feed.on_page_result(first.into_result(Ok(items)));

        let stale = feed.advance_page().unwrap();
        let fresh = feed.set_filter(FilterSnapshot::for_genre(4)).unwrap();
        assert_eq!(fresh.page, 1);
        assert!(feed.items().is_empty());
        assert!(feed.shows_placeholder());

        let stale_items = page_of(&stale, SIZE);
        assert_eq!(
            feed.on_page_result(stale.into_result(Ok(stale_items))),
            ResultOutcome::Discarded
        );
        assert!(feed.items().is_empty());
        assert!(feed.is_loading());

        let fresh_items = page_of(&fresh, 1);
        feed.on_page_result(fresh.into_result(Ok(fresh_items)));
        assert_eq!(ids(&feed), vec!["g4-0"]);
    }

    #[test]
    fn test_same_filter_is_a_no_op() {
        let mut feed = controller();
        feed.start();
        assert!(feed.set_filter(FilterSnapshot::default()).is_none());
    }

    #[test]
    fn test_failed_later_page_rolls_cursor_back() {
        let mut feed = controller();
        let first = feed.start();
        let items = page_of(&first, SIZE);
        feed.on_page_result(first.into_result(Ok(items)));

        let second = feed.advance_page().unwrap();
        assert_eq!(
            feed.on_page_result(second.into_result(Err(AppError::Fetch("timeout".into())))),
            ResultOutcome::Failed
        );
        assert_eq!(feed.page(), 1);
        assert_eq!(feed.items().len(), SIZE);
        assert!(feed.has_more());
        assert!(!feed.is_loading());

        assert_eq!(feed.advance_page().unwrap().page, 2);
    }

    #[test]
    fn test_failed_first_page_keeps_seed() {
        let mut feed = controller();
        let first = feed.start();
        assert!(feed.seed(vec![sample_summary("cached")]));
        assert!(feed.is_loading());
        assert!(!feed.shows_placeholder());

        feed.on_page_result(first.into_result(Err(AppError::Fetch("offline".into()))));
        assert_eq!(ids(&feed), vec!["cached"]);
        assert_eq!(feed.page(), 1);
    }

    #[test]
    fn test_scroll_after_failed_first_page_asks_for_page_one() {
        let mut feed = controller();
        let first = feed.start();
        feed.seed(vec![sample_summary("cached")]);
        feed.on_page_result(first.into_result(Err(AppError::Fetch("offline".into()))));
        assert!(!feed.is_loaded());

        let again = feed.advance_page().unwrap();
        assert_eq!(again.page, 1);
        let items = page_of(&again, SIZE);
        assert_eq!(
            feed.on_page_result(again.into_result(Ok(items))),
            ResultOutcome::Replaced { count: SIZE }
        );
        assert!(!feed.is_seeded());
        assert!(!ids(&feed).contains(&"cached".to_string()));
        assert_eq!(feed.advance_page().unwrap().page, 2);
    }

    #[test]
    fn test_retry_reissues_cursor_page() {
        let mut feed = controller();
        let first = feed.start();
        assert!(feed.retry().is_none());
        feed.on_page_result(first.into_result(Err(AppError::Fetch("offline".into()))));
        assert!(feed.items().is_empty());

        let again = feed.retry().unwrap();
        assert_eq!(again.page, 1);
        assert!(feed.shows_placeholder());
        let items = page_of(&again, SIZE);
        feed.on_page_result(again.into_result(Ok(items)));
        assert_eq!(feed.items().len(), SIZE);
        assert!(feed.is_loaded());
    }

    #[test]
    fn test_seed_is_refused_after_a_page_landed() {
        let mut feed = controller();
        let first = feed.start();
        feed.on_page_result(first.into_result(Ok(Vec::new())));
        assert!(!feed.has_more());
        assert!(!feed.seed(vec![sample_summary("cached")]));
        assert!(feed.items().is_empty());
    }

    #[test]
    fn test_advance_is_guarded_while_loading() {
        let mut feed = controller();
        feed.start();
        assert!(feed.advance_page().is_none());
        assert_eq!(feed.page(), 1);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        /// Drive a controller with a random interleaving of filter changes,
        /// scroll triggers and out-of-order completions.
        fn run(ops: &[(u8, u8)]) -> Result<(), TestCaseError> {
            let mut feed = controller();
            let mut pending = vec![feed.start()];

            for &(op, arg) in ops {
                match op % 5 {
                    0 => {
                        let genre = 1 + (arg as u32 % 3);
                        if let Some(request) = feed.set_filter(FilterSnapshot::for_genre(genre)) {
                            pending.push(request);
                        }
                    }
                    1 => {
                        let was_loading = feed.is_loading();
                        let had_more = feed.has_more();
                        let page = feed.page();
                        let expected = if feed.is_loaded() { page + 1 } else { page };
                        match feed.advance_page() {
                            Some(request) => {
                                prop_assert!(!was_loading && had_more);
                                prop_assert_eq!(request.page, expected);
                                pending.push(request);
                            }
                            None => {
                                prop_assert_eq!(feed.page(), page);
                            }
                        }
                    }
                    2 | 3 if !pending.is_empty() => {
                        let request = pending.remove(arg as usize % pending.len());
                        let len = arg as usize % (SIZE + 1);
                        let items = page_of(&request, len);
                        let replay = request.clone().into_result(Ok(items.clone()));
                        feed.on_page_result(request.into_result(Ok(items)));
                        if op % 5 == 3 {
                            // Delivering the same page twice changes nothing.
                            let before = ids(&feed);
                            let outcome = feed.on_page_result(replay);
                            let unchanged = matches!(
                                outcome,
                                ResultOutcome::Appended { added: 0 }
                                    | ResultOutcome::Replaced { .. }
                                    | ResultOutcome::Discarded
                            );
                            prop_assert!(unchanged, "unexpected outcome {:?}", outcome);
                            prop_assert_eq!(ids(&feed), before);
                        }
                    }
                    4 if !pending.is_empty() => {
                        let request = pending.remove(arg as usize % pending.len());
                        feed.on_page_result(request.into_result(Err(AppError::Fetch("x".into()))));
                    }
                    _ => {}
                }

                let prefix = format!("g{}-", feed.snapshot().genre_id);
                let current = ids(&feed);
                prop_assert!(current.iter().all(|id| id.starts_with(&prefix)));
                let unique: HashSet<&String> = current.iter().collect();
                prop_assert_eq!(unique.len(), current.len());
                if !feed.has_more() {
                    prop_assert!(feed.advance_page().is_none());
                }
            }
            Ok(())
        }

        proptest! {
            #[test]
            fn list_holds_only_current_snapshot(ops in proptest::collection::vec((0u8..5, any::<u8>()), 1..60)) {
                run(&ops)?;
            }

            #[test]
            fn exhaustion_is_sticky(extra in 0usize..4, attempts in 1usize..10) {
                let mut feed = controller();
                let first = feed.start();
                let items = page_of(&first, extra % SIZE);
                feed.on_page_result(first.into_result(Ok(items)));
                prop_assert!(!feed.has_more());
                for _ in 0..attempts {
                    prop_assert!(feed.advance_page().is_none());
                }
                prop_assert!(feed.set_filter(FilterSnapshot::for_genre(9)).is_some());
                prop_assert!(feed.has_more());
            }
        }
    }
}
