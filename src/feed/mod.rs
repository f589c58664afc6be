//! Paginated feeds.
//!
//! [`FeedController`] is the synchronous state machine behind the home and
//! catalog listings: it owns the filter snapshot, the page cursor and the
//! accumulated, deduplicated list. [`Feed`] drives it against a [`FeedSource`],
//! running page fetches as tasks and persisting page-1 snapshots.

pub mod cache;
pub mod controller;
pub mod curated;
pub mod debounce;
pub mod driver;
pub mod sentinel;
pub mod source;

pub use cache::CacheKey;
pub use controller::{FeedController, PageRequest, PageResult, ResultOutcome};
pub use curated::CuratedShelf;
pub use debounce::Debouncer;
pub use driver::{Feed, FeedState};
pub use sentinel::{ObservationToken, Sentinel};
pub use source::{CatalogFeedSource, FeedPage, FeedSource, HttpFeedSource};

use serde::{Deserialize, Serialize};

use crate::storage::keys;

/// Which listing a feed backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    Home,
    Catalog,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Home => "home",
            FeedKind::Catalog => "catalog",
        }
    }

    /// Storage key remembering the last selected genre.
    pub fn genre_key(&self) -> &'static str {
        match self {
            FeedKind::Home => keys::HOME_GENRE,
            FeedKind::Catalog => keys::CATALOG_GENRE,
        }
    }
}
