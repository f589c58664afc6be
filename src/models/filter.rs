//! Filter snapshot and sort order for feed queries.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Genre selected when nothing has been remembered yet (Webtoon).
pub const DEFAULT_GENRE_ID: u32 = 1;

/// The full tuple of filter dimensions that determines feed content.
///
/// Tags are held as a set so selection order never makes two snapshots differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterSnapshot {
    pub genre_id: u32,
    pub tag_ids: BTreeSet<u32>,
    pub status_id: Option<u32>,
    pub search: String,
}

impl Default for FilterSnapshot {
    fn default() -> Self {
        Self::for_genre(DEFAULT_GENRE_ID)
    }
}

impl FilterSnapshot {
    pub fn for_genre(genre_id: u32) -> Self {
        Self {
            genre_id,
            tag_ids: BTreeSet::new(),
            status_id: None,
            search: String::new(),
        }
    }

    pub fn with_genre(mut self, genre_id: u32) -> Self {
        self.genre_id = genre_id;
        self
    }

    /// Add the tag if absent, remove it if present.
    pub fn with_tag_toggled(mut self, tag_id: u32) -> Self {
        if !self.tag_ids.remove(&tag_id) {
            self.tag_ids.insert(tag_id);
        }
        self
    }

    /// Selecting the active status again clears it.
    pub fn with_status_toggled(mut self, status_id: Option<u32>) -> Self {
        self.status_id = if self.status_id == status_id {
            None
        } else {
            status_id
        };
        self
    }

    pub fn with_search(mut self, search: &str) -> Self {
        self.search = search.trim().to_string();
        self
    }

    pub fn has_search(&self) -> bool {
        !self.search.is_empty()
    }
}

/// Field a feed is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    UpdatedAt,
    Title,
    ChapterCount,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::UpdatedAt => "updated_at",
            SortField::Title => "title",
            SortField::ChapterCount => "chapter_count",
        }
    }
}

/// Field and direction of a feed ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: SortField,
    pub descending: bool,
}

impl SortOrder {
    /// Newest updates first.
    pub const LATEST: SortOrder = SortOrder {
        field: SortField::UpdatedAt,
        descending: true,
    };

    pub fn direction(&self) -> &'static str {
        if self.descending {
            "DESC"
        } else {
            "ASC"
        }
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::LATEST
    }
}
