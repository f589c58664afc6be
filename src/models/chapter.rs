//! Chapter model.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One installment of a work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// Unique within its work
    pub id: u32,
    pub title: String,
    /// Sequence number used for ordering; may differ from `id` and may be fractional
    pub number: f64,
    pub published_at: DateTime<Utc>,
    /// Image page references in reading order
    #[serde(default)]
    pub pages: Vec<String>,
}

/// Direction of a chapter listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterOrder {
    Ascending,
    #[default]
    Descending,
}

impl ChapterOrder {
    pub fn toggled(self) -> Self {
        match self {
            ChapterOrder::Ascending => ChapterOrder::Descending,
            ChapterOrder::Descending => ChapterOrder::Ascending,
        }
    }
}

/// Sort chapters by sequence number in the given direction.
pub fn sort_chapters(chapters: &mut [Chapter], order: ChapterOrder) {
    chapters.sort_by(|a, b| {
        let ord = a.number.partial_cmp(&b.number).unwrap_or(Ordering::Equal);
        match order {
            ChapterOrder::Ascending => ord,
            ChapterOrder::Descending => ord.reverse(),
        }
    });
}
