//! Work models shared by the catalog, the feeds and the views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Chapter;

/// Genre classification of a work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

/// A tag attached to a work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: u32,
    pub name: String,
}

/// Publication status of a work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Status {
    pub id: u32,
    pub name: String,
}

/// The feed item shape: everything a card in a list needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkSummary {
    /// Globally unique slug
    pub id: String,
    pub title: String,
    pub cover: String,
    pub genre: Genre,
    /// Unique by tag id, sorted by id
    pub tags: Vec<Tag>,
    pub status: Status,
    pub chapter_count: u32,
    /// Publication time of the newest chapter
    pub updated_at: Option<DateTime<Utc>>,
}

impl WorkSummary {
    /// Sort tags by id and drop repeated ids.
    pub fn normalize_tags(mut self) -> Self {
        self.tags.sort_by_key(|t| t.id);
        self.tags.dedup_by_key(|t| t.id);
        self
    }

    pub fn has_tag(&self, tag_id: u32) -> bool {
        self.tags.iter().any(|t| t.id == tag_id)
    }
}

/// A work with its long-form metadata, without chapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkInfo {
    #[serde(flatten)]
    pub summary: WorkSummary,
    pub alt_title: String,
    pub description: String,
    pub year: Option<i32>,
    pub author: Option<String>,
    pub artist: Option<String>,
    pub banner: String,
}

/// A work with its chapters, in catalog order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkDetail {
    #[serde(flatten)]
    pub info: WorkInfo,
    pub chapters: Vec<Chapter>,
}

impl WorkDetail {
    pub fn id(&self) -> &str {
        &self.info.summary.id
    }

    pub fn title(&self) -> &str {
        &self.info.summary.title
    }
}

#[cfg(test)]
pub(crate) fn sample_summary(id: &str) -> WorkSummary {
    WorkSummary {
        id: id.to_string(),
        title: format!("Work {}", id),
        cover: format!("covers/{}.webp", id),
        genre: Genre {
            id: 1,
            name: "Webtoon".to_string(),
            slug: "webtoon".to_string(),
        },
        tags: Vec::new(),
        status: Status {
            id: 1,
            name: "Ongoing".to_string(),
        },
        chapter_count: 1,
        updated_at: None,
    }
}
