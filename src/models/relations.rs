//! Per-user relation records held by the remote store.
//!
//! Field names match the remote table columns; optional ids and timestamps are
//! left out of inserts so the store fills its defaults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the `favorites` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: String,
    pub work_id: String,
    #[serde(default)]
    pub work_title: String,
    #[serde(default)]
    pub work_cover: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A row of the `ratings` table; unique per (user_id, work_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: String,
    pub work_id: String,
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A row of the `comments` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub work_id: String,
    pub user_id: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A row of the `user_reads` table; unique per (user_id, work_id, chapter_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadMarkRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: String,
    pub work_id: String,
    pub chapter_id: u32,
    pub chapter_number: f64,
    #[serde(default)]
    pub chapter_title: String,
    #[serde(default)]
    pub work_title: String,
    #[serde(default)]
    pub work_cover: String,
    pub read_at: DateTime<Utc>,
}

/// A row of the `profiles` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Mean rating and count for one work, derived from visible rating rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingAggregate {
    pub average: f64,
    pub total: u32,
}

/// Aggregate plus the 1..=5 distribution and the rows behind it.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RatingBreakdown {
    pub aggregate: Option<RatingAggregate>,
    /// Count of ratings with value `index + 1`
    pub distribution: [u32; 5],
    /// Newest first
    pub recent: Vec<RatingRow>,
}

/// A comment ready for display, with its author resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: Option<i64>,
    pub user_id: String,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub body: String,
    pub created_at: Option<DateTime<Utc>>,
}
