//! On-disk record shapes of the static catalog and their adapter into feed items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Chapter, Genre, Status, Tag, WorkInfo, WorkSummary};

/// One entry of `works.json`; only the slug and its position matter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// Descriptive metadata of `<slug>/info.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaRecord {
    pub title: String,
    #[serde(default)]
    pub alt_title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub year: Option<i32>,
    pub status: Status,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesRecord {
    pub cover: String,
    #[serde(default)]
    pub banner: String,
}

/// Contents of `<slug>/info.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkRecord {
    pub id: String,
    pub meta: MetaRecord,
    pub images: ImagesRecord,
    pub genre: Genre,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Contents of `<slug>/chapters.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChapterListRecord {
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

/// Figures derived from a work's chapter list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChapterStats {
    pub count: u32,
    pub latest: Option<DateTime<Utc>>,
}

impl ChapterStats {
    pub fn from_chapters(chapters: &[Chapter]) -> Self {
        Self {
            count: chapters.len() as u32,
            latest: chapters.iter().map(|c| c.published_at).max(),
        }
    }
}

/// Convert a catalog record into the shape feeds and views work with.
pub fn to_work_info(record: WorkRecord, stats: ChapterStats) -> WorkInfo {
    let summary = WorkSummary {
        id: record.id,
        title: record.meta.title,
        cover: record.images.cover,
        genre: record.genre,
        tags: record.tags,
        status: record.meta.status,
        chapter_count: stats.count,
        updated_at: stats.latest,
    }
    .normalize_tags();

    WorkInfo {
        summary,
        alt_title: record.meta.alt_title,
        description: record.meta.description,
        year: record.meta.year,
        author: record.meta.author,
        artist: record.meta.artist,
        banner: record.images.banner,
    }
}
