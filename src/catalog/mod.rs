//! Local catalog accessor.
//!
//! The catalog is a directory of JSON files:
//!
//! ```text
//! works.json                  registry, in insertion order
//! <slug>/info.json            work metadata
//! <slug>/chapters.json        full chapter list
//! <slug>/chapters/<id>.json   one chapter (optional)
//! ```
//!
//! Work metadata is loaded eagerly when the catalog is opened; chapter lists are
//! read on demand.

mod records;

#[cfg(test)]
pub(crate) mod fixtures;

pub use records::*;

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{Chapter, Genre, Status, Tag, WorkDetail, WorkInfo, WorkSummary};

const REGISTRY_FILE: &str = "works.json";

/// Filter choices offered by the catalog view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub genres: Vec<Genre>,
    pub tags: Vec<Tag>,
    pub statuses: Vec<Status>,
}

/// Read-only access to the static catalog.
pub struct Catalog {
    root: PathBuf,
    /// Registry order
    works: Vec<WorkInfo>,
    by_slug: HashMap<String, usize>,
}

impl Catalog {
    /// Open the catalog rooted at `root`.
    pub async fn open(root: &Path) -> Result<Self, AppError> {
        let registry: Vec<RegistryEntry> = read_json(&root.join(REGISTRY_FILE))
            .await?
            .ok_or_else(|| {
                AppError::Catalog(format!("Registry {} not found", root.join(REGISTRY_FILE).display()))
            })?;

        let mut works = Vec::with_capacity(registry.len());
        let mut by_slug = HashMap::with_capacity(registry.len());

        for entry in registry {
            if by_slug.contains_key(&entry.id) {
                tracing::warn!("Duplicate registry entry {}, keeping the first", entry.id);
                continue;
            }
            let record: Option<WorkRecord> = read_json(&root.join(&entry.id).join("info.json")).await?;
            let Some(record) = record else {
                tracing::warn!("Registry entry {} has no info.json, skipping", entry.id);
                continue;
            };
            let chapters = read_chapter_list(root, &entry.id).await?;
            let info = to_work_info(record, ChapterStats::from_chapters(&chapters));
            by_slug.insert(info.summary.id.clone(), works.len());
            works.push(info);
        }

        tracing::info!("Catalog opened with {} works", works.len());

        Ok(Self {
            root: root.to_path_buf(),
            works,
            by_slug,
        })
    }

    pub fn len(&self) -> usize {
        self.works.len()
    }

    pub fn is_empty(&self) -> bool {
        self.works.is_empty()
    }

    /// Every work in registry order.
    pub fn works(&self) -> &[WorkInfo] {
        &self.works
    }

    /// Look up a work by slug.
    pub fn get_work_by_slug(&self, slug: &str) -> Option<&WorkInfo> {
        self.by_slug.get(slug).map(|&i| &self.works[i])
    }

    /// All works, newest catalog insertions first.
    pub fn list_all_works(&self) -> Vec<WorkSummary> {
        self.works
            .iter()
            .rev()
            .map(|w| w.summary.clone())
            .collect()
    }

    /// Works whose genre name matches, ignoring case.
    pub fn works_by_genre(&self, genre_name: &str) -> Vec<WorkSummary> {
        let wanted = genre_name.to_lowercase();
        self.list_all_works()
            .into_iter()
            .filter(|w| w.genre.name.to_lowercase() == wanted)
            .collect()
    }

    /// Works whose status name matches, ignoring case.
    pub fn works_by_status(&self, status_name: &str) -> Vec<WorkSummary> {
        let wanted = status_name.to_lowercase();
        self.list_all_works()
            .into_iter()
            .filter(|w| w.status.name.to_lowercase() == wanted)
            .collect()
    }

    /// Chapters of a work in file order; empty for unknown works or missing lists.
    pub async fn get_chapters_for_work(&self, slug: &str) -> Result<Vec<Chapter>, AppError> {
        if !self.by_slug.contains_key(slug) {
            return Ok(Vec::new());
        }
        read_chapter_list(&self.root, slug).await
    }

    /// One chapter, preferring its own file over the full list.
    pub async fn get_chapter(&self, slug: &str, chapter_id: u32) -> Result<Option<Chapter>, AppError> {
        if !self.by_slug.contains_key(slug) {
            return Ok(None);
        }

        let single = self
            .root
            .join(slug)
            .join("chapters")
            .join(format!("{}.json", chapter_id));
        if let Some(chapter) = read_json::<Chapter>(&single).await? {
            return Ok(Some(chapter));
        }

        let chapters = read_chapter_list(&self.root, slug).await?;
        Ok(chapters.into_iter().find(|c| c.id == chapter_id))
    }

    /// Work metadata together with its chapters.
    pub async fn load_detail(&self, slug: &str) -> Result<Option<WorkDetail>, AppError> {
        let Some(info) = self.get_work_by_slug(slug) else {
            return Ok(None);
        };
        let chapters = self.get_chapters_for_work(slug).await?;
        Ok(Some(WorkDetail {
            info: info.clone(),
            chapters,
        }))
    }

    /// Distinct genres, tags and statuses, sorted by id.
    ///
    /// A non-empty `tag_allowlist` restricts the offered tags.
    pub fn filter_options(&self, tag_allowlist: &[u32]) -> FilterOptions {
        let mut genres = BTreeMap::new();
        let mut tags = BTreeMap::new();
        let mut statuses = BTreeMap::new();

        for work in &self.works {
            let summary = &work.summary;
            genres
                .entry(summary.genre.id)
                .or_insert_with(|| summary.genre.clone());
            statuses
                .entry(summary.status.id)
                .or_insert_with(|| summary.status.clone());
            for tag in &summary.tags {
                if tag_allowlist.is_empty() || tag_allowlist.contains(&tag.id) {
                    tags.entry(tag.id).or_insert_with(|| tag.clone());
                }
            }
        }

        FilterOptions {
            genres: genres.into_values().collect(),
            tags: tags.into_values().collect(),
            statuses: statuses.into_values().collect(),
        }
    }
}

async fn read_chapter_list(root: &Path, slug: &str) -> Result<Vec<Chapter>, AppError> {
    let list: Option<ChapterListRecord> = read_json(&root.join(slug).join("chapters.json")).await?;
    Ok(list.unwrap_or_default().chapters)
}

/// Read and parse a JSON file; a missing file is `None`.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, AppError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(AppError::Catalog(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| AppError::Catalog(format!("Malformed {}: {}", path.display(), e)))
}
