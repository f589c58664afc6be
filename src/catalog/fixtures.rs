//! Temporary on-disk catalogs for tests.

use std::cell::RefCell;
use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use tempfile::TempDir;

use super::Catalog;

pub fn genre_name(id: u32) -> String {
    match id {
        1 => "Webtoon".to_string(),
        4 => "Shoujo".to_string(),
        _ => format!("Genre {}", id),
    }
}

pub fn tag_name(id: u32) -> String {
    match id {
        3 => "Fantasy".to_string(),
        5 => "Romance".to_string(),
        _ => format!("Tag {}", id),
    }
}

/// Builder for one work written by [`CatalogFixture::add_work`].
#[derive(Debug, Clone)]
pub struct WorkSpec {
    pub id: String,
    pub title: String,
    pub description: String,
    pub genre_id: u32,
    pub tag_ids: Vec<u32>,
    pub status_id: u32,
    pub chapters: u32,
    /// Publication time of the first chapter
    pub first_published: DateTime<Utc>,
}

impl WorkSpec {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: format!("Work {}", id),
            description: String::new(),
            genre_id: 1,
            tag_ids: Vec::new(),
            status_id: 1,
            chapters: 0,
            first_published: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn genre(mut self, genre_id: u32) -> Self {
        self.genre_id = genre_id;
        self
    }

    pub fn tags(mut self, tag_ids: &[u32]) -> Self {
        self.tag_ids = tag_ids.to_vec();
        self
    }

    pub fn status(mut self, status_id: u32) -> Self {
        self.status_id = status_id;
        self
    }

    pub fn chapters(mut self, count: u32) -> Self {
        self.chapters = count;
        self
    }

    /// Shift publication dates so works sort deterministically by update time.
    pub fn published_days_after_epoch(mut self, days: i64) -> Self {
        self.first_published = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::days(days);
        self
    }
}

/// A catalog directory that lives as long as the fixture.
pub struct CatalogFixture {
    dir: TempDir,
    registry: RefCell<Vec<String>>,
}

impl CatalogFixture {
    pub fn new() -> Self {
        let fixture = Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
            registry: RefCell::new(Vec::new()),
        };
        fixture.write_registry();
        fixture
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub async fn open(&self) -> Catalog {
        Catalog::open(self.path()).await.expect("Failed to open catalog")
    }

    pub fn add_work(&self, spec: &WorkSpec) {
        let work_dir = self.path().join(&spec.id);
        std::fs::create_dir_all(&work_dir).unwrap();

        let tags: Vec<_> = spec
            .tag_ids
            .iter()
            .map(|&id| json!({"id": id, "name": tag_name(id)}))
            .collect();

        let info = json!({
            "id": spec.id,
            "meta": {
                "title": spec.title,
                "alt_title": "",
                "description": spec.description,
                "year": 2024,
                "status": {"id": spec.status_id, "name": format!("Status {}", spec.status_id)},
            },
            "images": {"cover": format!("covers/{}.webp", spec.id), "banner": ""},
            "genre": {"id": spec.genre_id, "name": genre_name(spec.genre_id), "slug": genre_name(spec.genre_id).to_lowercase()},
            "tags": tags,
        });
        std::fs::write(work_dir.join("info.json"), info.to_string()).unwrap();

        let chapters: Vec<_> = (1..=spec.chapters)
            .map(|n| {
                json!({
                    "id": n,
                    "title": format!("Chapter {}", n),
                    "number": n as f64,
                    "published_at": (spec.first_published + Duration::hours(n as i64)).to_rfc3339(),
                    "pages": [format!("{}/{}/001.webp", spec.id, n)],
                })
            })
            .collect();
        std::fs::write(
            work_dir.join("chapters.json"),
            json!({ "chapters": chapters }).to_string(),
        )
        .unwrap();

        self.register_only(&spec.id);
    }

    /// Add a registry entry without any files behind it.
    pub fn register_only(&self, id: &str) {
        self.registry.borrow_mut().push(id.to_string());
        self.write_registry();
    }

    pub fn write_single_chapter(&self, work_id: &str, chapter_id: u32, title: &str) {
        let dir = self.path().join(work_id).join("chapters");
        std::fs::create_dir_all(&dir).unwrap();
        let chapter = json!({
            "id": chapter_id,
            "title": title,
            "number": chapter_id as f64,
            "published_at": "2024-02-01T00:00:00Z",
            "pages": [],
        });
        std::fs::write(dir.join(format!("{}.json", chapter_id)), chapter.to_string()).unwrap();
    }

    fn write_registry(&self) {
        let entries: Vec<_> = self
            .registry
            .borrow()
            .iter()
            .map(|id| json!({"id": id}))
            .collect();
        std::fs::write(
            self.path().join("works.json"),
            serde_json::Value::Array(entries).to_string(),
        )
        .unwrap();
    }
}
