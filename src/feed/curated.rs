//! Curated shelves: fixed lists of works served stale-while-revalidate.

use crate::catalog::Catalog;
use crate::models::WorkSummary;
use crate::storage::LocalStorage;

/// A configured list of slugs resolved against the catalog.
#[derive(Debug, Clone)]
pub struct CuratedShelf {
    key: String,
    slugs: Vec<String>,
    items: Vec<WorkSummary>,
}

impl CuratedShelf {
    /// Create the shelf, seeded from its cached copy when one exists.
    pub async fn open(key: &str, slugs: Vec<String>, storage: &LocalStorage) -> Self {
        let items = storage.read_json(key).await.unwrap_or_default();
        Self {
            key: key.to_string(),
            slugs,
            items,
        }
    }

    pub fn items(&self) -> &[WorkSummary] {
        &self.items
    }

    /// Reload from the catalog, skipping unknown slugs, and persist the result
    /// when it changed. Returns whether the shelf changed.
    pub async fn refresh(&mut self, catalog: &Catalog, storage: &LocalStorage) -> bool {
        let fresh: Vec<WorkSummary> = self
            .slugs
            .iter()
            .filter_map(|slug| match catalog.get_work_by_slug(slug) {
                Some(work) => Some(work.summary.clone()),
                None => {
                    tracing::debug!("Shelf {} skips unknown work {}", self.key, slug);
                    None
                }
            })
            .collect();

        if fresh == self.items {
            return false;
        }
        self.items = fresh;
        if let Err(e) = storage.write_if_changed(&self.key, &self.items).await {
            tracing::warn!("Failed to persist shelf {}: {}", self.key, e);
        }
        true
    }
}
