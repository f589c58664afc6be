//! Persisted page-1 snapshots for stale-while-revalidate.

use std::fmt;

use crate::models::{FilterSnapshot, WorkSummary};
use crate::storage::LocalStorage;

use super::FeedKind;

/// Storage key of a cached page-1 list.
///
/// Covers exactly the dimensions that change result content: feed kind, genre,
/// tag set and status. Searches are never cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_snapshot(kind: FeedKind, snapshot: &FilterSnapshot) -> Option<Self> {
        if snapshot.has_search() {
            return None;
        }

        let mut dimensions = vec![format!("g{}", snapshot.genre_id)];
        if !snapshot.tag_ids.is_empty() {
            let tags: Vec<String> = snapshot.tag_ids.iter().map(u32::to_string).collect();
            dimensions.push(format!("t{}", tags.join("-")));
        }
        if let Some(status_id) = snapshot.status_id {
            dimensions.push(format!("s{}", status_id));
        }

        Some(Self(format!(
            "feed.{}.{}",
            kind.as_str(),
            dimensions.join(".")
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The cached list for `key`, if any.
pub async fn load(storage: &LocalStorage, key: &CacheKey) -> Option<Vec<WorkSummary>> {
    let items: Vec<WorkSummary> = storage.read_json(key.as_str()).await?;
    tracing::debug!("Feed cache hit for {} with {} items", key, items.len());
    Some(items)
}

/// Persist `items` under `key` when they differ from what is stored.
///
/// Write failures are logged; the feed keeps working without its cache.
pub async fn store(storage: &LocalStorage, key: &CacheKey, items: &[WorkSummary]) -> bool {
    match storage.write_if_changed(key.as_str(), items).await {
        Ok(written) => written,
        Err(e) => {
            tracing::warn!("Failed to persist feed cache {}: {}", key, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_summary;
    use tempfile::TempDir;

    #[test]
    fn test_key_dimensions() {
        let home = CacheKey::for_snapshot(FeedKind::Home, &FilterSnapshot::for_genre(4)).unwrap();
        assert_eq!(home.as_str(), "feed.home.g4");

        let snapshot = FilterSnapshot::for_genre(1)
            .with_tag_toggled(8)
            .with_tag_toggled(3)
            .with_status_toggled(Some(2));
        let catalog = CacheKey::for_snapshot(FeedKind::Catalog, &snapshot).unwrap();
        assert_eq!(catalog.as_str(), "feed.catalog.g1.t3-8.s2");
    }

    #[test]
    fn test_keys_differ_by_tags_and_status() {
        let base = FilterSnapshot::for_genre(1);
        let tagged = base.clone().with_tag_toggled(3);
        let status = base.clone().with_status_toggled(Some(3));
        let keys = [
            CacheKey::for_snapshot(FeedKind::Catalog, &base),
            CacheKey::for_snapshot(FeedKind::Catalog, &tagged),
            CacheKey::for_snapshot(FeedKind::Catalog, &status),
            CacheKey::for_snapshot(FeedKind::Home, &base),
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_search_is_not_cached() {
        let snapshot = FilterSnapshot::default().with_search("sereia");
        assert!(CacheKey::for_snapshot(FeedKind::Catalog, &snapshot).is_none());
    }

    #[tokio::test]
    async fn test_store_writes_only_on_change() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path()).await.unwrap();
        let key = CacheKey::for_snapshot(FeedKind::Home, &FilterSnapshot::default()).unwrap();
        let items = vec![sample_summary("a"), sample_summary("b")];

        assert!(load(&storage, &key).await.is_none());
        assert!(store(&storage, &key, &items).await);
        assert!(!store(&storage, &key, &items).await);
        assert_eq!(load(&storage, &key).await.unwrap(), items);
    }
}
