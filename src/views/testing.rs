//! Application state over temporary directories.

use std::time::Duration;

use tempfile::TempDir;

use crate::catalog::fixtures::CatalogFixture;
use crate::config::{Config, LogFormat};
use crate::AppState;

pub fn test_config(catalog: &CatalogFixture, dir: &TempDir) -> Config {
    Config {
        catalog_dir: catalog.path().to_path_buf(),
        db_path: dir.path().join("store.sqlite"),
        storage_dir: dir.path().join("storage"),
        store_url: None,
        store_key: None,
        feed_url: None,
        page_size: 24,
        search_debounce: Duration::from_millis(300),
        recommended_slugs: Vec::new(),
        trending_slugs: Vec::new(),
        tag_allowlist: Vec::new(),
        log_level: "warn".to_string(),
        log_format: LogFormat::Plain,
    }
}

pub async fn app_state(catalog: &CatalogFixture, dir: &TempDir) -> AppState {
    AppState::init(test_config(catalog, dir))
        .await
        .expect("Failed to build app state")
}
