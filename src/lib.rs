//! Webtoon client
//!
//! A content-browsing client for a serialized-fiction platform: paginated,
//! filterable feeds over a local JSON catalog, work and chapter pages, and the
//! per-user favorites, ratings, comments and read history kept in a remote store.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod errors;
pub mod feed;
pub mod models;
pub mod search;
pub mod social;
pub mod storage;
pub mod store;
pub mod views;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::SessionHub;
use catalog::Catalog;
use config::{Config, LogFormat};
use db::Repository;
use errors::AppError;
use feed::{CatalogFeedSource, FeedSource, HttpFeedSource};
use search::CatalogIndex;
use storage::LocalStorage;
use store::rest::RestStore;
use store::RemoteStore;

/// Application state shared by every view.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<Catalog>,
    pub index: Arc<CatalogIndex>,
    pub store: Arc<dyn RemoteStore>,
    pub session: SessionHub,
    pub storage: LocalStorage,
    pub feed_source: Arc<dyn FeedSource>,
}

impl AppState {
    /// Open the catalog, build the search index and connect the stores named
    /// by `config`.
    pub async fn init(config: Config) -> Result<Self, AppError> {
        let catalog = Arc::new(Catalog::open(&config.catalog_dir).await?);

        tracing::info!("Building search index...");
        let index = Arc::new(CatalogIndex::build(catalog.works())?);
        tracing::info!("Search index built with {} works", catalog.len());

        let session = SessionHub::new();

        let store: Arc<dyn RemoteStore> = match (&config.store_url, &config.store_key) {
            (Some(url), Some(key)) => {
                tracing::info!("Using remote store at {}", url);
                Arc::new(RestStore::new(url, key, session.clone())?)
            }
            (Some(url), None) => {
                return Err(AppError::Validation(format!(
                    "Remote store {} configured without WEBTOON_STORE_KEY",
                    url
                )));
            }
            _ => {
                tracing::info!("Using local store at {:?}", config.db_path);
                let pool = db::init_database(&config.db_path).await?;
                Arc::new(Repository::new(pool))
            }
        };

        let storage = LocalStorage::open(&config.storage_dir).await?;

        let feed_source: Arc<dyn FeedSource> = match &config.feed_url {
            Some(url) => {
                tracing::info!("Fetching feed pages from {}", url);
                Arc::new(HttpFeedSource::new(url, config.store_key.clone())?)
            }
            None => Arc::new(CatalogFeedSource::new(catalog.clone(), index.clone())),
        };

        Ok(Self {
            config: Arc::new(config),
            catalog,
            index,
            store,
            session,
            storage,
            feed_source,
        })
    }
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the configured
/// level.
pub fn init_tracing(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Plain => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}
