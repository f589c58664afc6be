//! Configuration module for the webtoon client.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Works shown on the home page shelf when nothing is configured.
const DEFAULT_RECOMMENDED: &[&str] = &[
    "o-lamento-da-sereia",
    "o-deus-demonio-cssmtz",
    "eu-me-tornei-a-serva-do-tirano",
    "minhas-discipulas-sao-todas-futuras-mestras-celestiais",
];

/// Works shown on the catalog page shelf when nothing is configured.
const DEFAULT_TRENDING: &[&str] = &[
    "o-ponto-de-vista-do-leitor-oniscienteee",
    "me-escolhe",
    "serei-a-matriarca-nessa-vida",
    "o-domador-genio-da-academia",
];

pub const DEFAULT_PAGE_SIZE: usize = 24;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 500;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Plain,
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `works.json` and one folder per work
    pub catalog_dir: PathBuf,
    /// Path to the SQLite database backing the local store
    pub db_path: PathBuf,
    /// Directory for persisted key/value entries (feed caches, filter memory)
    pub storage_dir: PathBuf,
    /// Base URL of a PostgREST-compatible remote store; local SQLite when unset
    pub store_url: Option<String>,
    /// API key sent to the remote store
    pub store_key: Option<String>,
    /// Base URL of a remote feed search endpoint; local catalog when unset
    pub feed_url: Option<String>,
    /// Items per feed page
    pub page_size: usize,
    /// Quiet period before a typed search term is applied
    pub search_debounce: Duration,
    pub recommended_slugs: Vec<String>,
    pub trending_slugs: Vec<String>,
    /// Tag ids offered as catalog filters; every catalog tag when empty
    pub tag_allowlist: Vec<u32>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let catalog_dir = env::var("WEBTOON_CATALOG_DIR")
            .unwrap_or_else(|_| "./data/works".to_string())
            .into();

        let db_path = env::var("WEBTOON_DB_PATH")
            .unwrap_or_else(|_| "./data/store.sqlite".to_string())
            .into();

        let storage_dir = env::var("WEBTOON_STORAGE_DIR")
            .unwrap_or_else(|_| "./data/storage".to_string())
            .into();

        let store_url = non_empty(env::var("WEBTOON_STORE_URL").ok());
        let store_key = non_empty(env::var("WEBTOON_STORE_KEY").ok());
        let feed_url = non_empty(env::var("WEBTOON_FEED_URL").ok());

        let page_size = parse_or("WEBTOON_PAGE_SIZE", DEFAULT_PAGE_SIZE).max(1);
        let search_debounce = Duration::from_millis(parse_or(
            "WEBTOON_SEARCH_DEBOUNCE_MS",
            DEFAULT_SEARCH_DEBOUNCE_MS,
        ));

        let recommended_slugs = env::var("WEBTOON_RECOMMENDED_SLUGS")
            .map(|v| split_list(&v))
            .unwrap_or_else(|_| DEFAULT_RECOMMENDED.iter().map(|s| s.to_string()).collect());

        let trending_slugs = env::var("WEBTOON_TRENDING_SLUGS")
            .map(|v| split_list(&v))
            .unwrap_or_else(|_| DEFAULT_TRENDING.iter().map(|s| s.to_string()).collect());

        let tag_allowlist = env::var("WEBTOON_TAG_ALLOWLIST")
            .map(|v| {
                split_list(&v)
                    .iter()
                    .filter_map(|s| s.parse().ok())
                    .collect()
            })
            .unwrap_or_default();

        let log_level = env::var("WEBTOON_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match env::var("WEBTOON_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Plain,
        };

        Self {
            catalog_dir,
            db_path,
            storage_dir,
            store_url,
            store_key,
            feed_url,
            page_size,
            search_debounce,
            recommended_slugs,
            trending_slugs,
            tag_allowlist,
            log_level,
            log_format,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<T: std::str::FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid {} value {:?}, using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        for key in [
            "WEBTOON_CATALOG_DIR",
            "WEBTOON_DB_PATH",
            "WEBTOON_STORAGE_DIR",
            "WEBTOON_STORE_URL",
            "WEBTOON_STORE_KEY",
            "WEBTOON_FEED_URL",
            "WEBTOON_PAGE_SIZE",
            "WEBTOON_SEARCH_DEBOUNCE_MS",
            "WEBTOON_RECOMMENDED_SLUGS",
            "WEBTOON_TRENDING_SLUGS",
            "WEBTOON_TAG_ALLOWLIST",
            "WEBTOON_LOG_LEVEL",
            "WEBTOON_LOG_FORMAT",
        ] {
            env::remove_var(key);
        }

        let config = Config::from_env();

        assert_eq!(config.catalog_dir, PathBuf::from("./data/works"));
        assert_eq!(config.db_path, PathBuf::from("./data/store.sqlite"));
        assert!(config.store_url.is_none());
        assert!(config.feed_url.is_none());
        assert_eq!(config.page_size, 24);
        assert_eq!(config.search_debounce, Duration::from_millis(500));
        assert_eq!(config.recommended_slugs.len(), 4);
        assert_eq!(config.trending_slugs.len(), 4);
        assert!(config.tag_allowlist.is_empty());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Plain);
    }

    #[test]
    fn test_split_list_skips_blanks() {
        assert_eq!(split_list(" a, ,b ,"), vec!["a".to_string(), "b".to_string()]);
    }
}
