//! Local persistent key/value storage.
//!
//! Each key is one JSON file under the storage directory. Reads fail open: a
//! missing, unreadable or malformed entry is reported as absent.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::errors::AppError;

/// Well-known keys.
pub mod keys {
    /// Genre last selected on the home feed
    pub const HOME_GENRE: &str = "home_feed.genre";
    /// Genre last selected on the catalog feed
    pub const CATALOG_GENRE: &str = "catalog_feed.genre";
    pub const SHELF_RECOMMENDED: &str = "shelf.recommended";
    pub const SHELF_TRENDING: &str = "shelf.trending";
}

/// JSON entries stored as files in one directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    /// Open the storage directory, creating it if needed.
    pub async fn open(dir: &Path) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(dir).await?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file))
    }

    /// Raw JSON of an entry.
    pub async fn read_value(&self, key: &str) -> Option<Value> {
        let path = self.path_for(key);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Storage miss for {}", key);
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to read storage entry {}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring malformed storage entry {}: {}", key, e);
                None
            }
        }
    }

    /// Typed entry; `None` when absent or not of shape `T`.
    pub async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.read_value(key).await?;
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Ignoring storage entry {} of unexpected shape: {}", key, e);
                None
            }
        }
    }

    /// Overwrite an entry.
    pub async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let raw = serde_json::to_string(value)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Overwrite an entry only when its JSON differs; returns whether it wrote.
    pub async fn write_if_changed<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<bool, AppError> {
        let next = serde_json::to_value(value)?;
        if self.read_value(key).await.as_ref() == Some(&next) {
            tracing::debug!("Storage entry {} unchanged", key);
            return Ok(false);
        }
        self.write_json(key, &next).await?;
        Ok(true)
    }

    pub async fn remove(&self, key: &str) -> Result<(), AppError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
