//! Error handling module for the webtoon client.
//!
//! Every operation boundary converts failures into an [`AppError`]; callers turn
//! those into local state transitions instead of propagating them further.

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const FETCH_ERROR: &str = "FETCH_ERROR";
    pub const STORE_ERROR: &str = "STORE_ERROR";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const SEARCH_ERROR: &str = "SEARCH_ERROR";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const CATALOG_ERROR: &str = "CATALOG_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Application error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// No authenticated session
    Unauthorized(String),
    /// Work, chapter or profile does not exist
    NotFound(String),
    /// Rejected input
    Validation(String),
    /// Transient network or service failure
    Fetch(String),
    /// Remote store rejected the request
    Store(String),
    /// Local database error
    Database(String),
    /// Search index error
    Search(String),
    /// Local persistent storage error
    Storage(String),
    /// Malformed or unreadable catalog file
    Catalog(String),
    /// Anything else
    Internal(String),
}

impl AppError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::Fetch(_) => codes::FETCH_ERROR,
            AppError::Store(_) => codes::STORE_ERROR,
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::Search(_) => codes::SEARCH_ERROR,
            AppError::Storage(_) => codes::STORAGE_ERROR,
            AppError::Catalog(_) => codes::CATALOG_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        match self {
            AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Fetch(msg)
            | AppError::Store(msg)
            | AppError::Database(msg)
            | AppError::Search(msg)
            | AppError::Storage(msg)
            | AppError::Catalog(msg)
            | AppError::Internal(msg) => msg,
        }
    }

    /// Whether re-triggering the same user action may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Fetch(_) | AppError::Store(_) | AppError::Database(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

impl From<tantivy::TantivyError> for AppError {
    fn from(err: tantivy::TantivyError) -> Self {
        tracing::error!("Search error: {:?}", err);
        AppError::Search(format!("Search error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Internal(format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("HTTP error: {:?}", err);
        AppError::Fetch(format!("HTTP error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("I/O error: {:?}", err);
        AppError::Storage(format!("I/O error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = AppError::NotFound("Work solo-leveling not found".to_string());
        assert_eq!(err.to_string(), "NOT_FOUND: Work solo-leveling not found");
    }

    #[test]
    fn test_transient_classification() {
        assert!(AppError::Fetch("timeout".to_string()).is_transient());
        assert!(AppError::Store("503".to_string()).is_transient());
        assert!(!AppError::NotFound("x".to_string()).is_transient());
        assert!(!AppError::Validation("x".to_string()).is_transient());
    }

    #[test]
    fn test_json_error_conversion() {
        let err: AppError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(err.error_code(), codes::INTERNAL_ERROR);
    }
}
