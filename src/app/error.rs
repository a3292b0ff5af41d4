use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkinshelfError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Catalog store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl SkinshelfError {
    /// Errors that abort an ingestion run instead of degrading to a per-record skip.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SkinshelfError::Navigation(_)
                | SkinshelfError::Timeout(_)
                | SkinshelfError::StoreUnavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SkinshelfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(SkinshelfError::Navigation("boom".into()).is_fatal());
        assert!(SkinshelfError::Timeout("page".into()).is_fatal());
        assert!(SkinshelfError::StoreUnavailable("locked".into()).is_fatal());
        assert!(!SkinshelfError::InvalidRecord("price".into()).is_fatal());
        assert!(!SkinshelfError::Other("x".into()).is_fatal());
    }
}
