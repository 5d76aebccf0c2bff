use thiserror::Error;

/// Errors that can occur during recipe import and export operations
#[derive(Error, Debug)]
pub enum ImportError {
    /// The input could not be decoded as the expected container format at all
    #[error("Failed to decode input: {0}")]
    DecodeError(String),

    /// The input decoded but held no recipes
    #[error("No recipe data found in input")]
    NoDataFound,

    /// The file extension does not map to a known import format
    #[error("Unsupported import format: {0}")]
    UnsupportedFormat(String),

    /// Failed to fetch a web page or image
    #[error("Failed to fetch URL: {0}")]
    FetchError(#[from] reqwest::Error),

    /// Relational store failure
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// Image blob store failure
    #[error("Image store error: {0}")]
    ImageStoreError(String),

    /// A persisted row held data that could not be read back
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),
}

impl ImportError {
    /// True for failures that concern the whole input rather than one recipe.
    pub fn is_container_level(&self) -> bool {
        matches!(
            self,
            ImportError::DecodeError(_) | ImportError::NoDataFound | ImportError::UnsupportedFormat(_)
        )
    }
}

pub type Result<T, E = ImportError> = std::result::Result<T, E>;
