//! Error types for kb-fs

use std::path::PathBuf;

/// Result type for kb-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in kb-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The directory configured for a dataset does not exist.
    #[error("Path not found: {path}")]
    PathNotFound { path: PathBuf },

    #[error("Invalid document: {message}")]
    InvalidDocument { message: String },

    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to parse {format} config at {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat { extension: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
