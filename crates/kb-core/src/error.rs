//! Error types for kb-core

use std::path::PathBuf;

/// Result type for kb-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in kb-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Sync configuration has the wrong shape or invalid values
    #[error("Invalid config at {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    /// A dataset name did not resolve and auto-creation is off
    #[error("Dataset not found: {name}")]
    DatasetNotFound { name: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from kb-fs
    #[error(transparent)]
    Fs(#[from] kb_fs::Error),

    /// Remote store error from kb-remote
    #[error(transparent)]
    Remote(#[from] kb_remote::Error),
}
