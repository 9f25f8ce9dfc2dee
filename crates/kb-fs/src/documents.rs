//! Local document repository
//!
//! Scans a dataset directory (non-recursively) for markdown files and loads
//! each one into a fingerprinted [`LocalDocument`].

use std::fs;
use std::path::{Path, PathBuf};

use crate::fingerprint::fingerprint;
use crate::{Error, Result};

/// File extension eligible for sync.
pub const SYNC_EXTENSION: &str = "md";

/// A local file selected for sync.
///
/// Built fresh on every pass and never mutated; the fingerprint is computed
/// once from `content` at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDocument {
    filename: String,
    path: PathBuf,
    content: String,
    fingerprint: String,
}

impl LocalDocument {
    /// Create a document, computing its fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDocument`] if `filename` is empty or blank.
    pub fn new(
        filename: impl Into<String>,
        path: impl Into<PathBuf>,
        content: impl Into<String>,
    ) -> Result<Self> {
        let filename = filename.into();
        if filename.trim().is_empty() {
            return Err(Error::InvalidDocument {
                message: "filename cannot be empty".to_string(),
            });
        }

        let content = content.into();
        let fingerprint = fingerprint(&content);
        Ok(Self {
            filename,
            path: path.into(),
            content,
            fingerprint,
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Whether a remotely stored fingerprint matches this document.
    ///
    /// An absent fingerprint never matches.
    pub fn fingerprint_matches(&self, other: Option<&str>) -> bool {
        other.is_some_and(|fp| fp == self.fingerprint)
    }
}

/// Load every sync-eligible document directly inside `dir`.
///
/// Subdirectories are not descended into. The result is sorted by filename.
///
/// # Errors
///
/// Returns [`Error::PathNotFound`] if `dir` does not exist, or
/// [`Error::Io`] if the directory or one of its files cannot be read.
pub fn load_documents(dir: &Path) -> Result<Vec<LocalDocument>> {
    if !dir.exists() {
        return Err(Error::PathNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut documents = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| Error::io(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(SYNC_EXTENSION) {
            continue;
        }

        let filename = entry.file_name().to_string_lossy().into_owned();
        let content = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        documents.push(LocalDocument::new(filename, path, content)?);
    }

    documents.sort_by(|a, b| a.filename.cmp(&b.filename));
    tracing::debug!(dir = %dir.display(), count = documents.len(), "Loaded local documents");

    Ok(documents)
}
