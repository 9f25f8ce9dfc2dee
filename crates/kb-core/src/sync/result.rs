//! Per-dataset sync results

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// The operation that produced a [`SyncError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedOperation {
    Create,
    Update,
    Delete,
    ResolveDataset,
    LoadDocuments,
    ListDocuments,
    AwaitIndexing,
}

impl fmt::Display for FailedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailedOperation::Create => "create",
            FailedOperation::Update => "update",
            FailedOperation::Delete => "delete",
            FailedOperation::ResolveDataset => "resolve dataset",
            FailedOperation::LoadDocuments => "load documents",
            FailedOperation::ListDocuments => "list documents",
            FailedOperation::AwaitIndexing => "await indexing",
        };
        f.write_str(name)
    }
}

/// A failure recorded against one document, or against the whole dataset
/// when `filename` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncError {
    pub filename: Option<String>,
    pub operation: FailedOperation,
    pub message: String,
}

impl SyncError {
    pub fn item(filename: impl Into<String>, operation: FailedOperation, message: impl fmt::Display) -> Self {
        Self {
            filename: Some(filename.into()),
            operation,
            message: message.to_string(),
        }
    }

    pub fn dataset(operation: FailedOperation, message: impl fmt::Display) -> Self {
        Self {
            filename: None,
            operation,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.filename {
            Some(filename) => write!(f, "{} {}: {}", self.operation, filename, self.message),
            None => write!(f, "{}: {}", self.operation, self.message),
        }
    }
}

/// Outcome of syncing one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    /// Configured dataset id or name
    pub dataset: String,
    /// Resolved remote id, absent when resolution failed
    pub dataset_id: Option<String>,
    pub path: PathBuf,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub errors: Vec<SyncError>,
    pub warnings: Vec<String>,
}

impl SyncResult {
    pub fn new(dataset: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            dataset: dataset.into(),
            dataset_id: None,
            path: path.into(),
            created: 0,
            updated: 0,
            deleted: 0,
            skipped: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Successful creates, updates, deletes and skips
    pub fn total_processed(&self) -> usize {
        self.created + self.updated + self.deleted + self.skipped
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether the dataset was skipped because its local directory is missing
    pub fn is_path_missing(&self) -> bool {
        self.total_processed() == 0
            && self.errors.is_empty()
            && self.warnings.iter().any(|w| w.starts_with(PATH_NOT_FOUND))
    }
}

pub(crate) const PATH_NOT_FOUND: &str = "Path not found";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_sum_into_total() {
        let mut result = SyncResult::new("docs", "/kb");
        result.created = 2;
        result.updated = 1;
        result.deleted = 3;
        result.skipped = 4;
        assert_eq!(result.total_processed(), 10);
        assert!(!result.has_errors());
    }

    #[test]
    fn sync_error_display_includes_filename() {
        let err = SyncError::item("a.md", FailedOperation::Create, "API error: 400 Bad Request");
        assert_eq!(err.to_string(), "create a.md: API error: 400 Bad Request");

        let err = SyncError::dataset(FailedOperation::ResolveDataset, "Dataset not found: x");
        assert_eq!(err.to_string(), "resolve dataset: Dataset not found: x");
    }

    #[test]
    fn path_missing_requires_warning_and_no_activity() {
        let mut result = SyncResult::new("docs", "/missing");
        assert!(!result.is_path_missing());

        result.warnings.push(format!("{PATH_NOT_FOUND}: /missing"));
        assert!(result.is_path_missing());

        result.skipped = 1;
        assert!(!result.is_path_missing());
    }

    #[test]
    fn serializes_operation_in_snake_case() {
        let err = SyncError::dataset(FailedOperation::AwaitIndexing, "timed out");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["operation"], "await_indexing");
        assert_eq!(value["filename"], serde_json::Value::Null);
    }
}
