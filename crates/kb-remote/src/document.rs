//! Domain values for the remote knowledge store
//!
//! These are the validated shapes the rest of the workspace works with.
//! Wire payloads are converted into them in [`crate::models`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Indexing state of a remote document.
///
/// `Pending` covers every in-progress server state (waiting, parsing,
/// splitting, indexing, paused, ...). `Completed` and `Error` are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexingStatus {
    Pending,
    Completed,
    /// Indexing failed with the given server message.
    Error(String),
}

impl IndexingStatus {
    /// Map a server status string (plus its optional error text).
    pub fn from_wire(status: &str, error: Option<String>) -> Self {
        match status {
            "completed" => IndexingStatus::Completed,
            "error" => IndexingStatus::Error(
                error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| "unknown indexing error".to_string()),
            ),
            _ => IndexingStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, IndexingStatus::Pending)
    }
}

impl fmt::Display for IndexingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexingStatus::Pending => write!(f, "pending"),
            IndexingStatus::Completed => write!(f, "completed"),
            IndexingStatus::Error(_) => write!(f, "error"),
        }
    }
}

/// A document already present in a remote dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocument {
    pub id: String,
    pub name: String,
    pub status: IndexingStatus,
    /// Fingerprint saved as document metadata by a previous sync.
    pub stored_fingerprint: Option<String>,
}

impl RemoteDocument {
    /// Server-side error message, present iff indexing failed.
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            IndexingStatus::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// A remote collection of documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dataset {
    pub id: String,
    pub name: String,
}

/// Indexing quality requested when a document is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexingTechnique {
    #[default]
    HighQuality,
    Economy,
}

impl fmt::Display for IndexingTechnique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexingTechnique::HighQuality => write!(f, "high_quality"),
            IndexingTechnique::Economy => write!(f, "economy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessMode {
    #[default]
    Automatic,
    Custom,
}

/// Segmentation rule applied by the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProcessRule {
    #[serde(default)]
    pub mode: ProcessMode,
}

/// Options passed to the store on document creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexingOptions {
    pub technique: IndexingTechnique,
    pub process_rule: ProcessRule,
}

/// Request to create a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub name: String,
    pub text: String,
    pub fingerprint: String,
    pub options: IndexingOptions,
}

/// Request to replace the content of an existing document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpdate {
    pub name: String,
    pub text: String,
    pub fingerprint: String,
}

/// Request to create a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDataset {
    pub name: String,
    pub description: String,
    pub technique: IndexingTechnique,
    pub permission: String,
}

impl NewDataset {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            technique: IndexingTechnique::default(),
            permission: "only_me".to_string(),
        }
    }

    pub fn with_technique(mut self, technique: IndexingTechnique) -> Self {
        self.technique = technique;
        self
    }
}
