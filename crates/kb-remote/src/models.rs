//! Knowledge API wire models (serde) and their validation step.
//!
//! Response payloads are deserialized leniently (every field optional) and
//! then converted into domain values with `TryFrom`, which rejects payloads
//! missing required fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{
    Dataset, IndexingStatus, IndexingTechnique, ProcessRule, RemoteDocument,
};
use crate::error::Error;

/// Metadata key holding the synced content fingerprint.
pub const SOURCE_HASH_KEY: &str = "source_hash";

/// One page of a paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    /// Whether another page follows.
    #[serde(default)]
    pub has_more: bool,
}

/// Document as returned by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentPayload {
    pub id: Option<String>,
    pub name: Option<String>,
    pub indexing_status: Option<String>,
    pub error: Option<String>,
    /// Either an object (`{"source_hash": ...}`) or a list of
    /// `{"name": ..., "value": ...}` entries, depending on server version.
    pub doc_metadata: Option<Value>,
}

impl DocumentPayload {
    fn source_hash(&self) -> Option<String> {
        match self.doc_metadata.as_ref()? {
            Value::Object(map) => map.get(SOURCE_HASH_KEY)?.as_str().map(str::to_string),
            Value::Array(entries) => entries
                .iter()
                .find(|e| e.get("name").and_then(Value::as_str) == Some(SOURCE_HASH_KEY))
                .and_then(|e| e.get("value"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    }
}

impl TryFrom<DocumentPayload> for RemoteDocument {
    type Error = Error;

    fn try_from(payload: DocumentPayload) -> Result<Self, Self::Error> {
        let stored_fingerprint = payload.source_hash();
        let id = payload
            .id
            .ok_or_else(|| Error::invalid_payload("document is missing `id`"))?;
        let name = payload
            .name
            .ok_or_else(|| Error::invalid_payload(format!("document {id} is missing `name`")))?;
        let status = payload.indexing_status.ok_or_else(|| {
            Error::invalid_payload(format!("document {id} is missing `indexing_status`"))
        })?;

        Ok(RemoteDocument {
            id,
            name,
            status: IndexingStatus::from_wire(&status, payload.error),
            stored_fingerprint,
        })
    }
}

/// Response to create/update-by-text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEnvelope {
    pub document: DocumentPayload,
    #[serde(default)]
    pub batch: Option<String>,
}

/// Dataset as returned by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetPayload {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl TryFrom<DatasetPayload> for Dataset {
    type Error = Error;

    fn try_from(payload: DatasetPayload) -> Result<Self, Self::Error> {
        let id = payload
            .id
            .ok_or_else(|| Error::invalid_payload("dataset is missing `id`"))?;
        let name = payload
            .name
            .ok_or_else(|| Error::invalid_payload(format!("dataset {id} is missing `name`")))?;
        Ok(Dataset { id, name })
    }
}

/// Metadata written alongside document content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocMetadataBody {
    pub source_hash: String,
    pub synced_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDocumentBody {
    pub name: String,
    pub text: String,
    pub indexing_technique: IndexingTechnique,
    pub process_rule: ProcessRule,
    pub doc_metadata: DocMetadataBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDocumentBody {
    pub name: String,
    pub text: String,
    pub doc_metadata: DocMetadataBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDatasetBody {
    pub name: String,
    pub description: String,
    pub indexing_technique: IndexingTechnique,
    pub permission: String,
}
