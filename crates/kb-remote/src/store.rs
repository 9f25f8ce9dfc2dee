//! The knowledge store seam and the per-dataset directory view

use std::sync::Arc;

use async_trait::async_trait;

use crate::document::{
    Dataset, DocumentUpdate, IndexingOptions, NewDataset, NewDocument, RemoteDocument,
};
use crate::Result;

/// Operations the sync engine needs from a remote knowledge store.
///
/// [`crate::KnowledgeClient`] implements this over HTTP; tests use an
/// in-memory implementation.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// All datasets visible to the credential, across every page.
    async fn list_datasets(&self) -> Result<Vec<Dataset>>;

    async fn create_dataset(&self, request: &NewDataset) -> Result<Dataset>;

    /// All documents of a dataset, across every page.
    async fn list_documents(&self, dataset_id: &str) -> Result<Vec<RemoteDocument>>;

    /// Create a document; indexing starts asynchronously on the server.
    async fn create_document(
        &self,
        dataset_id: &str,
        request: &NewDocument,
    ) -> Result<RemoteDocument>;

    /// Replace a document's content; resets its indexing status.
    async fn update_document(
        &self,
        dataset_id: &str,
        document_id: &str,
        request: &DocumentUpdate,
    ) -> Result<RemoteDocument>;

    async fn delete_document(&self, dataset_id: &str, document_id: &str) -> Result<()>;
}

/// A [`KnowledgeStore`] scoped to one dataset.
#[derive(Clone)]
pub struct DatasetDirectory {
    store: Arc<dyn KnowledgeStore>,
    dataset_id: String,
}

impl DatasetDirectory {
    pub fn new(store: Arc<dyn KnowledgeStore>, dataset_id: impl Into<String>) -> Self {
        Self {
            store,
            dataset_id: dataset_id.into(),
        }
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub async fn list(&self) -> Result<Vec<RemoteDocument>> {
        self.store.list_documents(&self.dataset_id).await
    }

    pub async fn create(
        &self,
        name: &str,
        content: &str,
        fingerprint: &str,
        options: &IndexingOptions,
    ) -> Result<RemoteDocument> {
        let request = NewDocument {
            name: name.to_string(),
            text: content.to_string(),
            fingerprint: fingerprint.to_string(),
            options: *options,
        };
        self.store.create_document(&self.dataset_id, &request).await
    }

    pub async fn update(
        &self,
        id: &str,
        name: &str,
        content: &str,
        fingerprint: &str,
    ) -> Result<RemoteDocument> {
        let request = DocumentUpdate {
            name: name.to_string(),
            text: content.to_string(),
            fingerprint: fingerprint.to_string(),
        };
        self.store
            .update_document(&self.dataset_id, id, &request)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete_document(&self.dataset_id, id).await
    }
}

impl std::fmt::Debug for DatasetDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetDirectory")
            .field("dataset_id", &self.dataset_id)
            .finish_non_exhaustive()
    }
}
