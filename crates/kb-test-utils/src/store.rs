//! [`InMemoryStore`]: a scriptable [`KnowledgeStore`].
//!
//! Documents live in memory; indexing progress advances each time a
//! dataset's documents are listed, following the configured
//! [`IndexingBehavior`]. Writes can be made to fail by document name and
//! listings can be made to fail after a number of successful calls.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use kb_remote::{
    Dataset, DocumentUpdate, Error, IndexingStatus, IndexingTechnique, KnowledgeStore,
    NewDataset, NewDocument, RemoteDocument, Result,
};

/// How a written document progresses through indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexingBehavior {
    /// Completed as soon as it is written.
    Immediate,
    /// Reported pending for this many listings, then completed.
    AfterPolls(u32),
    /// Pending forever.
    Never,
    /// Indexing fails with the given message.
    Fail(String),
}

/// A call made against the store, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    ListDatasets,
    CreateDataset { name: String },
    ListDocuments { dataset_id: String },
    CreateDocument { dataset_id: String, name: String },
    UpdateDocument { dataset_id: String, document_id: String },
    DeleteDocument { dataset_id: String, document_id: String },
}

/// A document as held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub id: String,
    pub name: String,
    pub text: String,
    pub fingerprint: Option<String>,
    pub technique: Option<IndexingTechnique>,
    pub status: IndexingStatus,
    polls_left: Option<u32>,
}

impl StoredDocument {
    fn to_remote(&self) -> RemoteDocument {
        RemoteDocument {
            id: self.id.clone(),
            name: self.name.clone(),
            status: self.status.clone(),
            stored_fingerprint: self.fingerprint.clone(),
        }
    }

    fn start_indexing(&mut self, behavior: &IndexingBehavior) {
        let (status, polls_left) = match behavior {
            IndexingBehavior::Immediate | IndexingBehavior::AfterPolls(0) => {
                (IndexingStatus::Completed, None)
            }
            IndexingBehavior::AfterPolls(n) => (IndexingStatus::Pending, Some(*n)),
            IndexingBehavior::Never => (IndexingStatus::Pending, None),
            IndexingBehavior::Fail(message) => (IndexingStatus::Error(message.clone()), None),
        };
        self.status = status;
        self.polls_left = polls_left;
    }

    fn tick(&mut self) {
        match self.polls_left {
            Some(0) => {
                self.status = IndexingStatus::Completed;
                self.polls_left = None;
            }
            Some(n) => self.polls_left = Some(n - 1),
            None => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum WriteOp {
    Create,
    Update,
    Delete,
}

#[derive(Debug)]
struct StoreState {
    datasets: Vec<Dataset>,
    documents: HashMap<String, Vec<StoredDocument>>,
    behavior: IndexingBehavior,
    behavior_by_name: HashMap<String, IndexingBehavior>,
    failing_writes: HashSet<(WriteOp, String)>,
    listings_before_failure: Option<usize>,
    fail_dataset_listing: bool,
    calls: Vec<StoreCall>,
    next_id: u64,
}

impl StoreState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-auto-{}", self.next_id)
    }

    fn behavior_for(&self, name: &str) -> IndexingBehavior {
        self.behavior_by_name
            .get(name)
            .unwrap_or(&self.behavior)
            .clone()
    }

    fn documents_mut(&mut self, dataset_id: &str) -> Result<&mut Vec<StoredDocument>> {
        self.documents
            .get_mut(dataset_id)
            .ok_or_else(|| not_found(format!("dataset {dataset_id} not found")))
    }

    fn check_write(&self, op: WriteOp, name: &str) -> Result<()> {
        if self.failing_writes.contains(&(op, name.to_string())) {
            return Err(Error::Api {
                status: 400,
                message: format!("API error: 400 Bad Request (injected {op:?} failure)"),
                body: serde_json::json!({ "code": "injected", "document": name }),
            });
        }
        Ok(())
    }
}

fn not_found(message: String) -> Error {
    Error::Api {
        status: 404,
        message: format!("API error: 404 Not Found ({message})"),
        body: serde_json::Value::Null,
    }
}

/// In-memory [`KnowledgeStore`] with failure injection.
#[derive(Debug)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                datasets: Vec::new(),
                documents: HashMap::new(),
                behavior: IndexingBehavior::Immediate,
                behavior_by_name: HashMap::new(),
                failing_writes: HashSet::new(),
                listings_before_failure: None,
                fail_dataset_listing: false,
                calls: Vec::new(),
                next_id: 0,
            }),
        }
    }

    /// Builder form of [`add_dataset`](Self::add_dataset).
    pub fn with_dataset(self, id: &str, name: &str) -> Self {
        self.add_dataset(id, name);
        self
    }

    pub fn add_dataset(&self, id: &str, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.datasets.push(Dataset {
            id: id.to_string(),
            name: name.to_string(),
        });
        state.documents.entry(id.to_string()).or_default();
    }

    /// Insert an already-indexed document without recording a call.
    pub fn seed_document(
        &self,
        dataset_id: &str,
        name: &str,
        text: &str,
        fingerprint: Option<&str>,
    ) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id("doc");
        state
            .documents
            .entry(dataset_id.to_string())
            .or_default()
            .push(StoredDocument {
                id: id.clone(),
                name: name.to_string(),
                text: text.to_string(),
                fingerprint: fingerprint.map(str::to_string),
                technique: None,
                status: IndexingStatus::Completed,
                polls_left: None,
            });
        id
    }

    /// Indexing behaviour for documents written from now on.
    pub fn set_indexing(&self, behavior: IndexingBehavior) {
        self.state.lock().unwrap().behavior = behavior;
    }

    /// Indexing behaviour override for one document name.
    pub fn set_indexing_for(&self, name: &str, behavior: IndexingBehavior) {
        self.state
            .lock()
            .unwrap()
            .behavior_by_name
            .insert(name.to_string(), behavior);
    }

    pub fn fail_create(&self, name: &str) {
        self.fail_write(WriteOp::Create, name);
    }

    pub fn fail_update(&self, name: &str) {
        self.fail_write(WriteOp::Update, name);
    }

    pub fn fail_delete(&self, name: &str) {
        self.fail_write(WriteOp::Delete, name);
    }

    fn fail_write(&self, op: WriteOp, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_writes
            .insert((op, name.to_string()));
    }

    /// Let `successes` document listings through, then fail every one after.
    pub fn fail_listing_after(&self, successes: usize) {
        self.state.lock().unwrap().listings_before_failure = Some(successes);
    }

    pub fn fail_dataset_listing(&self) {
        self.state.lock().unwrap().fail_dataset_listing = true;
    }

    pub fn datasets(&self) -> Vec<Dataset> {
        self.state.lock().unwrap().datasets.clone()
    }

    pub fn documents(&self, dataset_id: &str) -> Vec<StoredDocument> {
        self.state
            .lock()
            .unwrap()
            .documents
            .get(dataset_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn document_named(&self, dataset_id: &str, name: &str) -> Option<StoredDocument> {
        self.documents(dataset_id).into_iter().find(|d| d.name == name)
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls that modify remote state.
    pub fn write_calls(&self) -> Vec<StoreCall> {
        self.calls()
            .into_iter()
            .filter(|call| {
                !matches!(call, StoreCall::ListDatasets | StoreCall::ListDocuments { .. })
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryStore {
    async fn list_datasets(&self) -> Result<Vec<Dataset>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(StoreCall::ListDatasets);
        if state.fail_dataset_listing {
            return Err(Error::Transport {
                message: "injected dataset listing failure".to_string(),
            });
        }
        Ok(state.datasets.clone())
    }

    async fn create_dataset(&self, request: &NewDataset) -> Result<Dataset> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(StoreCall::CreateDataset {
            name: request.name.clone(),
        });
        let dataset = Dataset {
            id: state.next_id("ds"),
            name: request.name.clone(),
        };
        state.datasets.push(dataset.clone());
        state.documents.entry(dataset.id.clone()).or_default();
        Ok(dataset)
    }

    async fn list_documents(&self, dataset_id: &str) -> Result<Vec<RemoteDocument>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(StoreCall::ListDocuments {
            dataset_id: dataset_id.to_string(),
        });
        match state.listings_before_failure {
            Some(0) => {
                return Err(Error::Transport {
                    message: "injected listing failure".to_string(),
                });
            }
            Some(n) => state.listings_before_failure = Some(n - 1),
            None => {}
        }

        let docs = state.documents_mut(dataset_id)?;
        for doc in docs.iter_mut() {
            doc.tick();
        }
        Ok(docs.iter().map(StoredDocument::to_remote).collect())
    }

    async fn create_document(
        &self,
        dataset_id: &str,
        request: &NewDocument,
    ) -> Result<RemoteDocument> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(StoreCall::CreateDocument {
            dataset_id: dataset_id.to_string(),
            name: request.name.clone(),
        });
        state.check_write(WriteOp::Create, &request.name)?;

        let behavior = state.behavior_for(&request.name);
        let id = state.next_id("doc");
        let mut doc = StoredDocument {
            id,
            name: request.name.clone(),
            text: request.text.clone(),
            fingerprint: Some(request.fingerprint.clone()),
            technique: Some(request.options.technique),
            status: IndexingStatus::Pending,
            polls_left: None,
        };
        doc.start_indexing(&behavior);
        let remote = doc.to_remote();
        state.documents_mut(dataset_id)?.push(doc);
        Ok(remote)
    }

    async fn update_document(
        &self,
        dataset_id: &str,
        document_id: &str,
        request: &DocumentUpdate,
    ) -> Result<RemoteDocument> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(StoreCall::UpdateDocument {
            dataset_id: dataset_id.to_string(),
            document_id: document_id.to_string(),
        });
        state.check_write(WriteOp::Update, &request.name)?;

        let behavior = state.behavior_for(&request.name);
        let doc = state
            .documents_mut(dataset_id)?
            .iter_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(|| not_found(format!("document {document_id} not found")))?;
        doc.name = request.name.clone();
        doc.text = request.text.clone();
        doc.fingerprint = Some(request.fingerprint.clone());
        doc.start_indexing(&behavior);
        Ok(doc.to_remote())
    }

    async fn delete_document(&self, dataset_id: &str, document_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(StoreCall::DeleteDocument {
            dataset_id: dataset_id.to_string(),
            document_id: document_id.to_string(),
        });
        let name = state
            .documents_mut(dataset_id)?
            .iter()
            .find(|d| d.id == document_id)
            .map(|d| d.name.clone())
            .ok_or_else(|| not_found(format!("document {document_id} not found")))?;
        state.check_write(WriteOp::Delete, &name)?;
        state.documents_mut(dataset_id)?.retain(|d| d.id != document_id);
        Ok(())
    }
}
