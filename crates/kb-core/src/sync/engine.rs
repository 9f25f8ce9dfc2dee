//! SyncEngine implementation
//!
//! The engine reconciles each configured dataset in turn: resolve the remote
//! dataset, load local documents, diff against the remote listing, then apply
//! deletes, creates and updates. Creates and updates go out in batches and
//! each batch waits for indexing before the next one starts.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use kb_fs::{LocalDocument, load_documents};
use kb_remote::{Clock, Dataset, DatasetDirectory, KnowledgeStore, NewDataset};
use serde::Serialize;

use super::result::{FailedOperation, PATH_NOT_FOUND, SyncError, SyncResult};
use crate::config::{DatasetSpec, DatasetTarget, SyncSettings};
use crate::diff::{DiffEntry, DiffPlan, calculate_diff};
use crate::monitor::{IndexingMonitor, IndexingWaiter};
use crate::{Error, Result};

/// Result of applying one diff entry: the remote document id on success.
pub type ItemOutcome = std::result::Result<String, SyncError>;

/// Options for sync runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Creates/updates applied before each indexing wait (at least 1)
    pub batch_size: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_size: SyncSettings::DEFAULT_BATCH_SIZE,
        }
    }
}

impl From<&SyncSettings> for SyncOptions {
    fn from(settings: &SyncSettings) -> Self {
        Self {
            batch_size: settings.batch_size,
        }
    }
}

/// Dry-run view of one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetPlan {
    pub dataset: String,
    /// `None` when the dataset does not exist yet or failed to resolve
    pub dataset_id: Option<String>,
    pub path: PathBuf,
    pub plan: DiffPlan,
    pub warnings: Vec<String>,
    pub error: Option<SyncError>,
}

impl DatasetPlan {
    fn new(spec: &DatasetSpec) -> Self {
        Self {
            dataset: spec.label().to_string(),
            dataset_id: None,
            path: spec.path.clone(),
            plan: DiffPlan::default(),
            warnings: Vec::new(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum WriteKind {
    Create,
    Update,
}

impl WriteKind {
    fn operation(self) -> FailedOperation {
        match self {
            WriteKind::Create => FailedOperation::Create,
            WriteKind::Update => FailedOperation::Update,
        }
    }
}

/// Engine for synchronizing local directories into remote datasets
pub struct SyncEngine {
    store: Arc<dyn KnowledgeStore>,
    waiter: Arc<dyn IndexingWaiter>,
    options: SyncOptions,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        waiter: Arc<dyn IndexingWaiter>,
        options: SyncOptions,
    ) -> Self {
        Self {
            store,
            waiter,
            options,
        }
    }

    /// Engine with an [`IndexingMonitor`] configured from `settings`.
    pub fn from_settings(
        store: Arc<dyn KnowledgeStore>,
        clock: Arc<dyn Clock>,
        settings: &SyncSettings,
    ) -> Self {
        let monitor = IndexingMonitor::from_settings(clock, settings);
        Self::new(store, Arc::new(monitor), SyncOptions::from(settings))
    }

    /// Sync every dataset in order.
    ///
    /// Failures are recorded in the returned results; one dataset failing
    /// never stops the others.
    pub async fn run(&self, datasets: &[DatasetSpec]) -> Vec<SyncResult> {
        let mut known = None;
        let mut results = Vec::with_capacity(datasets.len());
        for spec in datasets {
            results.push(self.sync_dataset(spec, &mut known).await);
        }
        results
    }

    /// Compute what [`run`](Self::run) would do, without writing anything.
    pub async fn plan(&self, datasets: &[DatasetSpec]) -> Vec<DatasetPlan> {
        let mut known = None;
        let mut plans = Vec::with_capacity(datasets.len());
        for spec in datasets {
            plans.push(self.plan_dataset(spec, &mut known).await);
        }
        plans
    }

    async fn sync_dataset(
        &self,
        spec: &DatasetSpec,
        known: &mut Option<Vec<Dataset>>,
    ) -> SyncResult {
        let label = spec.label();
        let mut result = SyncResult::new(label, spec.path.clone());

        let dataset_id = match self.resolve(spec, known).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(dataset = %label, error = %e, "Failed to resolve dataset");
                result
                    .errors
                    .push(SyncError::dataset(FailedOperation::ResolveDataset, e));
                return result;
            }
        };
        result.dataset_id = Some(dataset_id.clone());

        let local = match load_documents(&spec.path) {
            Ok(docs) => docs,
            Err(kb_fs::Error::PathNotFound { path }) => {
                tracing::warn!(dataset = %label, path = %path.display(), "[WARN] Path not found");
                result
                    .warnings
                    .push(format!("{PATH_NOT_FOUND}: {}", path.display()));
                return result;
            }
            Err(e) => {
                tracing::error!(dataset = %label, error = %e, "Failed to load local documents");
                result
                    .errors
                    .push(SyncError::dataset(FailedOperation::LoadDocuments, e));
                return result;
            }
        };

        let directory = DatasetDirectory::new(self.store.clone(), dataset_id);
        let remote = match directory.list().await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::error!(dataset = %label, error = %e, "Failed to list remote documents");
                result
                    .errors
                    .push(SyncError::dataset(FailedOperation::ListDocuments, e));
                return result;
            }
        };

        let plan = DiffPlan::partition(calculate_diff(&local, &remote));
        tracing::debug!(
            dataset = %label,
            creates = plan.creates.len(),
            updates = plan.updates.len(),
            deletes = plan.deletes.len(),
            skips = plan.skips.len(),
            "Calculated diff"
        );
        let local_by_name: HashMap<&str, &LocalDocument> =
            local.iter().map(|doc| (doc.filename(), doc)).collect();

        for entry in &plan.skips {
            tracing::debug!(dataset = %label, filename = %entry.filename, "[SKIP]");
            result.skipped += 1;
        }

        for entry in &plan.deletes {
            match self.apply_delete(&directory, entry).await {
                Ok(_) => result.deleted += 1,
                Err(e) => result.errors.push(e),
            }
        }

        for (kind, entries) in [
            (WriteKind::Create, &plan.creates),
            (WriteKind::Update, &plan.updates),
        ] {
            if let Err(e) = self
                .apply_batches(&directory, spec, kind, entries, &local_by_name, &mut result)
                .await
            {
                result.errors.push(e);
                return result;
            }
        }

        tracing::info!(
            dataset = %label,
            created = result.created,
            updated = result.updated,
            deleted = result.deleted,
            skipped = result.skipped,
            errors = result.errors.len(),
            "Dataset synced"
        );
        result
    }

    /// Apply writes in batches, waiting for each batch's documents to index.
    ///
    /// Returns an error only when a wait fails, which ends the dataset.
    async fn apply_batches(
        &self,
        directory: &DatasetDirectory,
        spec: &DatasetSpec,
        kind: WriteKind,
        entries: &[DiffEntry],
        local: &HashMap<&str, &LocalDocument>,
        result: &mut SyncResult,
    ) -> std::result::Result<(), SyncError> {
        for batch in entries.chunks(self.options.batch_size.max(1)) {
            let mut written = Vec::with_capacity(batch.len());
            for entry in batch {
                let outcome = match local.get(entry.filename.as_str()) {
                    Some(doc) => self.apply_write(directory, spec, kind, entry, doc).await,
                    None => Err(SyncError::item(
                        &entry.filename,
                        kind.operation(),
                        "local document is no longer loaded",
                    )),
                };
                match outcome {
                    Ok(id) => {
                        match kind {
                            WriteKind::Create => result.created += 1,
                            WriteKind::Update => result.updated += 1,
                        }
                        written.push(id);
                    }
                    Err(e) => result.errors.push(e),
                }
            }

            if written.is_empty() {
                continue;
            }
            let report = self
                .waiter
                .await_indexing(directory, &written)
                .await
                .map_err(|e| SyncError::dataset(FailedOperation::AwaitIndexing, e))?;
            for failure in report.failed {
                result.warnings.push(format!(
                    "Indexing failed for {}: {}",
                    failure.name, failure.message
                ));
            }
        }
        Ok(())
    }

    async fn apply_write(
        &self,
        directory: &DatasetDirectory,
        spec: &DatasetSpec,
        kind: WriteKind,
        entry: &DiffEntry,
        doc: &LocalDocument,
    ) -> ItemOutcome {
        let written = match (kind, entry.remote_id.as_deref()) {
            (WriteKind::Create, _) => {
                directory
                    .create(doc.filename(), doc.content(), doc.fingerprint(), &spec.indexing)
                    .await
            }
            (WriteKind::Update, Some(id)) => {
                directory
                    .update(id, doc.filename(), doc.content(), doc.fingerprint())
                    .await
            }
            (WriteKind::Update, None) => {
                return Err(SyncError::item(
                    &entry.filename,
                    FailedOperation::Update,
                    "missing remote document id",
                ));
            }
        };

        match written {
            Ok(remote) => {
                match kind {
                    WriteKind::Create => {
                        tracing::info!(filename = %entry.filename, document_id = %remote.id, "[CREATE]");
                    }
                    WriteKind::Update => tracing::info!(
                        filename = %entry.filename,
                        document_id = %remote.id,
                        reason = ?entry.reason.map(|r| r.to_string()),
                        "[UPDATE]"
                    ),
                }
                Ok(remote.id)
            }
            Err(e) => {
                tracing::error!(filename = %entry.filename, error = %e, "Failed to {}", kind.operation());
                Err(SyncError::item(&entry.filename, kind.operation(), e))
            }
        }
    }

    async fn apply_delete(&self, directory: &DatasetDirectory, entry: &DiffEntry) -> ItemOutcome {
        let Some(id) = entry.remote_id.as_deref() else {
            return Err(SyncError::item(
                &entry.filename,
                FailedOperation::Delete,
                "missing remote document id",
            ));
        };
        match directory.delete(id).await {
            Ok(()) => {
                tracing::info!(filename = %entry.filename, document_id = %id, "[DELETE]");
                Ok(id.to_string())
            }
            Err(e) => {
                tracing::error!(filename = %entry.filename, error = %e, "Failed to delete");
                Err(SyncError::item(&entry.filename, FailedOperation::Delete, e))
            }
        }
    }

    async fn resolve(&self, spec: &DatasetSpec, known: &mut Option<Vec<Dataset>>) -> Result<String> {
        let (name, create_if_missing) = match &spec.target {
            DatasetTarget::Id(id) => return Ok(id.clone()),
            DatasetTarget::Name {
                name,
                create_if_missing,
            } => (name, *create_if_missing),
        };

        if let Some(id) = self.lookup(name, known).await? {
            return Ok(id);
        }
        if !create_if_missing {
            return Err(Error::DatasetNotFound { name: name.clone() });
        }

        let request = NewDataset::named(name).with_technique(spec.indexing.technique);
        let dataset = self.store.create_dataset(&request).await?;
        tracing::info!(dataset = %name, dataset_id = %dataset.id, "[CREATE_DATASET]");
        let id = dataset.id.clone();
        known.get_or_insert_with(Vec::new).push(dataset);
        Ok(id)
    }

    /// Find a dataset id by name; the dataset list is fetched once per run.
    async fn lookup(&self, name: &str, known: &mut Option<Vec<Dataset>>) -> Result<Option<String>> {
        if known.is_none() {
            *known = Some(self.store.list_datasets().await?);
        }
        let datasets: &[Dataset] = known.as_deref().unwrap_or_default();
        Ok(datasets.iter().find(|d| d.name == name).map(|d| d.id.clone()))
    }

    async fn plan_dataset(
        &self,
        spec: &DatasetSpec,
        known: &mut Option<Vec<Dataset>>,
    ) -> DatasetPlan {
        let mut out = DatasetPlan::new(spec);

        let dataset_id = match &spec.target {
            DatasetTarget::Id(id) => Some(id.clone()),
            DatasetTarget::Name {
                name,
                create_if_missing,
            } => match self.lookup(name, known).await {
                Ok(Some(id)) => Some(id),
                Ok(None) if *create_if_missing => None,
                Ok(None) => {
                    let e = Error::DatasetNotFound { name: name.clone() };
                    out.error = Some(SyncError::dataset(FailedOperation::ResolveDataset, e));
                    return out;
                }
                Err(e) => {
                    out.error = Some(SyncError::dataset(FailedOperation::ResolveDataset, e));
                    return out;
                }
            },
        };
        out.dataset_id = dataset_id.clone();

        let local = match load_documents(&spec.path) {
            Ok(docs) => docs,
            Err(kb_fs::Error::PathNotFound { path }) => {
                out.warnings
                    .push(format!("{PATH_NOT_FOUND}: {}", path.display()));
                return out;
            }
            Err(e) => {
                out.error = Some(SyncError::dataset(FailedOperation::LoadDocuments, e));
                return out;
            }
        };

        let remote = match dataset_id {
            Some(id) => match DatasetDirectory::new(self.store.clone(), id).list().await {
                Ok(docs) => docs,
                Err(e) => {
                    out.error = Some(SyncError::dataset(FailedOperation::ListDocuments, e));
                    return out;
                }
            },
            None => Vec::new(),
        };

        out.plan = DiffPlan::partition(calculate_diff(&local, &remote));
        out
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
