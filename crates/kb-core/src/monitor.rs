//! Indexing monitor
//!
//! Polls a dataset until every document written in a batch reaches a
//! terminal indexing state, or the timeout expires. Each tracked id moves
//! `Pending -> Completed | Failed`; failed documents are reported but do
//! not abort the wait.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kb_remote::{Clock, DatasetDirectory, IndexingStatus, TokioClock};

use crate::config::SyncSettings;

/// Errors that end an indexing wait early
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Indexing timed out with {remaining} document(s) still pending")]
    Timeout { remaining: usize },

    #[error("Failed to poll indexing status: {0}")]
    Remote(#[from] kb_remote::Error),
}

/// A document whose indexing ended in the error state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexingFailure {
    pub document_id: String,
    pub name: String,
    pub message: String,
}

/// Outcome of a completed wait.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexingReport {
    pub completed: Vec<String>,
    pub failed: Vec<IndexingFailure>,
}

/// Waits for a set of documents to finish indexing.
#[async_trait]
pub trait IndexingWaiter: Send + Sync {
    async fn await_indexing(
        &self,
        directory: &DatasetDirectory,
        ids: &[String],
    ) -> Result<IndexingReport, MonitorError>;
}

/// Polling [`IndexingWaiter`] driven by a [`Clock`].
#[derive(Debug, Clone)]
pub struct IndexingMonitor {
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    timeout: Duration,
}

impl Default for IndexingMonitor {
    fn default() -> Self {
        Self::new(Arc::new(TokioClock))
    }
}

impl IndexingMonitor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            poll_interval: SyncSettings::DEFAULT_POLL_INTERVAL,
            timeout: SyncSettings::DEFAULT_INDEXING_TIMEOUT,
        }
    }

    pub fn from_settings(clock: Arc<dyn Clock>, settings: &SyncSettings) -> Self {
        Self::new(clock)
            .with_poll_interval(settings.poll_interval)
            .with_timeout(settings.indexing_timeout)
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl IndexingWaiter for IndexingMonitor {
    async fn await_indexing(
        &self,
        directory: &DatasetDirectory,
        ids: &[String],
    ) -> Result<IndexingReport, MonitorError> {
        let mut report = IndexingReport::default();
        let mut pending: HashSet<&str> = ids.iter().map(String::as_str).collect();
        if pending.is_empty() {
            return Ok(report);
        }

        tracing::info!(
            dataset = %directory.dataset_id(),
            documents = pending.len(),
            "[WAIT] Waiting for indexing"
        );

        let start = self.clock.now();
        loop {
            if self.clock.now().duration_since(start) > self.timeout {
                tracing::warn!(
                    dataset = %directory.dataset_id(),
                    remaining = pending.len(),
                    "Indexing wait timed out"
                );
                return Err(MonitorError::Timeout {
                    remaining: pending.len(),
                });
            }

            for doc in directory.list().await? {
                if !pending.contains(doc.id.as_str()) {
                    continue;
                }
                match doc.status {
                    IndexingStatus::Pending => {}
                    IndexingStatus::Completed => {
                        tracing::info!(filename = %doc.name, document_id = %doc.id, "[INDEXED]");
                        pending.remove(doc.id.as_str());
                        report.completed.push(doc.id);
                    }
                    IndexingStatus::Error(message) => {
                        tracing::warn!(
                            filename = %doc.name,
                            document_id = %doc.id,
                            error = %message,
                            "[INDEX_ERROR]"
                        );
                        pending.remove(doc.id.as_str());
                        report.failed.push(IndexingFailure {
                            document_id: doc.id,
                            name: doc.name,
                            message,
                        });
                    }
                }
            }

            if pending.is_empty() {
                return Ok(report);
            }
            self.clock.sleep(self.poll_interval).await;
        }
    }
}
