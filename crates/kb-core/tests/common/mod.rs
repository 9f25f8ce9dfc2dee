//! Shared helpers for kb-core integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kb_core::{IndexingReport, IndexingWaiter, MonitorError};
use kb_remote::{DatasetDirectory, KnowledgeStore};
use kb_test_utils::InMemoryStore;

/// Waiter that records every id list it is asked to wait for.
///
/// Optionally fails the n-th wait (1-based) with a timeout.
#[derive(Debug, Default)]
pub struct RecordingWaiter {
    waits: Mutex<Vec<Vec<String>>>,
    fail_on_call: Option<usize>,
}

impl RecordingWaiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(call: usize) -> Self {
        Self {
            waits: Mutex::new(Vec::new()),
            fail_on_call: Some(call),
        }
    }

    pub fn waits(&self) -> Vec<Vec<String>> {
        self.waits.lock().unwrap().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.waits().iter().map(Vec::len).collect()
    }
}

#[async_trait]
impl IndexingWaiter for RecordingWaiter {
    async fn await_indexing(
        &self,
        _directory: &DatasetDirectory,
        ids: &[String],
    ) -> Result<IndexingReport, MonitorError> {
        let call = {
            let mut waits = self.waits.lock().unwrap();
            waits.push(ids.to_vec());
            waits.len()
        };
        if self.fail_on_call == Some(call) {
            return Err(MonitorError::Timeout {
                remaining: ids.len(),
            });
        }
        Ok(IndexingReport {
            completed: ids.to_vec(),
            failed: Vec::new(),
        })
    }
}

/// Store with one dataset `ds-1` named `handbook`.
pub fn store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new().with_dataset("ds-1", "handbook"))
}

pub fn as_store(store: &Arc<InMemoryStore>) -> Arc<dyn KnowledgeStore> {
    store.clone()
}
