//! Core orchestration layer for Knowledge Sync
//!
//! This crate coordinates the filesystem and remote layers:
//!
//! - **Configuration**: loading and validating the declarative dataset list
//! - **Diff engine**: classifying documents into create/update/delete/skip
//! - **Indexing monitor**: polling until written documents finish indexing
//! - **SyncEngine**: applying diffs in batches and reporting per-dataset results
//!
//! # Architecture
//!
//! ```text
//!           CLI
//!            |
//!         kb-core
//!            |
//!      +-----+-----+
//!      |           |
//!    kb-fs     kb-remote
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use kb_core::{SyncConfig, SyncEngine};
//! use kb_remote::{ClientOptions, KnowledgeClient, TokioClock};
//!
//! async fn example() -> kb_core::Result<()> {
//!     let config = SyncConfig::load("kb-sync.yaml".as_ref())?;
//!     let client = KnowledgeClient::new(ClientOptions::new("https://kb.example.com", "key"))?;
//!     let engine = SyncEngine::from_settings(Arc::new(client), Arc::new(TokioClock), &config.settings);
//!     for result in engine.run(&config.datasets).await {
//!         println!("{}: {} created", result.dataset, result.created);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod diff;
pub mod error;
pub mod monitor;
pub mod sync;

pub use config::{DatasetSpec, DatasetTarget, SyncConfig, SyncSettings};
pub use diff::{DiffAction, DiffEntry, DiffPlan, UpdateReason, calculate_diff};
pub use error::{Error, Result};
pub use monitor::{IndexingFailure, IndexingMonitor, IndexingReport, IndexingWaiter, MonitorError};
pub use sync::{
    DatasetPlan, FailedOperation, ItemOutcome, SyncEngine, SyncError, SyncOptions, SyncResult,
};
