//! Remote side of Knowledge Sync
//!
//! This crate owns everything that talks to the knowledge store:
//!
//! - **document**: validated domain values (`RemoteDocument`, `Dataset`, indexing options)
//! - **models**: wire payloads and their parse/validate step
//! - **store**: the `KnowledgeStore` seam and the per-dataset `DatasetDirectory`
//! - **client**: `KnowledgeClient`, the HTTP implementation with retries
//! - **clock**: time source used for retry and polling sleeps

pub mod client;
pub mod clock;
pub mod document;
pub mod error;
pub mod models;
pub mod store;

pub use client::{ClientOptions, KnowledgeClient};
pub use clock::{Clock, TokioClock};
pub use document::{
    Dataset, DocumentUpdate, IndexingOptions, IndexingStatus, IndexingTechnique, NewDataset,
    NewDocument, ProcessMode, ProcessRule, RemoteDocument,
};
pub use error::{Error, Result};
pub use store::{DatasetDirectory, KnowledgeStore};
