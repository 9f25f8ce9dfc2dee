//! Filesystem side of Knowledge Sync
//!
//! Provides content fingerprints, the local document repository, and
//! format-agnostic configuration loading.

pub mod config;
pub mod documents;
pub mod error;
pub mod fingerprint;

pub use config::ConfigStore;
pub use documents::{LocalDocument, SYNC_EXTENSION, load_documents};
pub use error::{Error, Result};
pub use fingerprint::fingerprint;
