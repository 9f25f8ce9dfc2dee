//! Sync orchestration
//!
//! - **engine**: `SyncEngine`, applying diffs dataset by dataset
//! - **result**: per-dataset `SyncResult` and the errors recorded in it

mod engine;
mod result;

pub use engine::{DatasetPlan, ItemOutcome, SyncEngine, SyncOptions};
pub use result::{FailedOperation, SyncError, SyncResult};
