//! Command implementations

mod config;
mod diff;
mod sync;

pub use config::run_check_config;
pub use diff::run_diff;
pub use sync::run_sync;

use std::future::Future;

use crate::error::Result;

/// Drive an async engine call on a single-threaded runtime.
fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}
