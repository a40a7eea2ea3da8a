mod link_store;
mod reports;

pub use link_store::LinkStore;
pub use reports::{append_failure_log, snapshot_path, write_snapshot};

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the durable link store and the per-cycle artifacts.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store file exists but could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Appending to the store, snapshot or failure log failed
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
