//! Persistence of run snapshots for resuming flows

pub mod snapshot;

pub use snapshot::RunSnapshot;

use std::path::PathBuf;
use thiserror::Error;

/// Error types for snapshot storage
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to access snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid snapshot data: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Snapshot belongs to flow '{found}', not '{expected}'")]
    FlowMismatch { expected: String, found: String },

    #[error("Snapshot references unknown task '{0}'")]
    UnknownTask(String),

    #[error("Could not determine local data directory")]
    NoDataDir,
}
