// Sync Errors
// Error taxonomy for a synchronization pass

use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors raised while reconciling or pruning a replica tree.
///
/// Everything except the two root variants is scoped to a single file or
/// directory: the orchestrator records it and moves on to the next entry.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A filesystem call on one path failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Copying a source file into the replica failed
    #[error("failed to copy {source_path} to {replica_path}: {source}")]
    Copy {
        source_path: PathBuf,
        replica_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be read while computing its signature
    #[error("cannot read {path} for comparison: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source counterpart of a replica entry could not be inspected
    #[error("cannot determine state of source {path}: {source}")]
    SourceUnknown {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The staged copy is shorter or longer than the source
    #[error("copy of {path} wrote {actual} bytes, expected {expected}")]
    Truncated {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// Replica entry is a file where source has a directory, or the reverse
    #[error("replica entry {path} has a different type than its source counterpart")]
    TypeConflict { path: PathBuf },

    /// Directory traversal hit an unreadable entry
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// The source root is missing, unreadable or not a directory
    #[error("source root {path} is unusable: {reason}")]
    SourceRoot { path: PathBuf, reason: String },

    /// The replica root does not exist and could not be created
    #[error("cannot create replica root {path}: {source}")]
    ReplicaRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn unreadable(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Unreadable {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Whether this error prevents the pass from starting at all
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SourceRoot { .. } | Self::ReplicaRoot { .. })
    }
}
