// Item Outcomes
// Result of one reconcile or prune step, aggregated by the orchestrator

use std::path::Path;

use crate::core::events::{EventSink, Operation, SyncEvent};
use crate::error::SyncError;

/// Whether an outcome concerns a file or a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// What happened to a single file or directory during a pass
#[derive(Debug)]
pub enum ItemOutcome {
    /// Replica entry did not exist and was created
    Created,
    /// Replica file existed with different content and was overwritten
    Updated,
    /// Replica file already matched; no I/O was performed
    Unchanged,
    /// Orphaned replica entry was removed
    Deleted,
    /// State could not be determined, so the replica was left alone
    Skipped(SyncError),
    /// The operation was attempted and failed
    Failed(SyncError),
}

/// Record a traversal error against the entry it names (or the walk root)
pub(crate) fn walk_failure(e: walkdir::Error, root: &Path, sink: &dyn EventSink) -> ItemOutcome {
    let path = e.path().unwrap_or(root).to_path_buf();
    let error = SyncError::Walk(e);
    sink.emit(&SyncEvent::ItemFailed {
        operation: Operation::Walk,
        path,
        error: error.to_string(),
    });
    ItemOutcome::Failed(error)
}
