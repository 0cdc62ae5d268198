// Sync Events
// Structured events emitted by the engine and the sinks that receive them

use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, error, info, warn};

/// Kind of operation an event reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateDirectory,
    CopyFile,
    UpdateFile,
    CompareFile,
    DeleteFile,
    DeleteDirectory,
    Walk,
    Pass,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateDirectory => "create_dir",
            Operation::CopyFile => "copy",
            Operation::UpdateFile => "update",
            Operation::CompareFile => "compare",
            Operation::DeleteFile => "delete_file",
            Operation::DeleteDirectory => "delete_dir",
            Operation::Walk => "walk",
            Operation::Pass => "pass",
        }
    }
}

/// Totals reported when a pass finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassCounts {
    pub writes: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Something the engine did, or failed to do, during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A pass is starting
    PassStarted { source: PathBuf, replica: PathBuf },

    /// A replica directory (and any missing ancestors) was created
    DirectoryCreated { path: PathBuf },

    /// A replica file was created from its source counterpart
    FileCreated { source: PathBuf, path: PathBuf },

    /// A replica file was overwritten because its content differed
    FileUpdated { source: PathBuf, path: PathBuf },

    /// A replica file already matched its source counterpart
    FileUnchanged { path: PathBuf },

    /// An orphaned replica file was removed
    FileDeleted { path: PathBuf },

    /// An orphaned replica directory was removed with its whole subtree
    DirectoryDeleted { path: PathBuf },

    /// An item was left untouched because its state could not be determined
    ItemSkipped {
        operation: Operation,
        path: PathBuf,
        reason: String,
    },

    /// An operation on one item failed; the pass carried on
    ItemFailed {
        operation: Operation,
        path: PathBuf,
        error: String,
    },

    /// The pass finished
    PassCompleted { counts: PassCounts, dry_run: bool },

    /// The pass could not start
    PassAborted { error: String },
}

/// Capability the engine reports through.
///
/// Passed into the engine explicitly so tests can observe a pass without
/// touching process-wide logging state.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &SyncEvent);
}

/// Sink that forwards every event to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &SyncEvent) {
        match event {
            SyncEvent::PassStarted { source, replica } => {
                debug!(op = Operation::Pass.as_str(), source = %source.display(), replica = %replica.display(), "Starting sync pass");
            }
            SyncEvent::DirectoryCreated { path } => {
                info!(op = Operation::CreateDirectory.as_str(), path = %path.display(), "Created directory");
            }
            SyncEvent::FileCreated { source, path } => {
                info!(op = Operation::CopyFile.as_str(), path = %path.display(), source = %source.display(), "Copied file");
            }
            SyncEvent::FileUpdated { source, path } => {
                info!(op = Operation::UpdateFile.as_str(), path = %path.display(), source = %source.display(), "Updated file");
            }
            SyncEvent::FileUnchanged { path } => {
                debug!(op = Operation::CompareFile.as_str(), path = %path.display(), "File unchanged");
            }
            SyncEvent::FileDeleted { path } => {
                info!(op = Operation::DeleteFile.as_str(), path = %path.display(), "Deleted file");
            }
            SyncEvent::DirectoryDeleted { path } => {
                info!(op = Operation::DeleteDirectory.as_str(), path = %path.display(), "Deleted directory");
            }
            SyncEvent::ItemSkipped { operation, path, reason } => {
                warn!(op = operation.as_str(), path = %path.display(), reason = %reason, "Skipped item");
            }
            SyncEvent::ItemFailed { operation, path, error } => {
                error!(op = operation.as_str(), path = %path.display(), error = %error, "Operation failed");
            }
            SyncEvent::PassCompleted { counts, dry_run } => {
                info!(
                    op = Operation::Pass.as_str(),
                    writes = counts.writes,
                    unchanged = counts.unchanged,
                    skipped = counts.skipped,
                    failed = counts.failed,
                    dry_run = *dry_run,
                    "Sync pass complete"
                );
            }
            SyncEvent::PassAborted { error } => {
                error!(op = Operation::Pass.as_str(), error = %error, "Sync pass aborted");
            }
        }
    }
}

/// Sink that keeps every event in memory, for tests and dry-run reports
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SyncEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events received so far
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of recorded events that changed the replica
    pub fn write_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    SyncEvent::DirectoryCreated { .. }
                        | SyncEvent::FileCreated { .. }
                        | SyncEvent::FileUpdated { .. }
                        | SyncEvent::FileDeleted { .. }
                        | SyncEvent::DirectoryDeleted { .. }
                )
            })
            .count()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &SyncEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
