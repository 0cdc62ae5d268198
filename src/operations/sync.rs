// Sync Engine
// Runs one full reconciliation pass of a replica tree against its source

use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use walkdir::WalkDir;

use super::compare::ContentComparator;
use super::outcome::{walk_failure, EntryKind, ItemOutcome};
use super::prune::TreePruner;
use super::reconcile::FileReconciler;
use crate::core::app_config::compiled;
use crate::core::events::{EventSink, Operation, PassCounts, SyncEvent, TracingSink};
use crate::error::{Result, SyncError};
use crate::utilities::counterpart;

/// Options for sync operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Bytes read per digest update when comparing files
    pub hash_chunk_size: usize,
    /// Dry run - decide and report, but don't modify the replica
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            hash_chunk_size: compiled::HASH_CHUNK_SIZE,
            dry_run: compiled::DRY_RUN,
        }
    }
}

/// Result of a sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResult {
    /// Replica directories created
    pub dirs_created: usize,
    /// Replica files created
    pub files_created: usize,
    /// Replica files overwritten with new content
    pub files_updated: usize,
    /// Replica files that already matched
    pub files_unchanged: usize,
    /// Orphaned replica files removed
    pub files_deleted: usize,
    /// Orphaned replica directories removed (each with its subtree)
    pub dirs_deleted: usize,
    /// Items left untouched because their state was unknown
    pub skipped: usize,
    /// Items whose operation failed
    pub failed: usize,
    /// Error messages for skipped and failed items
    pub errors: Vec<String>,
}

impl SyncResult {
    fn record(&mut self, kind: EntryKind, outcome: &ItemOutcome) {
        match (outcome, kind) {
            (ItemOutcome::Created, EntryKind::Directory) => self.dirs_created += 1,
            (ItemOutcome::Created, EntryKind::File) => self.files_created += 1,
            (ItemOutcome::Updated, _) => self.files_updated += 1,
            (ItemOutcome::Unchanged, EntryKind::File) => self.files_unchanged += 1,
            (ItemOutcome::Unchanged, EntryKind::Directory) => {}
            (ItemOutcome::Deleted, EntryKind::File) => self.files_deleted += 1,
            (ItemOutcome::Deleted, EntryKind::Directory) => self.dirs_deleted += 1,
            (ItemOutcome::Skipped(e), _) => {
                self.skipped += 1;
                self.errors.push(e.to_string());
            }
            (ItemOutcome::Failed(e), _) => {
                self.failed += 1;
                self.errors.push(e.to_string());
            }
        }
    }

    /// Number of mutating operations the pass performed
    pub fn writes(&self) -> usize {
        self.dirs_created
            + self.files_created
            + self.files_updated
            + self.files_deleted
            + self.dirs_deleted
    }

    /// Whether every item was processed without a skip or failure
    pub fn is_clean(&self) -> bool {
        self.skipped == 0 && self.failed == 0
    }

    pub fn counts(&self) -> PassCounts {
        PassCounts {
            writes: self.writes(),
            unchanged: self.files_unchanged,
            skipped: self.skipped,
            failed: self.failed,
        }
    }
}

/// Engine for one-way replica synchronization.
///
/// Stateless between passes: every call to [`SyncEngine::sync_once`] walks
/// both trees from scratch and derives all decisions from what is on disk.
pub struct SyncEngine {
    options: SyncOptions,
    reconciler: FileReconciler,
    pruner: TreePruner,
    sink: Arc<dyn EventSink>,
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new(SyncOptions::default())
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    /// Create a new sync engine that reports through `tracing`
    pub fn new(options: SyncOptions) -> Self {
        let comparator = ContentComparator::new(options.hash_chunk_size);
        Self {
            reconciler: FileReconciler::new(comparator, options.dry_run),
            pruner: TreePruner::new(options.dry_run),
            options,
            sink: Arc::new(TracingSink),
        }
    }

    /// Replace the event sink
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Run one full pass.
    ///
    /// New and changed content is propagated before anything is pruned. Only
    /// a problem with one of the two roots is returned as `Err`; per-item
    /// failures are logged, counted in the [`SyncResult`] and skipped.
    pub fn sync_once(&self, source_root: &Path, replica_root: &Path) -> Result<SyncResult> {
        let sink = self.sink.as_ref();
        sink.emit(&SyncEvent::PassStarted {
            source: source_root.to_path_buf(),
            replica: replica_root.to_path_buf(),
        });

        let mut result = SyncResult::default();
        let replica_exists = match self.prepare_roots(source_root, replica_root, &mut result) {
            Ok(exists) => exists,
            Err(e) => {
                sink.emit(&SyncEvent::PassAborted { error: e.to_string() });
                return Err(e);
            }
        };

        self.mirror_source(source_root, replica_root, &mut result);

        // A dry run against a missing replica root has nothing to prune
        if replica_exists {
            for outcome in self.pruner.prune_files(replica_root, source_root, sink) {
                result.record(EntryKind::File, &outcome);
            }
            for outcome in self.pruner.prune_directories(replica_root, source_root, sink) {
                result.record(EntryKind::Directory, &outcome);
            }
        }

        sink.emit(&SyncEvent::PassCompleted {
            counts: result.counts(),
            dry_run: self.options.dry_run,
        });
        Ok(result)
    }

    /// Check the source root and make sure the replica root exists.
    ///
    /// Returns whether the replica root exists on disk afterwards.
    fn prepare_roots(
        &self,
        source_root: &Path,
        replica_root: &Path,
        result: &mut SyncResult,
    ) -> Result<bool> {
        let source_error = |reason: String| SyncError::SourceRoot {
            path: source_root.to_path_buf(),
            reason,
        };
        match fs::metadata(source_root) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Err(source_error("not a directory".to_string())),
            Err(e) => return Err(source_error(e.to_string())),
        }
        fs::read_dir(source_root).map_err(|e| source_error(e.to_string()))?;

        match fs::metadata(replica_root) {
            Ok(metadata) if metadata.is_dir() => return Ok(true),
            Ok(_) => {
                return Err(SyncError::ReplicaRoot {
                    path: replica_root.to_path_buf(),
                    source: io::Error::new(ErrorKind::AlreadyExists, "exists and is not a directory"),
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(SyncError::ReplicaRoot {
                    path: replica_root.to_path_buf(),
                    source: e,
                })
            }
        }

        if !self.options.dry_run {
            fs::create_dir_all(replica_root).map_err(|e| SyncError::ReplicaRoot {
                path: replica_root.to_path_buf(),
                source: e,
            })?;
        }
        self.sink.emit(&SyncEvent::DirectoryCreated {
            path: replica_root.to_path_buf(),
        });
        result.record(EntryKind::Directory, &ItemOutcome::Created);
        Ok(!self.options.dry_run)
    }

    /// Walk source top-down, creating replica directories as they are
    /// visited and reconciling each file
    fn mirror_source(&self, source_root: &Path, replica_root: &Path, result: &mut SyncResult) {
        let sink = self.sink.as_ref();
        let walker = WalkDir::new(source_root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let outcome = walk_failure(e, source_root, sink);
                    result.record(EntryKind::File, &outcome);
                    continue;
                }
            };
            let Some(replica_path) = counterpart(entry.path(), source_root, replica_root) else {
                continue;
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                let outcome = self.ensure_directory(&replica_path);
                result.record(EntryKind::Directory, &outcome);
            } else if file_type.is_file() || (file_type.is_symlink() && entry.path().is_file()) {
                let outcome = self.reconciler.reconcile(entry.path(), &replica_path, sink);
                result.record(EntryKind::File, &outcome);
            } else {
                debug!(path = %entry.path().display(), "Skipping entry that is neither file nor directory");
            }
        }
    }

    /// Create the replica counterpart of a source directory if it is missing
    fn ensure_directory(&self, path: &Path) -> ItemOutcome {
        let outcome = match fs::symlink_metadata(path) {
            Ok(metadata) if metadata.is_dir() => return ItemOutcome::Unchanged,
            Ok(_) => ItemOutcome::Failed(SyncError::TypeConflict {
                path: path.to_path_buf(),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if self.options.dry_run {
                    ItemOutcome::Created
                } else {
                    match fs::create_dir_all(path) {
                        Ok(()) => ItemOutcome::Created,
                        Err(e) => ItemOutcome::Failed(SyncError::io(path, e)),
                    }
                }
            }
            Err(e) => ItemOutcome::Failed(SyncError::io(path, e)),
        };

        let event = match &outcome {
            ItemOutcome::Failed(e) => SyncEvent::ItemFailed {
                operation: Operation::CreateDirectory,
                path: path.to_path_buf(),
                error: e.to_string(),
            },
            _ => SyncEvent::DirectoryCreated {
                path: path.to_path_buf(),
            },
        };
        self.sink.emit(&event);

        outcome
    }
}
