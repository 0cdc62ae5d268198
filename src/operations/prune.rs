// Tree Pruner
// Removes replica files and directories that no longer exist in source

use std::fs::{self, FileType};
use std::io::{self, ErrorKind};
use std::path::Path;

use walkdir::WalkDir;

use super::outcome::{walk_failure, ItemOutcome};
use crate::core::events::{EventSink, Operation, SyncEvent};
use crate::error::SyncError;
use crate::utilities::{clear_readonly, counterpart, remove_tree};

/// Deletes orphans from the replica tree.
///
/// Runs strictly after reconciliation. An entry is an orphan when its source
/// counterpart is missing or is of the other kind (file vs directory).
#[derive(Debug, Clone, Default)]
pub struct TreePruner {
    dry_run: bool,
}

impl TreePruner {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Delete every replica file whose source counterpart is not a file
    pub fn prune_files(
        &self,
        replica_root: &Path,
        source_root: &Path,
        sink: &dyn EventSink,
    ) -> Vec<ItemOutcome> {
        let mut outcomes = Vec::new();

        for entry in replica_walker(replica_root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    outcomes.push(walk_failure(e, replica_root, sink));
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            let Some(source_path) = counterpart(entry.path(), replica_root, source_root) else {
                continue;
            };

            match source_kind(&source_path) {
                Ok(Some(kind)) if kind.is_file() => {}
                Ok(_) => outcomes.push(self.delete_file(entry.path(), sink)),
                Err(e) => outcomes.push(skip(Operation::DeleteFile, entry.path(), &source_path, e, sink)),
            }
        }

        outcomes
    }

    /// Delete every replica directory whose source counterpart is not a
    /// directory, together with its whole subtree
    pub fn prune_directories(
        &self,
        replica_root: &Path,
        source_root: &Path,
        sink: &dyn EventSink,
    ) -> Vec<ItemOutcome> {
        let mut outcomes = Vec::new();
        let mut walker = replica_walker(replica_root).into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    outcomes.push(walk_failure(e, replica_root, sink));
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let Some(source_path) = counterpart(entry.path(), replica_root, source_root) else {
                continue;
            };

            match source_kind(&source_path) {
                Ok(Some(kind)) if kind.is_dir() => {}
                Ok(_) => {
                    outcomes.push(self.delete_directory(entry.path(), sink));
                    // Subtree is gone (or would be, in a dry run)
                    walker.skip_current_dir();
                }
                Err(e) => {
                    outcomes.push(skip(Operation::DeleteDirectory, entry.path(), &source_path, e, sink))
                }
            }
        }

        outcomes
    }

    fn delete_file(&self, path: &Path, sink: &dyn EventSink) -> ItemOutcome {
        let result = if self.dry_run {
            Ok(())
        } else {
            remove_file(path)
        };

        match result {
            Ok(()) => {
                sink.emit(&SyncEvent::FileDeleted {
                    path: path.to_path_buf(),
                });
                ItemOutcome::Deleted
            }
            Err(e) => fail(Operation::DeleteFile, path, e, sink),
        }
    }

    fn delete_directory(&self, path: &Path, sink: &dyn EventSink) -> ItemOutcome {
        let result = if self.dry_run {
            Ok(())
        } else {
            remove_tree(path)
        };

        match result {
            Ok(()) => {
                sink.emit(&SyncEvent::DirectoryDeleted {
                    path: path.to_path_buf(),
                });
                ItemOutcome::Deleted
            }
            Err(e) => fail(Operation::DeleteDirectory, path, e, sink),
        }
    }
}

fn replica_walker(root: &Path) -> WalkDir {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
}

fn remove_file(path: &Path) -> io::Result<()> {
    clear_readonly(path)?;
    match fs::remove_file(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Kind of the entry at `path` in the source tree, following symlinks.
///
/// `Ok(None)` means it definitely does not exist, including when one of its
/// ancestors is a file. Any other failure means the answer is unknown.
fn source_kind(path: &Path) -> io::Result<Option<FileType>> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(Some(metadata.file_type())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => match path.parent().map(fs::metadata) {
            Some(Ok(parent)) if !parent.is_dir() => Ok(None),
            _ => Err(e),
        },
    }
}

fn fail(operation: Operation, path: &Path, e: io::Error, sink: &dyn EventSink) -> ItemOutcome {
    let error = SyncError::io(path, e);
    sink.emit(&SyncEvent::ItemFailed {
        operation,
        path: path.to_path_buf(),
        error: error.to_string(),
    });
    ItemOutcome::Failed(error)
}

fn skip(
    operation: Operation,
    replica_path: &Path,
    source_path: &Path,
    e: io::Error,
    sink: &dyn EventSink,
) -> ItemOutcome {
    let error = SyncError::SourceUnknown {
        path: source_path.to_path_buf(),
        source: e,
    };
    sink.emit(&SyncEvent::ItemSkipped {
        operation,
        path: replica_path.to_path_buf(),
        reason: error.to_string(),
    });
    ItemOutcome::Skipped(error)
}
