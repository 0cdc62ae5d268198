// File Reconciler
// Makes one replica file match its source counterpart

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use super::compare::ContentComparator;
use super::outcome::ItemOutcome;
use crate::core::events::{EventSink, Operation, SyncEvent};
use crate::error::{Result, SyncError};
use crate::utilities::clear_readonly;

/// Suffix of the staging file a copy is written to before it is renamed
pub const TEMP_SUFFIX: &str = ".replica-sync.tmp";

/// Creates or updates replica files from their source counterparts
#[derive(Debug, Clone, Default)]
pub struct FileReconciler {
    comparator: ContentComparator,
    dry_run: bool,
}

impl FileReconciler {
    pub fn new(comparator: ContentComparator, dry_run: bool) -> Self {
        Self { comparator, dry_run }
    }

    /// Reconcile a single file and report the outcome to `sink`.
    ///
    /// Never returns an error: failures come back as
    /// [`ItemOutcome::Skipped`] or [`ItemOutcome::Failed`].
    pub fn reconcile(&self, source: &Path, replica: &Path, sink: &dyn EventSink) -> ItemOutcome {
        let (operation, outcome) = self.apply(source, replica);

        let event = match &outcome {
            ItemOutcome::Created => Some(SyncEvent::FileCreated {
                source: source.to_path_buf(),
                path: replica.to_path_buf(),
            }),
            ItemOutcome::Updated => Some(SyncEvent::FileUpdated {
                source: source.to_path_buf(),
                path: replica.to_path_buf(),
            }),
            ItemOutcome::Unchanged => Some(SyncEvent::FileUnchanged {
                path: replica.to_path_buf(),
            }),
            ItemOutcome::Skipped(e) => Some(SyncEvent::ItemSkipped {
                operation,
                path: replica.to_path_buf(),
                reason: e.to_string(),
            }),
            ItemOutcome::Failed(e) => Some(SyncEvent::ItemFailed {
                operation,
                path: replica.to_path_buf(),
                error: e.to_string(),
            }),
            ItemOutcome::Deleted => None,
        };
        if let Some(event) = event {
            sink.emit(&event);
        }

        outcome
    }

    fn apply(&self, source: &Path, replica: &Path) -> (Operation, ItemOutcome) {
        match fs::symlink_metadata(replica) {
            Ok(metadata) if metadata.is_dir() => {
                return (
                    Operation::CopyFile,
                    ItemOutcome::Failed(SyncError::TypeConflict {
                        path: replica.to_path_buf(),
                    }),
                );
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return (Operation::CopyFile, self.copy(source, replica, ItemOutcome::Created));
            }
            Err(e) => {
                return (Operation::CopyFile, ItemOutcome::Failed(SyncError::io(replica, e)));
            }
        }

        match self.comparator.needs_update(source, replica) {
            Ok(false) => (Operation::CompareFile, ItemOutcome::Unchanged),
            Ok(true) => {
                if !self.dry_run {
                    if let Err(e) = clear_readonly(replica) {
                        return (Operation::UpdateFile, ItemOutcome::Failed(SyncError::io(replica, e)));
                    }
                }
                (Operation::UpdateFile, self.copy(source, replica, ItemOutcome::Updated))
            }
            // Cannot tell whether the replica is stale; leave it as it is
            Err(e) => (Operation::CompareFile, ItemOutcome::Skipped(e)),
        }
    }

    fn copy(&self, source: &Path, replica: &Path, success: ItemOutcome) -> ItemOutcome {
        if self.dry_run {
            return success;
        }
        match copy_atomic(source, replica) {
            Ok(_) => success,
            Err(e) => ItemOutcome::Failed(e),
        }
    }
}

/// Bytes of the target name kept in a staging name
const TEMP_NAME_PREFIX: usize = 32;

/// Staging path for a copy into `replica`, in the same directory so the
/// final rename never crosses filesystems.
///
/// The name is bounded regardless of the target's length: a short prefix of
/// the target name plus a digest of the full name.
pub fn temp_path_for(replica: &Path) -> PathBuf {
    let name = replica.file_name().unwrap_or_default();
    let lossy = name.to_string_lossy();
    let mut cut = lossy.len().min(TEMP_NAME_PREFIX);
    while !lossy.is_char_boundary(cut) {
        cut -= 1;
    }
    let digest = blake3::hash(name.as_encoded_bytes()).to_hex();

    replica.with_file_name(format!(
        ".{}.{}.{}{}",
        &lossy[..cut],
        &digest.as_str()[..16],
        std::process::id(),
        TEMP_SUFFIX
    ))
}

/// Copy `source` over `replica` without ever exposing a partial file.
///
/// Content is written to a staging file, flushed, checked against the source
/// length and given the source's permissions before being renamed over the
/// target. On failure the staging file is removed and the target is left as
/// it was. Returns the number of bytes copied.
pub fn copy_atomic(source: &Path, replica: &Path) -> Result<u64> {
    let copy_error = |e: io::Error| SyncError::Copy {
        source_path: source.to_path_buf(),
        replica_path: replica.to_path_buf(),
        source: e,
    };

    let mut input = File::open(source).map_err(copy_error)?;
    let source_metadata = input.metadata().map_err(copy_error)?;
    let temp_path = temp_path_for(replica);

    let result = (|| -> Result<u64> {
        let mut output = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(copy_error)?;

        let written = io::copy(&mut input, &mut output).map_err(copy_error)?;
        output.sync_all().map_err(copy_error)?;
        drop(output);

        if written != source_metadata.len() {
            return Err(SyncError::Truncated {
                path: replica.to_path_buf(),
                expected: source_metadata.len(),
                actual: written,
            });
        }

        fs::set_permissions(&temp_path, source_metadata.permissions()).map_err(copy_error)?;
        fs::rename(&temp_path, replica).map_err(copy_error)?;
        Ok(written)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::MemorySink;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.txt");
        let replica = dir.path().join("replica.txt");
        (dir, source, replica)
    }

    fn set_readonly(path: &Path) {
        let mut permissions = fs::metadata(path).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(path, permissions).unwrap();
    }

    #[test]
    fn test_creates_missing_replica() {
        let (_dir, source, replica) = setup();
        fs::write(&source, "hello").unwrap();
        let sink = MemorySink::new();

        let outcome = FileReconciler::default().reconcile(&source, &replica, &sink);

        assert!(matches!(outcome, ItemOutcome::Created));
        assert_eq!(fs::read_to_string(&replica).unwrap(), "hello");
        assert!(matches!(sink.events()[0], SyncEvent::FileCreated { .. }));
    }

    #[test]
    fn test_updates_changed_replica() {
        let (_dir, source, replica) = setup();
        fs::write(&source, "New Content").unwrap();
        fs::write(&replica, "Old Content").unwrap();

        let outcome = FileReconciler::default().reconcile(&source, &replica, &MemorySink::new());

        assert!(matches!(outcome, ItemOutcome::Updated));
        assert_eq!(fs::read_to_string(&replica).unwrap(), "New Content");
    }

    #[test]
    fn test_identical_replica_is_untouched() {
        let (_dir, source, replica) = setup();
        fs::write(&source, "same").unwrap();
        fs::write(&replica, "same").unwrap();
        let before = fs::metadata(&replica).unwrap().modified().unwrap();
        let sink = MemorySink::new();

        let outcome = FileReconciler::default().reconcile(&source, &replica, &sink);

        assert!(matches!(outcome, ItemOutcome::Unchanged));
        assert_eq!(fs::metadata(&replica).unwrap().modified().unwrap(), before);
        assert_eq!(sink.write_count(), 0);
    }

    #[test]
    fn test_updates_readonly_replica() {
        let (_dir, source, replica) = setup();
        fs::write(&source, "fresh").unwrap();
        fs::write(&replica, "stale").unwrap();
        set_readonly(&replica);

        let outcome = FileReconciler::default().reconcile(&source, &replica, &MemorySink::new());

        assert!(matches!(outcome, ItemOutcome::Updated));
        assert_eq!(fs::read_to_string(&replica).unwrap(), "fresh");
    }

    #[test]
    fn test_vanished_source_on_create_fails_without_residue() {
        let (dir, source, replica) = setup();

        let outcome = FileReconciler::default().reconcile(&source, &replica, &MemorySink::new());

        assert!(matches!(outcome, ItemOutcome::Failed(SyncError::Copy { .. })));
        assert!(!replica.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unreadable_source_on_compare_is_skipped() {
        let (_dir, source, replica) = setup();
        fs::write(&replica, "keep me").unwrap();
        let sink = MemorySink::new();

        let outcome = FileReconciler::default().reconcile(&source, &replica, &sink);

        assert!(matches!(outcome, ItemOutcome::Skipped(SyncError::Unreadable { .. })));
        assert_eq!(fs::read_to_string(&replica).unwrap(), "keep me");
        assert!(matches!(sink.events()[0], SyncEvent::ItemSkipped { .. }));
    }

    #[test]
    fn test_directory_in_place_of_file_is_conflict() {
        let (_dir, source, replica) = setup();
        fs::write(&source, "file").unwrap();
        fs::create_dir(&replica).unwrap();

        let outcome = FileReconciler::default().reconcile(&source, &replica, &MemorySink::new());

        assert!(matches!(outcome, ItemOutcome::Failed(SyncError::TypeConflict { .. })));
        assert!(replica.is_dir());
    }

    #[test]
    fn test_dry_run_reports_without_writing() {
        let (_dir, source, replica) = setup();
        fs::write(&source, "hello").unwrap();
        let reconciler = FileReconciler::new(ContentComparator::default(), true);

        let outcome = reconciler.reconcile(&source, &replica, &MemorySink::new());

        assert!(matches!(outcome, ItemOutcome::Created));
        assert!(!replica.exists());
    }

    #[test]
    fn test_copy_preserves_readonly_source_permissions() {
        let (_dir, source, replica) = setup();
        fs::write(&source, "locked").unwrap();
        set_readonly(&source);

        copy_atomic(&source, &replica).unwrap();

        assert!(fs::metadata(&replica).unwrap().permissions().readonly());
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        let temp = temp_path_for(Path::new("/replica/dir/file.txt"));
        assert_eq!(temp.parent(), Some(Path::new("/replica/dir")));
        let name = temp.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(".file.txt."));
        assert!(name.ends_with(TEMP_SUFFIX));
    }

    #[test]
    fn test_temp_path_length_is_bounded() {
        let long = "n".repeat(240);
        let other = format!("{}m", "n".repeat(239));
        let temp = temp_path_for(&Path::new("/replica").join(&long));
        let name = temp.file_name().unwrap().len();

        assert!(name < 100, "staging name is {} bytes", name);
        assert_ne!(temp, temp_path_for(&Path::new("/replica").join(&other)));
    }

    #[test]
    fn test_temp_path_cuts_on_char_boundary() {
        let name = "é".repeat(40);
        let temp = temp_path_for(&Path::new("/replica").join(&name));
        let staged = temp.file_name().unwrap().to_str().unwrap();
        assert!(staged.starts_with(&format!(".{}.", "é".repeat(16))));
    }

    #[test]
    fn test_copies_file_with_long_name() {
        let dir = TempDir::new().unwrap();
        let name = "n".repeat(240);
        let source = dir.path().join("source");
        let replica = dir.path().join("replica");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&replica).unwrap();
        fs::write(source.join(&name), "long name").unwrap();

        let reconciler = FileReconciler::default();
        let sink = MemorySink::new();
        let outcome = reconciler.reconcile(&source.join(&name), &replica.join(&name), &sink);

        assert!(matches!(outcome, ItemOutcome::Created), "{:?}", outcome);
        assert_eq!(fs::read_to_string(replica.join(&name)).unwrap(), "long name");
        assert_eq!(fs::read_dir(&replica).unwrap().count(), 1);
    }
}
