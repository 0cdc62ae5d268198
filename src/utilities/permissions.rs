// Permission Utilities
// Read-only detection and clearing before destructive operations

use std::fs::{self, Permissions};
use std::io::{self, ErrorKind};
use std::path::Path;

use walkdir::WalkDir;

#[cfg(unix)]
fn is_readonly_permissions(permissions: &Permissions) -> bool {
    use std::os::unix::fs::PermissionsExt;
    permissions.mode() & 0o200 == 0
}

#[cfg(not(unix))]
fn is_readonly_permissions(permissions: &Permissions) -> bool {
    permissions.readonly()
}

#[cfg(unix)]
fn writable(mut permissions: Permissions) -> Permissions {
    use std::os::unix::fs::PermissionsExt;
    permissions.set_mode(permissions.mode() | 0o200);
    permissions
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn writable(mut permissions: Permissions) -> Permissions {
    permissions.set_readonly(false);
    permissions
}

/// Clear the read-only attribute on `path` if it is set.
///
/// Symlinks are left alone. Returns whether the permissions were changed.
pub fn clear_readonly(path: &Path) -> io::Result<bool> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.file_type().is_symlink() || !is_readonly_permissions(&metadata.permissions()) {
        return Ok(false);
    }

    fs::set_permissions(path, writable(metadata.permissions()))?;
    Ok(true)
}

/// Recursively delete a directory subtree.
///
/// A read-only file or directory inside the subtree can make the first
/// attempt fail; in that case every entry is made writable and the delete is
/// retried once.
pub fn remove_tree(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            make_tree_writable(path);
            fs::remove_dir_all(path)
        }
        Err(e) => Err(e),
    }
}

fn make_tree_writable(path: &Path) {
    for entry in WalkDir::new(path).follow_links(false).into_iter().flatten() {
        // Best effort; the retried delete reports whatever is still blocked
        let _ = clear_readonly(entry.path());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn set_readonly(path: &Path) {
        let mut permissions = fs::metadata(path).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(path, permissions).unwrap();
    }

    #[test]
    fn test_clear_readonly_on_readonly_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("locked.txt");
        fs::write(&file, "content").unwrap();
        set_readonly(&file);

        assert!(fs::metadata(&file).unwrap().permissions().readonly());
        assert!(clear_readonly(&file).unwrap());
        assert!(!fs::metadata(&file).unwrap().permissions().readonly());
    }

    #[test]
    fn test_clear_readonly_leaves_writable_file_alone() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("open.txt");
        fs::write(&file, "content").unwrap();

        assert!(!clear_readonly(&file).unwrap());
    }

    #[test]
    fn test_clear_readonly_missing_path_errors() {
        let dir = TempDir::new().unwrap();
        assert!(clear_readonly(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_remove_tree_with_readonly_contents() {
        let dir = TempDir::new().unwrap();
        let tree = dir.path().join("tree");
        fs::create_dir_all(tree.join("nested")).unwrap();
        let file = tree.join("nested").join("locked.txt");
        fs::write(&file, "content").unwrap();
        set_readonly(&file);
        set_readonly(&tree.join("nested"));

        remove_tree(&tree).unwrap();

        assert!(!tree.exists());
    }

    #[test]
    fn test_remove_tree_missing_is_ok() {
        let dir = TempDir::new().unwrap();
        remove_tree(&dir.path().join("gone")).unwrap();
    }
}
