// Path Utilities
// Helper functions for mapping paths between the source and replica trees

use std::io;
use std::path::{Component, Path, PathBuf};

/// Normalize a path by resolving . and .. components
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                components.pop();
            }
            Component::CurDir => {}
            c => components.push(c),
        }
    }

    components.iter().collect()
}

/// Make a path absolute against the working directory and normalize it.
///
/// Does not touch the filesystem beyond reading the working directory, so it
/// works for replica roots that do not exist yet.
pub fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize_path(path))
    } else {
        Ok(normalize_path(&std::env::current_dir()?.join(path)))
    }
}

/// Check if a path is inside a directory
pub fn is_inside(path: &Path, directory: &Path) -> bool {
    let path = normalize_path(path);
    let directory = normalize_path(directory);

    path.starts_with(&directory)
}

/// Map `path` under `from_root` to the same relative path under `to_root`.
///
/// Returns `None` when `path` does not live under `from_root`.
pub fn counterpart(path: &Path, from_root: &Path, to_root: &Path) -> Option<PathBuf> {
    let relative = path.strip_prefix(from_root).ok()?;
    if relative.as_os_str().is_empty() {
        Some(to_root.to_path_buf())
    } else {
        Some(to_root.join(relative))
    }
}
