// Configuration validation module
// Rejects run configurations that could never produce a correct replica

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::RunConfig;
use replica_sync::core::LoggingSettings;
use replica_sync::utilities::{absolute_path, is_inside};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Sync interval must be at least one second")]
    ZeroInterval,

    #[error("Hash chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("Unknown log format '{0}', expected text or json")]
    UnknownLogFormat(String),

    #[error("Source {0} does not exist or is not a directory")]
    SourceNotDirectory(PathBuf),

    #[error("Source and replica are the same directory: {0}")]
    SameDirectory(PathBuf),

    #[error("Replica {replica} is inside source {source_dir}")]
    ReplicaInsideSource { replica: PathBuf, source_dir: PathBuf },

    #[error("Source {source_dir} is inside replica {replica}")]
    SourceInsideReplica { replica: PathBuf, source_dir: PathBuf },

    #[error("Cannot resolve path {path}: {error}")]
    Unresolvable { path: PathBuf, error: io::Error },
}

/// Validate a resolved run configuration before anything is logged or written
pub fn validate(config: &RunConfig) -> Result<(), ConfigError> {
    if config.interval.is_zero() {
        return Err(ConfigError::ZeroInterval);
    }
    if config.sync.hash_chunk_size == 0 {
        return Err(ConfigError::ZeroChunkSize);
    }
    if !LoggingSettings::FORMATS.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::UnknownLogFormat(config.logging.format.clone()));
    }
    if !config.source.is_dir() {
        return Err(ConfigError::SourceNotDirectory(config.source.clone()));
    }
    validate_roots(&config.source, &config.replica)
}

/// Source and replica must be disjoint trees
pub fn validate_roots(source: &Path, replica: &Path) -> Result<(), ConfigError> {
    let source_dir = resolve(source)?;
    let replica_dir = resolve(replica)?;

    if source_dir == replica_dir {
        return Err(ConfigError::SameDirectory(source_dir));
    }
    if is_inside(&replica_dir, &source_dir) {
        return Err(ConfigError::ReplicaInsideSource {
            replica: replica_dir,
            source_dir,
        });
    }
    if is_inside(&source_dir, &replica_dir) {
        return Err(ConfigError::SourceInsideReplica {
            replica: replica_dir,
            source_dir,
        });
    }
    Ok(())
}

/// Absolute, symlink-resolved form of a path that may not exist yet.
/// The deepest existing ancestor is canonicalized and the rest appended.
fn resolve(path: &Path) -> Result<PathBuf, ConfigError> {
    let absolute = absolute_path(path).map_err(|error| ConfigError::Unresolvable {
        path: path.to_path_buf(),
        error,
    })?;

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    while fs::symlink_metadata(existing).is_err() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = fs::canonicalize(existing).unwrap_or_else(|_| existing.to_path_buf());
    for name in missing.iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}
