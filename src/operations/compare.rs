// Content Comparator
// Decides whether a replica file has to be rewritten from its source
//
// Equality is (length, BLAKE3 digest). The digest is only a change detector;
// it is not meant to catch deliberate tampering with the replica.

use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::core::app_config::compiled;
use crate::error::{Result, SyncError};

/// Status of a replica file relative to its source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Replica counterpart does not exist yet
    Missing,
    /// Both exist but length or content differs
    Modified,
    /// Both exist with identical content
    Unchanged,
}

/// Length and content digest of a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSignature {
    pub len: u64,
    pub digest: blake3::Hash,
}

/// Compares files by size first and by streamed digest only when sizes agree
#[derive(Debug, Clone)]
pub struct ContentComparator {
    chunk_size: usize,
}

impl Default for ContentComparator {
    fn default() -> Self {
        Self::new(compiled::HASH_CHUNK_SIZE)
    }
}

impl ContentComparator {
    /// Create a comparator that reads files `chunk_size` bytes at a time
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Whether `replica` must be overwritten with `source`.
    ///
    /// Both paths are expected to be regular files. A read failure on either
    /// side is returned as [`SyncError::Unreadable`], never as "differs".
    pub fn needs_update(&self, source: &Path, replica: &Path) -> Result<bool> {
        Ok(self.status(source, replica)? != FileStatus::Unchanged)
    }

    /// Determine the status of a replica file
    pub fn status(&self, source: &Path, replica: &Path) -> Result<FileStatus> {
        let replica_len = match fs::metadata(replica) {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(FileStatus::Missing),
            Err(e) => return Err(SyncError::unreadable(replica, e)),
        };
        let source_len = fs::metadata(source)
            .map_err(|e| SyncError::unreadable(source, e))?
            .len();

        // Cheap rejection before any content is read
        if source_len != replica_len {
            return Ok(FileStatus::Modified);
        }

        let source_signature = self.signature(source, source_len)?;
        let replica_signature = self.signature(replica, replica_len)?;
        if source_signature == replica_signature {
            Ok(FileStatus::Unchanged)
        } else {
            Ok(FileStatus::Modified)
        }
    }

    /// Signature of a file whose length is already known
    pub fn signature(&self, path: &Path, len: u64) -> Result<FileSignature> {
        Ok(FileSignature {
            len,
            digest: self.digest(path)?,
        })
    }

    /// Stream a file through BLAKE3 without loading it into memory
    pub fn digest(&self, path: &Path) -> Result<blake3::Hash> {
        let mut file = File::open(path).map_err(|e| SyncError::unreadable(path, e))?;
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; self.chunk_size];

        loop {
            match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    hasher.update(&buffer[..n]);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(SyncError::unreadable(path, e)),
            }
        }

        Ok(hasher.finalize())
    }
}
