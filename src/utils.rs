//! Shared helpers for hashing and durable file writes

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Compute the SHA-256 hash of a byte slice
///
/// Returns a 64-character hexadecimal string. This is the content-addressing
/// function used throughout the library: blobs, encoded trees, and the
/// change-tags derived from them are all identified by this digest.
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Abbreviate a content hash or commit id for log output
pub fn short_hash(hash: &str) -> &str {
    &hash[..hash.len().min(8)]
}

/// Write a file atomically via a unique temporary file plus rename
///
/// Either the entire file is visible at `path` or the previous state is.
/// Concurrent writers racing on the same path each get their own temporary
/// file, so a rename never exposes partial content.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        crate::error::TreelineError::internal(format!("no parent directory for {:?}", path))
    })?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read a file to a string, mapping a missing file to `None`
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
