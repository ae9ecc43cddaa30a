//! Error types for the Treeline library
//!
//! This module defines all error types that can occur during Treeline
//! operations. Every failure is surfaced synchronously to the caller; the
//! library never retries internally. The one error designed to be retried by
//! the caller is [`TreelineError::ConcurrentModification`], raised when a
//! branch head moved underneath a session between open and save.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the Treeline library
pub type Result<T> = std::result::Result<T, TreelineError>;

/// Main error type for all Treeline operations
#[derive(Debug, Error)]
pub enum TreelineError {
    /// I/O errors during storage operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors during bincode serialization/deserialization
    #[error("Bincode error: {0}")]
    Bincode(String),

    /// Object not found in content-addressable storage
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// Branch does not exist in the ledger
    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    /// Commit not found in the ledger
    #[error("Commit not found: {0}")]
    CommitNotFound(String),

    /// Tree node not found at the requested name
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Name collision or file/directory type mismatch in a tree
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Branch head moved since the caller read it; retry after refresh
    #[error("Concurrent modification on branch '{0}'")]
    ConcurrentModification(String),

    /// Mutation attempted on a session opened read-only
    #[error("Session is read-only")]
    ReadOnlySession,

    /// Malformed byte-range request
    #[error("Invalid range [{start}, {end}) for content of length {len}")]
    InvalidRange {
        /// Requested range start (inclusive)
        start: u64,
        /// Requested range end (exclusive)
        end: u64,
        /// Length of the content being sliced
        len: u64,
    },

    /// Head requested on a branch with no commits yet
    #[error("Branch '{0}' has no commits")]
    EmptyBranch(String),

    /// Branch name fails validation
    #[error("Invalid branch name: {0}")]
    InvalidBranchName(String),

    /// Storage is not initialized
    #[error("Storage not initialized at path: {0:?}")]
    StorageNotInitialized(PathBuf),

    /// Storage already exists
    #[error("Storage already exists at path: {0:?}")]
    StorageAlreadyExists(PathBuf),

    /// Compression errors
    #[error("Compression error: {0}")]
    Compression(String),

    /// Decompression errors
    #[error("Decompression error: {0}")]
    Decompression(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

// Implement conversions for bincode 2.0 error types
impl From<bincode::error::DecodeError> for TreelineError {
    fn from(err: bincode::error::DecodeError) -> Self {
        TreelineError::Bincode(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for TreelineError {
    fn from(err: bincode::error::EncodeError) -> Self {
        TreelineError::Bincode(err.to_string())
    }
}

impl TreelineError {
    /// Create a conflict error with a custom message
    pub fn conflict(msg: impl Into<String>) -> Self {
        TreelineError::Conflict(msg.into())
    }

    /// Create a compression error with a custom message
    pub fn compression(msg: impl Into<String>) -> Self {
        TreelineError::Compression(msg.into())
    }

    /// Create a decompression error with a custom message
    pub fn decompression(msg: impl Into<String>) -> Self {
        TreelineError::Decompression(msg.into())
    }

    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        TreelineError::Internal(msg.into())
    }

    /// Check if this error is retryable by the caller
    ///
    /// Only head-advance races are retryable: the caller must refresh its
    /// session against the new head and redo its mutation before saving
    /// again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TreelineError::ConcurrentModification(_))
    }

    /// Check if this error indicates a missing entity rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TreelineError::ObjectNotFound(_)
                | TreelineError::BranchNotFound(_)
                | TreelineError::CommitNotFound(_)
                | TreelineError::NodeNotFound(_)
        )
    }
}
