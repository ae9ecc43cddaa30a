//! Commit records forming per-branch linear history
//!
//! A commit is an immutable snapshot record: it names the encoded root tree
//! blob it points at and its parent commit, fixing the branch's ancestry at
//! creation time. Commits are persisted as JSON and never modified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable snapshot of one branch's tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Parent commit id; `None` for a branch's first commit
    pub parent_id: Option<String>,
    /// Content hash of the encoded root tree blob
    pub root_hash: String,
    /// Actor that produced this commit, if known
    pub author: Option<String>,
    /// Creation timestamp; exposed as the collection's modified date
    pub created_at: DateTime<Utc>,
}

impl Commit {
    /// Create a new commit record
    pub fn new(parent_id: Option<String>, root_hash: String, author: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            parent_id,
            root_hash,
            author,
            created_at: Utc::now(),
        }
    }

    /// Hash of the root tree, exposed externally as the collection's
    /// change-tag
    ///
    /// The ctag changes exactly when a save commits different content; two
    /// commits of identical trees share a ctag.
    pub fn change_tag(&self) -> &str {
        &self.root_hash
    }

    /// Abbreviated id for display and logging
    pub fn short_id(&self) -> &str {
        crate::utils::short_hash(&self.id)
    }

    /// Whether this is a branch's initial commit
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
