//! # Treeline - Versioned content-addressed tree storage
//!
//! A storage engine for branched, versioned trees of named content: every
//! save produces an immutable commit of a whole tree, blobs are deduplicated
//! by content hash, and each branch exposes an opaque change-tag that moves
//! exactly when its content does.
//!
//! ## Overview
//!
//! Treeline gives applications that serve mutable hierarchical collections
//! (calendar stores, document trees, configuration namespaces) a Git-like
//! backend:
//!
//! - Branches name independent collections; each has a linear commit history
//! - Sessions provide snapshot-isolated read and write access to one branch
//! - Saves are atomic compare-and-swap head advances; concurrent writers
//!   never silently merge, the loser retries against the fresh tree
//! - Blobs and encoded trees live in a content-addressable store with
//!   transparent LZ4 compression and automatic deduplication
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use treeline::Treeline;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = Treeline::init(PathBuf::from("./data"))?;
//! repo.create_branch("inbox")?;
//!
//! // Write through a session
//! let mut session = repo.write_session("inbox")?;
//! session.root_mut()?
//!     .add_file("note.txt")?
//!     .set_content(b"hello".to_vec());
//! session.save(Some("alice"))?;
//!
//! // Poll for changes without reading content
//! let tag = repo.change_tag("inbox")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Concepts
//!
//! ### Branches and Commits
//!
//! A branch is a named pointer to the head of a linear commit chain. Each
//! commit records its parent, the hash of the encoded root tree, an optional
//! author, and a creation timestamp. Commits are immutable; history never
//! rewrites.
//!
//! ### Sessions
//!
//! A [`session::DataSession`] decodes the branch head into a private working
//! tree. Mutations stage content on the tree; nothing persists until
//! `save`, which stores staged blobs, encodes the tree, and advances the
//! head only if it still matches the head the session was opened at. Losing
//! that race yields [`error::TreelineError::ConcurrentModification`]; the
//! session refreshes and the caller redoes its work.
//!
//! ### Change Tags
//!
//! The change-tag of a branch is its head commit's root tree hash. Equal
//! trees hash equal, so the tag moves exactly when content changes and
//! never on reads, which makes it a correct cache-invalidation token for
//! sync protocols.
//!
//! ## Error Handling
//!
//! All operations return `Result<T, TreelineError>`.
//! [`error::TreelineError::is_retryable`] distinguishes head races, the one
//! error class a caller should refresh-and-retry on, from genuine failures.
//!
//! ## Module Organization
//!
//! - [`treeline`]: Main repository API and builder
//! - [`session`]: Snapshot-isolated units of work
//! - [`tree`]: Directory and file nodes of the versioned namespace
//! - [`ledger`]: Branch heads and commit records
//! - [`commit`]: Commit record type
//! - [`content`]: Content-addressable blob store
//! - [`compression`]: Compression strategies and on-disk framing
//! - [`types`]: Configuration, metadata, and statistics
//! - [`error`]: Error types and handling

// Public API modules
pub mod commit;
pub mod compression;
pub mod content;
pub mod error;
pub mod ledger;
pub mod session;
pub mod tree;
pub mod treeline;
pub mod types;

// Internal modules
mod collections;
mod utils;

// Re-export main types for convenience
pub use commit::Commit;
pub use compression::{CompressionEngine, CompressionStrategy};
pub use content::ContentStore;
pub use error::{Result, TreelineError};
pub use ledger::{Branch, BranchLedger};
pub use session::DataSession;
pub use tree::{DirNode, FileNode, TreeNode};
pub use treeline::{Treeline, TreelineBuilder};
pub use types::*;
