//! Main Treeline repository API
//!
//! [`Treeline`] wires the content store, the branch ledger, and data
//! sessions together behind one handle. It is the only type most callers
//! need: create or open a repository, create branches for collections, open
//! sessions to read and mutate them, and poll change-tags to detect updates.

use crate::content::ContentStore;
use crate::error::{Result, TreelineError};
use crate::ledger::{Branch, BranchLedger};
use crate::session::DataSession;
use crate::types::{RepositoryStats, StoreMetadata, TreelineConfig};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

/// A versioned, content-addressed repository of branched trees
///
/// # Examples
///
/// ```rust,no_run
/// use treeline::Treeline;
/// use std::path::PathBuf;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let repo = Treeline::init(PathBuf::from("./calendars"))?;
/// repo.create_branch("alice-default")?;
///
/// let mut session = repo.write_session("alice-default")?;
/// session.root_mut()?
///     .add_file("event-1.ics")?
///     .set_content(b"BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n".to_vec());
/// let commit = session.save(Some("alice"))?;
///
/// // Change-tag moves exactly when a save commits new content
/// assert_eq!(repo.change_tag("alice-default")?, commit.change_tag());
/// # Ok(())
/// # }
/// ```
pub struct Treeline {
    /// Content-addressed blob store
    store: Arc<ContentStore>,
    /// Branch heads and commit records
    ledger: Arc<BranchLedger>,
    /// Default author recorded on commits when the caller gives none
    default_author: Option<String>,
}

impl std::fmt::Debug for Treeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Treeline")
            .field("root", &self.store.root())
            .field("branches", &self.ledger.list_branches().len())
            .finish()
    }
}

impl Treeline {
    /// Initialize a new repository at `root`
    ///
    /// Creates the full on-disk layout (objects, commits, heads, metadata).
    ///
    /// # Errors
    ///
    /// Fails with [`TreelineError::StorageAlreadyExists`] if `root` already
    /// exists; use [`Treeline::open`] for existing repositories.
    #[instrument]
    pub fn init(root: PathBuf) -> Result<Self> {
        info!("Initializing repository at {:?}", root);
        let store = ContentStore::init(root.clone(), TreelineConfig::default())?;
        let ledger = BranchLedger::init(root)?;
        Ok(Self {
            store: Arc::new(store),
            ledger: Arc::new(ledger),
            default_author: None,
        })
    }

    /// Open an existing repository at `root`
    ///
    /// # Errors
    ///
    /// Fails with [`TreelineError::StorageNotInitialized`] if no repository
    /// exists there.
    #[instrument]
    pub fn open(root: PathBuf) -> Result<Self> {
        let store = ContentStore::open(root.clone())?;
        let ledger = BranchLedger::open(root)?;
        Ok(Self {
            store: Arc::new(store),
            ledger: Arc::new(ledger),
            default_author: None,
        })
    }

    /// Open a repository, initializing it first if absent
    pub fn init_or_open(root: PathBuf) -> Result<Self> {
        if root.join("metadata.json").exists() {
            Self::open(root)
        } else {
            Self::init(root)
        }
    }

    /// Repository root path
    pub fn root(&self) -> &Path {
        self.store.root()
    }

    /// Create a branch with no commits
    ///
    /// A branch is the unit of collection identity; its head moves only
    /// through session saves.
    ///
    /// # Errors
    ///
    /// Fails with [`TreelineError::Conflict`] if the branch already exists
    /// and [`TreelineError::InvalidBranchName`] for unusable names.
    pub fn create_branch(&self, name: &str) -> Result<Branch> {
        self.ledger.create_branch(name)
    }

    /// The branch currently authoritative for a collection, if any
    pub fn live_branch(&self, name: &str) -> Option<Branch> {
        self.ledger.live_branch(name)
    }

    /// Whether a branch exists
    pub fn branch_exists(&self, name: &str) -> bool {
        self.ledger.branch_exists(name)
    }

    /// Names of all branches, sorted
    pub fn list_branches(&self) -> Vec<String> {
        self.ledger.list_branches()
    }

    /// Delete a branch pointer
    ///
    /// Commits and objects remain for external history pruning; only the
    /// head goes away.
    pub fn delete_branch(&self, name: &str) -> Result<()> {
        self.ledger.delete_branch(name)
    }

    /// Head commit of a branch
    ///
    /// # Errors
    ///
    /// [`TreelineError::BranchNotFound`] for unknown branches and
    /// [`TreelineError::EmptyBranch`] for branches with no commits yet.
    pub fn head(&self, name: &str) -> Result<crate::commit::Commit> {
        self.ledger.head(name)
    }

    /// Branch history from head to initial commit, newest first
    pub fn history(&self, name: &str) -> Result<Vec<crate::commit::Commit>> {
        self.ledger.history(name)
    }

    /// Change-tag of a branch: an opaque token that changes exactly when a
    /// save commits different content
    ///
    /// Pollers compare tags across calls; reads never move the tag.
    pub fn change_tag(&self, name: &str) -> Result<String> {
        self.ledger.change_tag(name)
    }

    /// Modified date of a branch: its head commit's creation time
    pub fn modified_at(&self, name: &str) -> Result<DateTime<Utc>> {
        self.ledger.modified_at(name)
    }

    /// Open a read-only session on a branch's current head
    pub fn read_session(&self, branch: &str) -> Result<DataSession> {
        self.session(branch, false)
    }

    /// Open a writable session on a branch's current head
    pub fn write_session(&self, branch: &str) -> Result<DataSession> {
        self.session(branch, true)
    }

    /// Open a session on a branch's current head
    ///
    /// The session gets a snapshot-isolated working copy of the head tree;
    /// see [`DataSession`] for the save and refresh protocol.
    ///
    /// # Errors
    ///
    /// Fails with [`TreelineError::BranchNotFound`] if the branch was never
    /// created.
    pub fn session(&self, branch: &str, writable: bool) -> Result<DataSession> {
        DataSession::open(
            Arc::clone(&self.store),
            Arc::clone(&self.ledger),
            branch,
            writable,
        )
    }

    /// Run a writable unit of work with automatic retry on head races
    ///
    /// Opens a session, applies `work`, and saves. If the save loses a
    /// compare-and-swap race the session is refreshed and `work` is applied
    /// again against the fresh tree, up to `max_retries` additional
    /// attempts. `work` must therefore be safe to re-run.
    pub fn with_session<F>(
        &self,
        branch: &str,
        max_retries: usize,
        mut work: F,
    ) -> Result<crate::commit::Commit>
    where
        F: FnMut(&mut DataSession) -> Result<()>,
    {
        let mut session = self.session(branch, true)?;
        let mut attempts = 0;
        loop {
            work(&mut session)?;
            match session.save(self.default_author.as_deref()) {
                Ok(commit) => return Ok(commit),
                Err(TreelineError::ConcurrentModification(_)) if attempts < max_retries => {
                    attempts += 1;
                    session.refresh()?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Repository metadata
    pub fn metadata(&self) -> StoreMetadata {
        self.store.metadata()
    }

    /// Aggregate repository statistics
    pub fn stats(&self) -> Result<RepositoryStats> {
        let (object_count, stored_size) = self.store.object_totals()?;
        Ok(RepositoryStats {
            object_count,
            stored_size,
            commit_count: self.ledger.commit_count()?,
            branch_count: self.ledger.list_branches().len(),
        })
    }
}

/// Builder for [`Treeline`] instances with custom configuration
///
/// # Examples
///
/// ```rust,no_run
/// use treeline::{TreelineBuilder, CompressionStrategy};
/// use std::path::PathBuf;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let repo = TreelineBuilder::new()
///     .compression_strategy(CompressionStrategy::Adaptive { min_size: 512 })
///     .default_author("calendar-service")
///     .build(PathBuf::from("./calendars"))?;
/// # Ok(())
/// # }
/// ```
pub struct TreelineBuilder {
    compression_strategy: crate::compression::CompressionStrategy,
    default_author: Option<String>,
}

impl TreelineBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        Self {
            compression_strategy: crate::compression::CompressionStrategy::default(),
            default_author: None,
        }
    }

    /// Set the compression strategy for stored objects
    pub fn compression_strategy(
        mut self,
        strategy: crate::compression::CompressionStrategy,
    ) -> Self {
        self.compression_strategy = strategy;
        self
    }

    /// Set the author recorded on commits made through
    /// [`Treeline::with_session`]
    pub fn default_author(mut self, author: impl Into<String>) -> Self {
        self.default_author = Some(author.into());
        self
    }

    /// Build a repository at `root`, initializing it if absent
    ///
    /// The compression strategy only takes effect when the repository is
    /// created; opening an existing repository keeps its stored
    /// configuration.
    pub fn build(self, root: PathBuf) -> Result<Treeline> {
        let config = TreelineConfig {
            compression_strategy: self.compression_strategy.name().to_string(),
            ..TreelineConfig::default()
        };
        let store = ContentStore::init_or_open(root.clone(), config)?;
        let ledger = if root.join("heads").exists() {
            BranchLedger::open(root)?
        } else {
            BranchLedger::init(root)?
        };
        Ok(Treeline {
            store: Arc::new(store),
            ledger: Arc::new(ledger),
            default_author: self.default_author,
        })
    }
}

impl Default for TreelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
