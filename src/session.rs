//! Transactional data sessions over a branch
//!
//! A session is a unit-of-work view of one branch's tree. Opening a session
//! decodes the branch head's root tree into a private working copy; every
//! read and mutation happens against that copy, so the session is snapshot
//! isolated from concurrent saves by other sessions until it is refreshed.
//!
//! ## Lifecycle
//!
//! ```text
//! Open(clean) --mutation--> Open(dirty) --save ok--> Open(clean, new head)
//!                                       --save race--> Open(dirty, stale)
//!                                                        --refresh--> Open(clean)
//! ```
//!
//! `save` is the only operation that persists anything or changes the
//! branch's externally visible change-tag. On a lost head race it returns
//! [`TreelineError::ConcurrentModification`] and marks the session stale;
//! the caller must [`DataSession::refresh`] (which discards local mutations
//! and re-bases on the new head) and redo its mutation before saving again.
//! There is no silent merge. A session abandoned before save leaves the
//! branch untouched.

use crate::commit::Commit;
use crate::content::ContentStore;
use crate::error::{Result, TreelineError};
use crate::ledger::BranchLedger;
use crate::tree::{decode_tree, encode_tree, DirNode, FileNode};
use std::sync::Arc;
use tracing::{debug, trace};

/// A unit-of-work view over one branch's tree
pub struct DataSession {
    store: Arc<ContentStore>,
    ledger: Arc<BranchLedger>,
    branch: String,
    writable: bool,
    /// Head commit this session's working tree was decoded from
    base_head: Option<String>,
    root: DirNode,
    dirty: bool,
    stale: bool,
}

impl std::fmt::Debug for DataSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSession")
            .field("branch", &self.branch)
            .field("writable", &self.writable)
            .field("base_head", &self.base_head)
            .field("dirty", &self.dirty)
            .field("stale", &self.stale)
            .finish()
    }
}

impl DataSession {
    /// Open a session against a branch's current head
    ///
    /// Fails with [`TreelineError::BranchNotFound`] if the branch was never
    /// created. An empty branch yields an empty working tree.
    pub(crate) fn open(
        store: Arc<ContentStore>,
        ledger: Arc<BranchLedger>,
        branch: &str,
        writable: bool,
    ) -> Result<Self> {
        let (base_head, root) = Self::load_working_tree(&store, &ledger, branch)?;
        debug!(
            "Opened {} session on '{}' at head {:?}",
            if writable { "writable" } else { "read-only" },
            branch,
            base_head.as_deref().map(crate::utils::short_hash)
        );
        Ok(Self {
            store,
            ledger,
            branch: branch.to_string(),
            writable,
            base_head,
            root,
            dirty: false,
            stale: false,
        })
    }

    fn load_working_tree(
        store: &ContentStore,
        ledger: &BranchLedger,
        branch: &str,
    ) -> Result<(Option<String>, DirNode)> {
        match ledger.head_id(branch)? {
            Some(head_id) => {
                let commit = ledger.commit(&head_id)?;
                let tree_bytes = store.get(&commit.root_hash)?;
                Ok((Some(head_id), decode_tree(&tree_bytes)?))
            }
            None => Ok((None, DirNode::new())),
        }
    }

    /// Branch this session is scoped to
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Whether mutations are permitted
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Whether the working tree has uncommitted mutations
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether a save lost a head race since the last open or refresh
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Head commit id this session is based on
    pub fn base_head(&self) -> Option<&str> {
        self.base_head.as_deref()
    }

    /// Content store backing this session, for streaming node content
    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Entry point for read-only traversal of the working tree
    pub fn root(&self) -> &DirNode {
        &self.root
    }

    /// Entry point for mutating traversal of the working tree
    ///
    /// Fails with [`TreelineError::ReadOnlySession`] on a read-only session.
    /// Marks the session dirty.
    pub fn root_mut(&mut self) -> Result<&mut DirNode> {
        if !self.writable {
            return Err(TreelineError::ReadOnlySession);
        }
        self.dirty = true;
        Ok(&mut self.root)
    }

    /// Lookup a file node at the root by name
    pub fn file(&self, name: &str) -> Option<&FileNode> {
        self.root.file(name)
    }

    /// Mutable lookup of a root file node by name
    ///
    /// Fails with [`TreelineError::ReadOnlySession`] on a read-only session.
    pub fn file_mut(&mut self, name: &str) -> Result<Option<&mut FileNode>> {
        if !self.writable {
            return Err(TreelineError::ReadOnlySession);
        }
        if self.root.file(name).is_some() {
            self.dirty = true;
        }
        Ok(self.root.file_mut(name))
    }

    /// Read the full content of a root file node
    ///
    /// Fails with [`TreelineError::NodeNotFound`] if no file of that name
    /// exists in the working tree.
    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        let file = self
            .file(name)
            .ok_or_else(|| TreelineError::NodeNotFound(name.to_string()))?;
        file.content(&self.store)
    }

    /// Read the half-open byte range `[start, end)` of a root file node
    pub fn read_range(&self, name: &str, start: u64, end: u64) -> Result<Vec<u8>> {
        let file = self
            .file(name)
            .ok_or_else(|| TreelineError::NodeNotFound(name.to_string()))?;
        let mut out = Vec::new();
        file.write_content_range(&self.store, &mut out, start, end)?;
        Ok(out)
    }

    /// Persist the working tree as a new commit and advance the branch head
    ///
    /// Stages blobs for all dirty file nodes, encodes the tree, and performs
    /// a compare-and-swap advance against this session's base head. On
    /// success the working tree becomes the committed tree and the session
    /// is clean at the new head, ready for further work.
    ///
    /// A clean session on a non-empty branch returns the current head
    /// without committing; the first save on an empty branch commits even an
    /// empty tree to establish the head.
    pub fn save(&mut self, author: Option<&str>) -> Result<Commit> {
        if !self.writable {
            return Err(TreelineError::ReadOnlySession);
        }
        if !self.dirty && self.base_head.is_some() {
            trace!("Save on clean session of '{}', nothing to commit", self.branch);
            return self.ledger.head(&self.branch);
        }

        // Blobs go into the append-only store before the head moves, like
        // any content-addressed system; a lost race leaves them unreferenced
        // and harmless.
        self.root.commit_staged(&self.store)?;
        let encoded = encode_tree(&self.root)?;
        let root_hash = self.store.put(&encoded)?;

        match self.ledger.advance(
            &self.branch,
            self.base_head.as_deref(),
            &root_hash,
            author,
        ) {
            Ok(commit) => {
                self.base_head = Some(commit.id.clone());
                self.dirty = false;
                self.stale = false;
                debug!(
                    "Session saved '{}' at commit {}",
                    self.branch,
                    commit.short_id()
                );
                Ok(commit)
            }
            Err(err @ TreelineError::ConcurrentModification(_)) => {
                self.stale = true;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Re-base the session on the branch's current head
    ///
    /// Discards all local mutations; after a lost save race the caller redoes
    /// its mutation against the fresh tree and saves again.
    pub fn refresh(&mut self) -> Result<()> {
        let (base_head, root) = Self::load_working_tree(&self.store, &self.ledger, &self.branch)?;
        self.base_head = base_head;
        self.root = root;
        self.dirty = false;
        self.stale = false;
        debug!(
            "Refreshed session on '{}' to head {:?}",
            self.branch,
            self.base_head.as_deref().map(crate::utils::short_hash)
        );
        Ok(())
    }
}
