//! Branch and head tracking
//!
//! The ledger maps branch names (one per logical collection) to their current
//! head commit and owns the commit records themselves. It is the single
//! point of mutual exclusion in the repository: every head advance is a
//! compare-and-swap against the head the caller last observed, serialized
//! under a ledger mutex. Losers of a race get
//! [`TreelineError::ConcurrentModification`] and must re-read the head and
//! redo their work.
//!
//! ## Layout
//!
//! ```text
//! root/
//! ├── commits/<commit-id>.json   # Immutable commit records
//! └── heads/<branch>             # Current head commit id (empty = no commits)
//! ```
//!
//! Head files are written atomically (unique temp file + rename), so a crash
//! mid-advance leaves the previous head intact.

use crate::collections::GxBuildHasher;
use crate::commit::Commit;
use crate::error::{Result, TreelineError};
use crate::utils::{atomic_write, read_optional, short_hash};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// A branch: named pointer to the current commit of one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    /// Branch name (collection identity)
    pub name: String,
    /// Current head commit id; `None` for a branch with no commits
    pub head_id: Option<String>,
}

/// Ledger of branches and commits under a repository root
pub struct BranchLedger {
    root: PathBuf,
    /// Branch name to current head commit id
    heads: Arc<DashMap<String, Option<String>, GxBuildHasher>>,
    /// Commit cache
    commits: Arc<DashMap<String, Commit, GxBuildHasher>>,
    /// Serializes compare-and-swap head advances
    advance_lock: Mutex<()>,
}

impl std::fmt::Debug for BranchLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BranchLedger")
            .field("root", &self.root)
            .field("branches", &self.heads.len())
            .field("cached_commits", &self.commits.len())
            .finish()
    }
}

impl BranchLedger {
    /// Initialize ledger directories under `root`
    pub fn init(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(root.join("commits"))?;
        fs::create_dir_all(root.join("heads"))?;
        info!("Initialized branch ledger at {:?}", root);
        Ok(Self {
            root,
            heads: Arc::new(DashMap::with_hasher(GxBuildHasher::default())),
            commits: Arc::new(DashMap::with_hasher(GxBuildHasher::default())),
            advance_lock: Mutex::new(()),
        })
    }

    /// Open an existing ledger, loading branch heads from disk
    pub fn open(root: PathBuf) -> Result<Self> {
        let heads_dir = root.join("heads");
        if !heads_dir.exists() {
            return Err(TreelineError::StorageNotInitialized(root));
        }

        let heads: Arc<DashMap<String, Option<String>, GxBuildHasher>> =
            Arc::new(DashMap::with_hasher(GxBuildHasher::default()));
        for entry in fs::read_dir(&heads_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let content = fs::read_to_string(entry.path())?;
            let head_id = {
                let trimmed = content.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            };
            heads.insert(name, head_id);
        }

        debug!("Loaded {} branch heads", heads.len());
        Ok(Self {
            root,
            heads,
            commits: Arc::new(DashMap::with_hasher(GxBuildHasher::default())),
            advance_lock: Mutex::new(()),
        })
    }

    /// Create a branch with no commits
    ///
    /// Fails with [`TreelineError::Conflict`] if the branch exists.
    pub fn create_branch(&self, name: &str) -> Result<Branch> {
        validate_branch_name(name)?;
        let _guard = self.advance_lock.lock();

        if self.heads.contains_key(name) {
            return Err(TreelineError::conflict(format!(
                "branch '{}' already exists",
                name
            )));
        }

        atomic_write(&self.head_path(name), b"")?;
        self.heads.insert(name.to_string(), None);

        info!("Created branch '{}'", name);
        Ok(Branch {
            name: name.to_string(),
            head_id: None,
        })
    }

    /// The branch currently authoritative for a collection, if it was ever
    /// created
    pub fn live_branch(&self, name: &str) -> Option<Branch> {
        self.heads.get(name).map(|head| Branch {
            name: name.to_string(),
            head_id: head.clone(),
        })
    }

    /// Whether a branch exists
    pub fn branch_exists(&self, name: &str) -> bool {
        self.heads.contains_key(name)
    }

    /// Current head commit id of a branch
    ///
    /// `Ok(None)` for an existing branch with no commits.
    pub fn head_id(&self, name: &str) -> Result<Option<String>> {
        self.heads
            .get(name)
            .map(|head| head.clone())
            .ok_or_else(|| TreelineError::BranchNotFound(name.to_string()))
    }

    /// Current head commit of a branch
    ///
    /// Fails with [`TreelineError::EmptyBranch`] if the branch has no commits
    /// yet.
    pub fn head(&self, name: &str) -> Result<Commit> {
        match self.head_id(name)? {
            Some(id) => self.commit(&id),
            None => Err(TreelineError::EmptyBranch(name.to_string())),
        }
    }

    /// Atomically advance a branch head to a new commit
    ///
    /// `expected_head` must equal the head the caller last observed; if
    /// another advance moved the head since, this fails with
    /// [`TreelineError::ConcurrentModification`] and nothing is written.
    /// Exactly one writer wins per head value.
    pub fn advance(
        &self,
        name: &str,
        expected_head: Option<&str>,
        root_hash: &str,
        author: Option<&str>,
    ) -> Result<Commit> {
        let _guard = self.advance_lock.lock();

        let current = self
            .heads
            .get(name)
            .map(|head| head.clone())
            .ok_or_else(|| TreelineError::BranchNotFound(name.to_string()))?;

        if current.as_deref() != expected_head {
            debug!(
                "Head race on '{}': expected {:?}, found {:?}",
                name,
                expected_head.map(short_hash),
                current.as_deref().map(short_hash)
            );
            return Err(TreelineError::ConcurrentModification(name.to_string()));
        }

        let commit = Commit::new(
            current,
            root_hash.to_string(),
            author.map(str::to_string),
        );

        // Commit record first, then the head pointer; a crash in between
        // leaves an unreferenced commit and the old head, never a dangling
        // head.
        let commit_json = serde_json::to_string_pretty(&commit)?;
        atomic_write(&self.commit_path(&commit.id), commit_json.as_bytes())?;
        atomic_write(&self.head_path(name), commit.id.as_bytes())?;

        self.commits.insert(commit.id.clone(), commit.clone());
        self.heads
            .insert(name.to_string(), Some(commit.id.clone()));

        info!(
            "Advanced '{}' to commit {} (tree {})",
            name,
            commit.short_id(),
            short_hash(root_hash)
        );
        Ok(commit)
    }

    /// Load a commit by id
    pub fn commit(&self, id: &str) -> Result<Commit> {
        if let Some(commit) = self.commits.get(id) {
            return Ok(commit.clone());
        }

        let path = self.commit_path(id);
        let json = read_optional(&path)?
            .ok_or_else(|| TreelineError::CommitNotFound(id.to_string()))?;
        let commit: Commit = serde_json::from_str(&json)?;
        self.commits.insert(id.to_string(), commit.clone());
        trace!("Loaded commit {}", commit.short_id());
        Ok(commit)
    }

    /// Change-tag of a branch: the head commit's root tree hash
    ///
    /// Updates exactly when a save advances the head, never on read.
    pub fn change_tag(&self, name: &str) -> Result<String> {
        Ok(self.head(name)?.change_tag().to_string())
    }

    /// Modified date of a branch: the head commit's creation timestamp
    pub fn modified_at(&self, name: &str) -> Result<DateTime<Utc>> {
        Ok(self.head(name)?.created_at)
    }

    /// Walk the branch's history from head to its initial commit
    ///
    /// Parent pointers are fixed at commit creation, so the walk is linear
    /// and cycle-free; newest commit first.
    pub fn history(&self, name: &str) -> Result<Vec<Commit>> {
        let mut commits = Vec::new();
        let mut cursor = self.head_id(name)?;
        while let Some(id) = cursor {
            let commit = self.commit(&id)?;
            cursor = commit.parent_id.clone();
            commits.push(commit);
        }
        Ok(commits)
    }

    /// Delete a branch pointer
    ///
    /// Commits and objects stay behind for external history pruning.
    pub fn delete_branch(&self, name: &str) -> Result<()> {
        let _guard = self.advance_lock.lock();
        if self.heads.remove(name).is_none() {
            return Err(TreelineError::BranchNotFound(name.to_string()));
        }
        let path = self.head_path(name);
        if path.exists() {
            fs::remove_file(path)?;
        }
        info!("Deleted branch '{}'", name);
        Ok(())
    }

    /// Names of all branches
    pub fn list_branches(&self) -> Vec<String> {
        let mut names: Vec<String> = self.heads.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of commit records on disk
    pub fn commit_count(&self) -> Result<usize> {
        let commits_dir = self.root.join("commits");
        if !commits_dir.exists() {
            return Ok(0);
        }
        Ok(fs::read_dir(commits_dir)?.count())
    }

    fn head_path(&self, name: &str) -> PathBuf {
        self.root.join("heads").join(name)
    }

    fn commit_path(&self, id: &str) -> PathBuf {
        self.root.join("commits").join(format!("{}.json", id))
    }
}

/// Validate a branch name for use as a head file name
pub fn validate_branch_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(TreelineError::InvalidBranchName(name.to_string()));
    }
    Ok(())
}
