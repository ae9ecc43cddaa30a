//! Versioned tree nodes
//!
//! A tree is the namespace of one collection: directories mapping names to
//! child nodes, and file nodes referencing blobs in the content store. Node
//! kinds are a tagged variant with exhaustive matching rather than an open
//! hierarchy.
//!
//! Sessions work on a private mutable copy of a committed tree. File writes
//! stage bytes on the node; nothing reaches the content store until the
//! owning session saves, at which point staged content is stored, the tree
//! is encoded deterministically (directory children are kept in a `BTreeMap`,
//! so equal trees encode and hash equal), and the encoded tree itself becomes
//! a content-addressed blob whose hash identifies the snapshot.

use crate::content::{slice_range, ContentStore};
use crate::error::{Result, TreelineError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

/// A node in the versioned namespace: a directory or a file
#[derive(Debug, Clone)]
pub enum TreeNode {
    /// Directory mapping names to child nodes
    Directory(DirNode),
    /// File referencing content in the blob store
    File(FileNode),
}

impl TreeNode {
    /// Whether this node is a directory
    pub fn is_dir(&self) -> bool {
        matches!(self, TreeNode::Directory(_))
    }

    /// Whether this node is a file
    pub fn is_file(&self) -> bool {
        matches!(self, TreeNode::File(_))
    }

    /// View as a directory, if it is one
    pub fn as_dir(&self) -> Option<&DirNode> {
        match self {
            TreeNode::Directory(dir) => Some(dir),
            TreeNode::File(_) => None,
        }
    }

    /// View as a file, if it is one
    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            TreeNode::File(file) => Some(file),
            TreeNode::Directory(_) => None,
        }
    }

    /// Mutable view as a directory, if it is one
    pub fn as_dir_mut(&mut self) -> Option<&mut DirNode> {
        match self {
            TreeNode::Directory(dir) => Some(dir),
            TreeNode::File(_) => None,
        }
    }

    /// Mutable view as a file, if it is one
    pub fn as_file_mut(&mut self) -> Option<&mut FileNode> {
        match self {
            TreeNode::File(file) => Some(file),
            TreeNode::Directory(_) => None,
        }
    }
}

/// Directory node: named children, names unique, lookup order irrelevant
#[derive(Debug, Clone, Default)]
pub struct DirNode {
    children: BTreeMap<String, TreeNode>,
}

impl DirNode {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-level lookup by name; absent is not an error
    pub fn get(&self, name: &str) -> Option<&TreeNode> {
        self.children.get(name)
    }

    /// Mutable single-level lookup by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut TreeNode> {
        self.children.get_mut(name)
    }

    /// Lookup a child file node by name
    pub fn file(&self, name: &str) -> Option<&FileNode> {
        self.get(name).and_then(TreeNode::as_file)
    }

    /// Mutable lookup of a child file node by name
    pub fn file_mut(&mut self, name: &str) -> Option<&mut FileNode> {
        self.get_mut(name).and_then(TreeNode::as_file_mut)
    }

    /// Lookup a child directory node by name
    pub fn dir(&self, name: &str) -> Option<&DirNode> {
        self.get(name).and_then(TreeNode::as_dir)
    }

    /// Mutable lookup of a child directory node by name
    pub fn dir_mut(&mut self, name: &str) -> Option<&mut DirNode> {
        self.get_mut(name).and_then(TreeNode::as_dir_mut)
    }

    /// Add an empty file node, replacing any existing file of that name
    ///
    /// Last-writer-wins within a session for file names. Fails with
    /// [`TreelineError::Conflict`] if a directory of that name exists.
    pub fn add_file(&mut self, name: &str) -> Result<&mut FileNode> {
        validate_name(name)?;
        if matches!(self.children.get(name), Some(TreeNode::Directory(_))) {
            return Err(TreelineError::conflict(format!(
                "'{}' already exists as a directory",
                name
            )));
        }

        self.children
            .insert(name.to_string(), TreeNode::File(FileNode::empty()));
        match self.children.get_mut(name) {
            Some(TreeNode::File(file)) => Ok(file),
            _ => Err(TreelineError::internal("file node vanished after insert")),
        }
    }

    /// Add a directory node, returning the existing one if already present
    ///
    /// Fails with [`TreelineError::Conflict`] if a file of that name exists.
    pub fn add_dir(&mut self, name: &str) -> Result<&mut DirNode> {
        validate_name(name)?;
        if matches!(self.children.get(name), Some(TreeNode::File(_))) {
            return Err(TreelineError::conflict(format!(
                "'{}' already exists as a file",
                name
            )));
        }

        self.children
            .entry(name.to_string())
            .or_insert_with(|| TreeNode::Directory(DirNode::new()));
        match self.children.get_mut(name) {
            Some(TreeNode::Directory(dir)) => Ok(dir),
            _ => Err(TreelineError::internal("directory node vanished after insert")),
        }
    }

    /// Remove a child from the working tree; persisted on save
    ///
    /// Returns whether a child of that name existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.children.remove(name).is_some()
    }

    /// Iterate children in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &TreeNode)> {
        self.children.iter()
    }

    /// Number of direct children
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether this directory has no children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Store staged file content as blobs, fixing up hashes and sizes
    pub(crate) fn commit_staged(&mut self, store: &ContentStore) -> Result<()> {
        for node in self.children.values_mut() {
            match node {
                TreeNode::Directory(dir) => dir.commit_staged(store)?,
                TreeNode::File(file) => {
                    if let Some(staged) = file.staged.take() {
                        file.size = staged.len() as u64;
                        file.content_hash = Some(store.put(&staged)?);
                    }
                }
            }
        }
        Ok(())
    }

    /// Whether any node in this subtree has uncommitted staged content
    pub(crate) fn has_staged(&self) -> bool {
        self.children.values().any(|node| match node {
            TreeNode::Directory(dir) => dir.has_staged(),
            TreeNode::File(file) => file.staged.is_some(),
        })
    }

    fn to_record(&self) -> Result<TreeRecord> {
        let mut entries = Vec::with_capacity(self.children.len());
        for (name, node) in &self.children {
            let record = match node {
                TreeNode::Directory(dir) => dir.to_record()?,
                TreeNode::File(file) => {
                    let content_hash = file.content_hash.clone().ok_or_else(|| {
                        TreelineError::internal(format!(
                            "file '{}' has staged content at encode time",
                            name
                        ))
                    })?;
                    TreeRecord::File {
                        content_hash,
                        size: file.size,
                    }
                }
            };
            entries.push((name.clone(), record));
        }
        Ok(TreeRecord::Directory { entries })
    }

    fn from_record(record: TreeRecord) -> Result<Self> {
        match record {
            TreeRecord::Directory { entries } => {
                let mut children = BTreeMap::new();
                for (name, child) in entries {
                    let node = match child {
                        TreeRecord::File { content_hash, size } => TreeNode::File(FileNode {
                            content_hash: Some(content_hash),
                            size,
                            staged: None,
                        }),
                        dir @ TreeRecord::Directory { .. } => {
                            TreeNode::Directory(DirNode::from_record(dir)?)
                        }
                    };
                    children.insert(name, node);
                }
                Ok(DirNode { children })
            }
            TreeRecord::File { .. } => Err(TreelineError::internal(
                "tree root decoded as a file record",
            )),
        }
    }
}

/// File node: committed blob reference plus optional staged replacement
#[derive(Debug, Clone)]
pub struct FileNode {
    /// Hash of the committed content; `None` until first save
    content_hash: Option<String>,
    /// Committed content size in bytes
    size: u64,
    /// Staged content awaiting the next save
    staged: Option<Vec<u8>>,
}

impl FileNode {
    /// A freshly added file with empty staged content
    fn empty() -> Self {
        Self {
            content_hash: None,
            size: 0,
            staged: Some(Vec::new()),
        }
    }

    /// Effective content size: staged size if dirty, committed size otherwise
    pub fn size(&self) -> u64 {
        self.staged
            .as_ref()
            .map(|s| s.len() as u64)
            .unwrap_or(self.size)
    }

    /// Hash of the committed content, if this node has been saved
    pub fn content_hash(&self) -> Option<&str> {
        self.content_hash.as_deref()
    }

    /// Whether this node carries staged, uncommitted content
    pub fn is_dirty(&self) -> bool {
        self.staged.is_some()
    }

    /// Stage new content; persisted when the owning session saves
    pub fn set_content(&mut self, bytes: Vec<u8>) {
        self.staged = Some(bytes);
    }

    /// Effective content: staged bytes if present, else the committed blob
    pub fn content(&self, store: &ContentStore) -> Result<Vec<u8>> {
        if let Some(staged) = &self.staged {
            Ok(staged.clone())
        } else if let Some(hash) = &self.content_hash {
            store.get(hash)
        } else {
            Ok(Vec::new())
        }
    }

    /// Stream the effective content to `out`, returning bytes written
    pub fn write_content<W: Write>(&self, store: &ContentStore, out: &mut W) -> Result<u64> {
        let content = self.content(store)?;
        out.write_all(&content)?;
        Ok(content.len() as u64)
    }

    /// Stream the half-open byte range `[start, end)` of the effective
    /// content to `out`
    ///
    /// Same bounds contract as [`ContentStore::get_range`].
    pub fn write_content_range<W: Write>(
        &self,
        store: &ContentStore,
        out: &mut W,
        start: u64,
        end: u64,
    ) -> Result<u64> {
        let slice = if let Some(staged) = &self.staged {
            slice_range(staged, start, end)?
        } else if let Some(hash) = &self.content_hash {
            store.get_range(hash, start, end)?
        } else {
            slice_range(&[], start, end)?
        };
        out.write_all(&slice)?;
        Ok(slice.len() as u64)
    }
}

/// Persisted tree encoding stored as a blob in the content store
#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeRecord {
    /// Directory entries in name order
    Directory { entries: Vec<(String, TreeRecord)> },
    /// File reference
    File { content_hash: String, size: u64 },
}

/// Encode a committed tree for storage
///
/// All staged content must have been flushed with `commit_staged` first.
pub(crate) fn encode_tree(root: &DirNode) -> Result<Vec<u8>> {
    let record = root.to_record()?;
    Ok(bincode::serde::encode_to_vec(&record, bincode::config::standard())?)
}

/// Decode a tree blob back into a working directory
pub(crate) fn decode_tree(bytes: &[u8]) -> Result<DirNode> {
    let (record, _): (TreeRecord, _) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
    DirNode::from_record(record)
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(TreelineError::conflict(format!(
            "invalid node name: '{}'",
            name
        )));
    }
    Ok(())
}
