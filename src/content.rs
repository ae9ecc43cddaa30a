//! Content-addressable blob storage
//!
//! The content store is the leaf component of the repository: an append-only
//! collection of immutable blobs keyed by the SHA-256 hash of their
//! uncompressed content. Identical content is stored once regardless of how
//! many tree snapshots reference it.
//!
//! ## Layout
//!
//! Objects live in a sharded directory structure under the repository root:
//!
//! ```text
//! root/
//! ├── metadata.json          # Repository metadata and configuration
//! └── objects/               # Content-addressable objects (sharded)
//!     └── <prefix>/          # First 2 chars of hash
//!         └── <suffix>       # Remaining hash chars
//! ```
//!
//! Sharding keeps directory fan-out manageable for large object counts.
//!
//! ## Concurrency
//!
//! Reads need no synchronization: committed objects never change. Writes of
//! identical content may race benignly; each writer stages into a unique
//! temporary file and renames it over the final path, so the losing writer
//! just replaces the winner's byte-identical object. Object metadata is
//! cached in a `DashMap` for concurrent lookups.

use crate::collections::GxBuildHasher;
use crate::compression::CompressionEngine;
use crate::error::{Result, TreelineError};
use crate::types::{ObjectInfo, StoreMetadata, TreelineConfig};
use crate::utils::{atomic_write, hash_data, short_hash};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Content-addressed blob store backing a repository
pub struct ContentStore {
    /// Repository root directory
    root: PathBuf,
    /// Compression engine for transparent compression/decompression
    compression: CompressionEngine,
    /// Cache of object metadata for fast lookups
    objects: Arc<DashMap<String, ObjectInfo, GxBuildHasher>>,
    /// Repository metadata
    metadata: Arc<RwLock<StoreMetadata>>,
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore")
            .field("root", &self.root)
            .field("cached_objects", &self.objects.len())
            .finish()
    }
}

impl ContentStore {
    /// Initialize a new store at `root`
    ///
    /// Creates the directory structure and writes `metadata.json`. Fails with
    /// [`TreelineError::StorageAlreadyExists`] if `root` already exists.
    pub fn init(root: PathBuf, config: TreelineConfig) -> Result<Self> {
        if root.exists() {
            return Err(TreelineError::StorageAlreadyExists(root));
        }

        fs::create_dir_all(&root)?;
        fs::create_dir_all(root.join("objects"))?;

        let compression =
            CompressionEngine::new(crate::compression::CompressionStrategy::from_name(
                &config.compression_strategy,
            ));
        let metadata = StoreMetadata::new(config);
        let metadata_json = serde_json::to_string_pretty(&metadata)?;
        fs::write(root.join("metadata.json"), metadata_json)?;

        info!("Initialized content store at {:?}", root);

        Ok(Self {
            root,
            compression,
            objects: Arc::new(DashMap::with_capacity_and_hasher(
                1000,
                GxBuildHasher::default(),
            )),
            metadata: Arc::new(RwLock::new(metadata)),
        })
    }

    /// Open an existing store at `root`
    ///
    /// Fails with [`TreelineError::StorageNotInitialized`] if no repository
    /// exists there.
    pub fn open(root: PathBuf) -> Result<Self> {
        let metadata_path = root.join("metadata.json");
        if !metadata_path.exists() {
            return Err(TreelineError::StorageNotInitialized(root));
        }

        let metadata_json = fs::read_to_string(&metadata_path)?;
        let mut metadata: StoreMetadata = serde_json::from_str(&metadata_json)?;
        metadata.last_accessed = Utc::now();
        atomic_write(&metadata_path, serde_json::to_string_pretty(&metadata)?.as_bytes())?;

        let compression =
            CompressionEngine::new(crate::compression::CompressionStrategy::from_name(
                &metadata.config.compression_strategy,
            ));

        info!("Opened content store at {:?}", root);

        Ok(Self {
            root,
            compression,
            objects: Arc::new(DashMap::with_capacity_and_hasher(
                1000,
                GxBuildHasher::default(),
            )),
            metadata: Arc::new(RwLock::new(metadata)),
        })
    }

    /// Initialize a new store or open an existing one
    pub fn init_or_open(root: PathBuf, config: TreelineConfig) -> Result<Self> {
        if root.join("metadata.json").exists() {
            ContentStore::open(root)
        } else {
            ContentStore::init(root, config)
        }
    }

    /// Store content, returning its hash
    ///
    /// Idempotent: storing identical bytes twice yields the same hash and
    /// does not duplicate storage. The returned hash is the 64-character
    /// hexadecimal SHA-256 digest of the uncompressed content.
    pub fn put(&self, content: &[u8]) -> Result<String> {
        let hash = hash_data(content);

        if self.contains(&hash) {
            debug!("Object {} already present, dedup hit", short_hash(&hash));
            return Ok(hash);
        }

        let framed = self.compression.compress(content)?;
        let object_path = self.object_path(&hash);
        let shard_dir = object_path
            .parent()
            .ok_or_else(|| TreelineError::internal("object path has no shard directory"))?;
        fs::create_dir_all(shard_dir)?;

        // Unique temp file + rename; concurrent identical writes are benign
        let mut tmp = tempfile::NamedTempFile::new_in(shard_dir)?;
        tmp.write_all(&framed)?;
        tmp.persist(&object_path).map_err(|e| e.error)?;

        self.objects.insert(
            hash.clone(),
            ObjectInfo {
                hash: hash.clone(),
                stored_size: framed.len() as u64,
                uncompressed_size: content.len() as u64,
                created_at: Utc::now(),
            },
        );

        trace!(
            "Stored object {} ({} bytes, {} on disk)",
            short_hash(&hash),
            content.len(),
            framed.len()
        );
        Ok(hash)
    }

    /// Load the full content of an object by hash
    ///
    /// Fails with [`TreelineError::ObjectNotFound`] if the hash is unknown.
    pub fn get(&self, hash: &str) -> Result<Vec<u8>> {
        let object_path = self.object_path(hash);
        if !object_path.exists() {
            return Err(TreelineError::ObjectNotFound(hash.to_string()));
        }

        let framed = fs::read(&object_path)?;
        let content = self.compression.decompress(&framed)?;

        trace!("Loaded object {} ({} bytes)", short_hash(hash), content.len());
        Ok(content)
    }

    /// Load the half-open byte range `[start, end)` of an object
    ///
    /// Bounds are checked against the uncompressed length: `start > end` or
    /// `end > len` fails with [`TreelineError::InvalidRange`]. `start == end`
    /// is valid and yields an empty slice.
    pub fn get_range(&self, hash: &str, start: u64, end: u64) -> Result<Vec<u8>> {
        let content = self.get(hash)?;
        slice_range(&content, start, end)
    }

    /// Check whether an object exists
    pub fn contains(&self, hash: &str) -> bool {
        self.objects.contains_key(hash) || self.object_path(hash).exists()
    }

    /// Uncompressed size of an object
    pub fn object_size(&self, hash: &str) -> Result<u64> {
        if let Some(info) = self.objects.get(hash) {
            return Ok(info.uncompressed_size);
        }
        Ok(self.get(hash)?.len() as u64)
    }

    /// Count objects and total stored bytes by walking the shard directories
    pub fn object_totals(&self) -> Result<(usize, u64)> {
        let mut count = 0usize;
        let mut stored = 0u64;

        let objects_dir = self.root.join("objects");
        if objects_dir.exists() {
            for shard_entry in fs::read_dir(objects_dir)? {
                let shard_entry = shard_entry?;
                if !shard_entry.path().is_dir() {
                    continue;
                }
                for object_entry in fs::read_dir(shard_entry.path())? {
                    let object_entry = object_entry?;
                    if object_entry.path().is_file() {
                        count += 1;
                        stored += object_entry.metadata()?.len();
                    }
                }
            }
        }

        Ok((count, stored))
    }

    /// Repository root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Repository metadata
    pub fn metadata(&self) -> StoreMetadata {
        self.metadata.read().clone()
    }

    /// Sharded path for an object
    fn object_path(&self, hash: &str) -> PathBuf {
        let (prefix, suffix) = hash.split_at(2.min(hash.len()));
        self.root.join("objects").join(prefix).join(suffix)
    }
}

/// Slice `content[start..end)` with the range contract shared by the store
/// and staged file nodes
pub(crate) fn slice_range(content: &[u8], start: u64, end: u64) -> Result<Vec<u8>> {
    let len = content.len() as u64;
    if start > end || end > len {
        return Err(TreelineError::InvalidRange { start, end, len });
    }
    Ok(content[start as usize..end as usize].to_vec())
}
