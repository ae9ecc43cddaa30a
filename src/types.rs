//! Core data types shared across the library
//!
//! Configuration, persisted store metadata, and the statistics structs
//! returned by [`crate::Treeline::stats`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current on-disk format version
pub const FORMAT_VERSION: u32 = 1;

/// Configuration for a Treeline repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreelineConfig {
    /// Compression strategy name ("none", "fast", "adaptive")
    pub compression_strategy: String,
    /// Library version that created this repository
    pub version: String,
}

impl Default for TreelineConfig {
    fn default() -> Self {
        Self {
            compression_strategy: "fast".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Metadata persisted at the repository root as `metadata.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMetadata {
    /// Version of the on-disk format
    pub format_version: u32,
    /// Library version that created the repository
    pub treeline_version: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last opened timestamp
    pub last_accessed: DateTime<Utc>,
    /// Configuration
    pub config: TreelineConfig,
}

impl StoreMetadata {
    /// Build fresh metadata for a newly initialized repository
    pub fn new(config: TreelineConfig) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            treeline_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
            last_accessed: Utc::now(),
            config,
        }
    }
}

/// Cached metadata for a stored object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// SHA-256 hash of the uncompressed content
    pub hash: String,
    /// Size on disk including framing (compressed)
    pub stored_size: u64,
    /// Original content size
    pub uncompressed_size: u64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Repository statistics
#[derive(Debug, Default, Clone)]
pub struct RepositoryStats {
    /// Number of unique objects in the content store
    pub object_count: usize,
    /// Total stored (compressed) size of all objects in bytes
    pub stored_size: u64,
    /// Number of commits in the ledger
    pub commit_count: usize,
    /// Number of branches in the ledger
    pub branch_count: usize,
}
