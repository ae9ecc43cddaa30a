//! Transparent LZ4 compression for stored objects
//!
//! Blobs are compressed before they hit disk and decompressed on read, so
//! callers only ever see original content. Compressed data carries a 4-byte
//! magic header:
//!
//! - `LZ4T`: LZ4 block data (with prepended size) follows
//! - `\0\0\0\0`: uncompressed data follows
//!
//! The raw fallback keeps already-compressed content (media, archives) from
//! growing in storage: if LZ4 does not shrink the payload, the original bytes
//! are stored behind the raw magic instead.

use crate::error::{Result, TreelineError};
use serde::{Deserialize, Serialize};

/// Magic header for LZ4-compressed objects
const LZ4_MAGIC: [u8; 4] = *b"LZ4T";
/// Magic header for objects stored uncompressed
const RAW_MAGIC: [u8; 4] = [0u8; 4];

/// Compression strategies for the content store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionStrategy {
    /// Store everything uncompressed
    None,
    /// LZ4 for all objects (default)
    Fast,
    /// LZ4 only for objects at least `min_size` bytes
    Adaptive {
        /// Smallest object size worth compressing
        min_size: usize,
    },
}

impl Default for CompressionStrategy {
    fn default() -> Self {
        CompressionStrategy::Fast
    }
}

impl CompressionStrategy {
    /// Parse a strategy from its configuration name
    pub fn from_name(name: &str) -> Self {
        match name {
            "none" => CompressionStrategy::None,
            "adaptive" => CompressionStrategy::Adaptive { min_size: 4096 },
            _ => CompressionStrategy::Fast,
        }
    }

    /// Configuration name for this strategy
    pub fn name(&self) -> &'static str {
        match self {
            CompressionStrategy::None => "none",
            CompressionStrategy::Fast => "fast",
            CompressionStrategy::Adaptive { .. } => "adaptive",
        }
    }
}

/// Compression engine wrapping strategy selection and the on-disk framing
#[derive(Debug, Clone, Copy)]
pub struct CompressionEngine {
    strategy: CompressionStrategy,
}

impl CompressionEngine {
    /// Create an engine with the given strategy
    pub fn new(strategy: CompressionStrategy) -> Self {
        Self { strategy }
    }

    /// Strategy this engine was configured with
    pub fn strategy(&self) -> CompressionStrategy {
        self.strategy
    }

    /// Compress content for storage, prepending the framing magic
    pub fn compress(&self, content: &[u8]) -> Result<Vec<u8>> {
        let should_compress = match self.strategy {
            CompressionStrategy::None => false,
            CompressionStrategy::Fast => true,
            CompressionStrategy::Adaptive { min_size } => content.len() >= min_size,
        };

        if should_compress {
            let compressed = lz4_flex::compress_prepend_size(content);
            if compressed.len() < content.len() {
                let mut framed = Vec::with_capacity(4 + compressed.len());
                framed.extend_from_slice(&LZ4_MAGIC);
                framed.extend_from_slice(&compressed);
                return Ok(framed);
            }
        }

        let mut framed = Vec::with_capacity(4 + content.len());
        framed.extend_from_slice(&RAW_MAGIC);
        framed.extend_from_slice(content);
        Ok(framed)
    }

    /// Decompress framed content back to the original bytes
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < 4 {
            return Err(TreelineError::decompression("truncated object header"));
        }
        let (magic, body) = data.split_at(4);
        if magic == LZ4_MAGIC {
            lz4_flex::decompress_size_prepended(body)
                .map_err(|e| TreelineError::decompression(e.to_string()))
        } else if magic == RAW_MAGIC {
            Ok(body.to_vec())
        } else {
            Err(TreelineError::decompression(format!(
                "unknown object magic: {:02x?}",
                magic
            )))
        }
    }
}
