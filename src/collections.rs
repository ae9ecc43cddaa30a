//! Hasher selection that switches between gxhash and std based on feature
//! flags. This allows building on systems without specific CPU intrinsics
//! (AES-NI, SSE2) while providing better performance on systems that support
//! these features.

/// Build hasher for the concurrent caches: gxhash when available, std
/// otherwise
#[cfg(feature = "gxhash")]
pub use gxhash::GxBuildHasher;

/// Build hasher for the concurrent caches: gxhash when available, std
/// otherwise
#[cfg(not(feature = "gxhash"))]
pub type GxBuildHasher = std::hash::RandomState;
