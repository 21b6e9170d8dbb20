//! Cache layer for DocXes.
//!
//! This crate provides the two persistent caches the build relies on:
//!
//! - [`ContentStore`]: content-addressable store mapping a composite cache key
//!   to a processed-output blob
//! - [`HashTracker`]: path to content-digest map used to skip unchanged files
//!
//! # Implementations
//!
//! - [`NullStore`]: No-op store (always misses), used when caching is bypassed
//! - [`FileStore`]: One file per entry, named by the SHA-256 of the key
//!
//! # Example
//!
//! ```
//! use docxes_cache::{ContentStore, NullStore};
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let store = NullStore;
//! store.set("v1/intro", b"<p>hello</p>").await;
//! assert_eq!(store.get("v1/intro").await, None); // NullStore always misses
//! # });
//! ```

mod ext;
mod file;
mod hash;

use std::io;
use std::path::Path;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

pub use ext::ContentStoreExt;
pub use file::FileStore;
pub use hash::{FileHashMap, HashTracker};

/// Key-value blob store addressed by an opaque composite key.
///
/// Implementations never fail loudly: a read problem is a miss and a write
/// problem is dropped, because every entry can be recomputed from source.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Retrieve the blob stored under `key`, or `None` on miss.
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `value` under `key`, overwriting any previous entry.
    async fn set(&self, key: &str, value: &[u8]);
}

/// No-op [`ContentStore`] that never stores or retrieves data.
///
/// Every `get` returns `None`; every `set` is silently discarded.
#[derive(Debug, Default)]
pub struct NullStore;

#[async_trait]
impl ContentStore for NullStore {
    async fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    async fn set(&self, _key: &str, _value: &[u8]) {}
}

/// Hex-encoded SHA-256 of `bytes`.
#[must_use]
pub fn digest_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Recursively delete the cache root.
///
/// A missing directory is not an error.
pub async fn clean(root: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(root).await {
        Ok(()) => {
            tracing::info!(path = %root.display(), "Cache cleaned");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
