//! File-based content store.
//!
//! [`FileStore`] stores each entry as an independent file whose name is the
//! hex SHA-256 of the composite key. Hashing the key keeps file names valid on
//! every platform and makes collisions between distinct keys practically
//! impossible.
//!
//! On open, [`FileStore`] validates a `VERSION` file in its root. If the
//! version mismatches or is missing, the blob directory is wiped and
//! recreated, so blobs written in an older layout are never read back.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::{ContentStore, digest_bytes};

/// File-based [`ContentStore`] rooted at a directory on disk.
///
/// Directory layout:
/// ```text
/// {root}/
/// +-- VERSION            # store format version
/// +-- 3f2a...c1.json     # one blob per composite key
/// +-- ...
/// ```
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a file store at `root`, validating the store version.
    ///
    /// Errors during validation are logged but never fatal; a store that
    /// cannot be initialized simply misses on every read.
    pub async fn open(root: PathBuf, version: &str) -> Self {
        validate_version(&root, version).await;
        Self { root }
    }

    /// Root directory of this store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.json", digest_bytes(key.as_bytes())))
    }
}

#[async_trait]
impl ContentStore for FileStore {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        fs::read(self.blob_path(key)).await.ok()
    }

    async fn set(&self, key: &str, value: &[u8]) {
        if let Err(e) = fs::create_dir_all(&self.root).await {
            tracing::debug!(error = %e, "Failed to create content store directory");
            return;
        }
        if let Err(e) = fs::write(self.blob_path(key), value).await {
            tracing::debug!(error = %e, "Failed to write content store entry");
        }
    }
}

/// Validate the store version, wiping the directory on mismatch.
async fn validate_version(root: &Path, version: &str) {
    let version_file = root.join("VERSION");

    match fs::read_to_string(&version_file).await {
        Ok(stored) if stored == version => {
            tracing::debug!("content store version matches: {version}");
            return;
        }
        Ok(stored) => {
            tracing::info!(
                "content store version mismatch (stored={stored}, current={version}), wiping store"
            );
        }
        Err(_) => {
            tracing::debug!("no content store VERSION file found, initializing store");
        }
    }

    if fs::try_exists(root).await.unwrap_or(false)
        && let Err(e) = fs::remove_dir_all(root).await
    {
        tracing::warn!("failed to remove content store directory: {e}");
    }
    if let Err(e) = fs::create_dir_all(root).await {
        tracing::warn!("failed to create content store directory: {e}");
        return;
    }
    if let Err(e) = fs::write(&version_file, version).await {
        tracing::warn!("failed to write content store VERSION file: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_set_and_get() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path().join("content"), "1").await;

        store.set("1:v1/intro:abc", b"{\"compiled\":\"x\"}").await;
        assert_eq!(
            store.get("1:v1/intro:abc").await,
            Some(b"{\"compiled\":\"x\"}".to_vec())
        );
    }

    #[tokio::test]
    async fn test_file_store_missing_key() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path().join("content"), "1").await;

        assert_eq!(store.get("nonexistent").await, None);
    }

    #[tokio::test]
    async fn test_file_store_keys_with_separators_stay_flat() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("content");
        let store = FileStore::open(root.clone(), "1").await;

        store.set("v1/guides/../setup:weird key", b"data").await;

        let names: Vec<_> = std::fs::read_dir(&root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n != "VERSION")
            .collect();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].len(), 64 + ".json".len());
        assert!(names[0][..64].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_file_store_overwrite() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path().join("content"), "1").await;

        store.set("key", b"first").await;
        store.set("key", b"second").await;

        assert_eq!(store.get("key").await, Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn test_version_match_keeps_store() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("content");

        let store = FileStore::open(root.clone(), "1").await;
        store.set("key", b"preserved").await;

        let reopened = FileStore::open(root, "1").await;
        assert_eq!(reopened.get("key").await, Some(b"preserved".to_vec()));
    }

    #[tokio::test]
    async fn test_version_mismatch_wipes_store() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("content");

        let store = FileStore::open(root.clone(), "1").await;
        store.set("key", b"stale").await;

        let reopened = FileStore::open(root.clone(), "2").await;
        assert_eq!(reopened.get("key").await, None);
        assert_eq!(std::fs::read_to_string(root.join("VERSION")).unwrap(), "2");
    }

    #[tokio::test]
    async fn test_nonexistent_root_creates_version() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("deeply/nested/content");

        let _store = FileStore::open(root.clone(), "1").await;

        assert!(root.exists());
        assert_eq!(std::fs::read_to_string(root.join("VERSION")).unwrap(), "1");
    }
}
