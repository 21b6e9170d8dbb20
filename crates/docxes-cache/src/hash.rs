//! File hash tracking for incremental builds.
//!
//! [`HashTracker`] keeps a persisted map from content-root-relative source
//! paths to the SHA-256 of their bytes. A build asks [`HashTracker::has_changed`]
//! before reprocessing a file and records new digests once a file has been
//! rebuilt and persisted.
//!
//! The map is stored as pretty JSON (`file-hashes.json`) with sorted keys so
//! that repeated builds produce identical files.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::digest_bytes;

/// Persisted path → digest map.
pub type FileHashMap = BTreeMap<String, String>;

/// Tracks content digests of source files across builds.
#[derive(Debug)]
pub struct HashTracker {
    path: PathBuf,
    hashes: FileHashMap,
}

impl HashTracker {
    /// Create an empty tracker persisted at `path`.
    #[must_use]
    pub fn empty(path: PathBuf) -> Self {
        Self {
            path,
            hashes: FileHashMap::new(),
        }
    }

    /// Load tracker state from `path`.
    ///
    /// A missing file starts fresh. An unreadable or malformed file is logged
    /// and also starts fresh, which at worst reprocesses every document.
    pub async fn load(path: PathBuf) -> Self {
        let hashes = match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(hashes) => hashes,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring corrupt file hash map");
                    FileHashMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => FileHashMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read file hash map");
                FileHashMap::new()
            }
        };
        tracing::debug!(entries = hashes.len(), "File hash map loaded");
        Self { path, hashes }
    }

    /// Persist tracker state, creating parent directories as needed.
    pub async fn save(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(&self.hashes).map_err(io::Error::other)?;
        fs::write(&self.path, json).await
    }

    /// Compute the digest of a file's contents.
    pub async fn digest_file(path: &Path) -> io::Result<String> {
        let bytes = fs::read(path).await?;
        Ok(digest_bytes(&bytes))
    }

    /// True when no digest is stored for `path` or the stored one differs.
    #[must_use]
    pub fn has_changed(&self, path: &str, digest: &str) -> bool {
        self.hashes.get(path).is_none_or(|stored| stored != digest)
    }

    /// Record the digest for `path`.
    pub fn update(&mut self, path: impl Into<String>, digest: impl Into<String>) {
        self.hashes.insert(path.into(), digest.into());
    }

    /// Forget the digest for `path`.
    pub fn remove(&mut self, path: &str) {
        self.hashes.remove(path);
    }

    /// Stored digest for `path`, if any.
    #[must_use]
    pub fn stored(&self, path: &str) -> Option<&str> {
        self.hashes.get(path).map(String::as_str)
    }

    /// Number of tracked files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// True when nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_has_changed_without_stored_digest() {
        let tracker = HashTracker::empty(PathBuf::from("unused.json"));
        assert!(tracker.has_changed("v1/intro.mdx", "abc"));
    }

    #[test]
    fn test_has_changed_compares_digests() {
        let mut tracker = HashTracker::empty(PathBuf::from("unused.json"));
        tracker.update("v1/intro.mdx", "abc");

        assert!(!tracker.has_changed("v1/intro.mdx", "abc"));
        assert!(tracker.has_changed("v1/intro.mdx", "def"));
        assert_eq!(tracker.stored("v1/intro.mdx"), Some("abc"));
    }

    #[test]
    fn test_remove_forgets_digest() {
        let mut tracker = HashTracker::empty(PathBuf::from("unused.json"));
        tracker.update("a.md", "1");
        tracker.remove("a.md");

        assert!(tracker.is_empty());
        assert!(tracker.has_changed("a.md", "1"));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cache/file-hashes.json");

        let mut tracker = HashTracker::empty(path.clone());
        tracker.update("v1/b.md", "2");
        tracker.update("v1/a.md", "1");
        tracker.save().await.unwrap();

        let loaded = HashTracker::load(path.clone()).await;
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.stored("v1/a.md"), Some("1"));

        // Keys are written in sorted order
        let json = std::fs::read_to_string(path).unwrap();
        assert!(json.find("v1/a.md").unwrap() < json.find("v1/b.md").unwrap());
    }

    #[tokio::test]
    async fn test_load_missing_file_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let tracker = HashTracker::load(tmp.path().join("missing.json")).await;
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupt_file_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("file-hashes.json");
        std::fs::write(&path, "not json").unwrap();

        let tracker = HashTracker::load(path).await;
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_digest_file_tracks_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("intro.mdx");
        std::fs::write(&path, "Hello").unwrap();
        let first = HashTracker::digest_file(&path).await.unwrap();

        std::fs::write(&path, "Hello again").unwrap();
        let second = HashTracker::digest_file(&path).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(first, digest_bytes(b"Hello"));
    }
}
