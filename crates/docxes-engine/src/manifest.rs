//! Build manifest.
//!
//! One JSON snapshot of everything the read path needs: versions, version
//! metadata, navigation, per-document metadata and the search index. All
//! maps are ordered so two builds of the same tree serialize identically
//! apart from `generatedAt`.
//!
//! # Format
//!
//! ```json
//! {
//!   "versions": ["v1"],
//!   "versionMetadata": {"v1": {"title": "Version 1"}},
//!   "navigation": {"v1": [{"title": "Intro", "href": "/docs/v1/intro", "order": 1}]},
//!   "docs": {"v1/intro": {"slug": ["intro"], "title": "Intro", "clickable": true}},
//!   "searchIndex": [{"id": "v1-intro", "version": "v1", "href": "/docs/v1/intro"}],
//!   "generatedAt": "2025-01-01T00:00:00Z"
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::document::DocMeta;
use crate::error::EngineError;
use crate::navigation::NavItem;
use crate::search::SearchRecord;
use crate::slug::doc_key;

/// Title and description of a version, taken from its root landing page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Persisted build snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub versions: Vec<String>,
    pub version_metadata: BTreeMap<String, VersionMetadata>,
    pub navigation: BTreeMap<String, Vec<NavItem>>,
    /// Keyed by `version/slug`.
    pub docs: BTreeMap<String, DocMeta>,
    /// Metadata-only records; content lives in the public index.
    pub search_index: Vec<SearchRecord>,
    pub generated_at: DateTime<Utc>,
}

impl Manifest {
    /// Metadata for `version/slug`.
    #[must_use]
    pub fn doc(&self, version: &str, slug: &[String]) -> Option<&DocMeta> {
        self.docs.get(&doc_key(version, slug))
    }
}

/// Reads and writes `manifest.json`.
#[derive(Clone, Debug)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    /// Store at `<cache_dir>/manifest.json`.
    #[must_use]
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            path: cache_dir.join("manifest.json"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the manifest.
    ///
    /// A missing manifest is `None`. An unreadable or corrupt one is logged
    /// and also `None`, so callers fall back to on-demand computation.
    pub async fn load(&self) -> Option<Manifest> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No manifest found");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read manifest");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring corrupt manifest");
                None
            }
        }
    }

    /// Write the manifest, creating the cache directory if needed.
    pub async fn save(&self, manifest: &Manifest) -> Result<(), EngineError> {
        write_json(&self.path, manifest, "manifest").await
    }
}

/// Pretty-print `value` to `path`, creating parent directories.
pub(crate) async fn write_json<T: Serialize + Sync>(
    path: &Path,
    value: &T,
    what: &'static str,
) -> Result<(), EngineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| EngineError::write(parent, e))?;
    }
    let json =
        serde_json::to_vec_pretty(value).map_err(|source| EngineError::Serialize { what, source })?;
    fs::write(path, json)
        .await
        .map_err(|e| EngineError::write(path, e))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample() -> Manifest {
        let mut manifest = Manifest {
            versions: vec!["v1".to_owned()],
            ..Manifest::default()
        };
        manifest.version_metadata.insert(
            "v1".to_owned(),
            VersionMetadata {
                title: Some("Version 1".to_owned()),
                description: None,
            },
        );
        manifest.navigation.insert(
            "v1".to_owned(),
            vec![NavItem {
                title: "Intro".to_owned(),
                href: Some("/docs/v1/intro".to_owned()),
                children: Vec::new(),
                order: 1,
            }],
        );
        manifest.docs.insert(
            "v1/intro".to_owned(),
            DocMeta {
                slug: vec!["intro".to_owned()],
                source_path: "v1/intro.mdx".to_owned(),
                title: "Intro".to_owned(),
                description: None,
                order: Some(1),
                keywords: Vec::new(),
                headings: Vec::new(),
                landing: false,
                clickable: true,
            },
        );
        manifest
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(&tmp.path().join(".docxes"));
        let manifest = sample();

        store.save(&manifest).await.unwrap();

        assert_eq!(store.load().await, Some(manifest));
    }

    #[tokio::test]
    async fn test_missing_and_corrupt_manifest_load_as_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(tmp.path());
        assert!(store.load().await.is_none());

        std::fs::write(store.path(), "{\"versions\": [").unwrap();
        assert!(store.load().await.is_none());
    }

    #[test]
    fn test_serialized_keys_are_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        for key in [
            "versions",
            "versionMetadata",
            "navigation",
            "docs",
            "searchIndex",
            "generatedAt",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["docs"]["v1/intro"]["sourcePath"], "v1/intro.mdx");
    }

    #[test]
    fn test_doc_lookup() {
        let manifest = sample();
        assert!(manifest.doc("v1", &["intro".to_owned()]).is_some());
        assert!(manifest.doc("v1", &["missing".to_owned()]).is_none());
    }
}
