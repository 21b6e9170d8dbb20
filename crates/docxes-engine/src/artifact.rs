//! Per-document build artifacts.
//!
//! Each processed document is stored as `<cache>/data/<version>/<slug...>.json`
//! holding the full [`DocFile`]. Incremental builds read skipped documents
//! back from here instead of recomputing them.

use std::path::PathBuf;

use tokio::fs;

use crate::document::DocFile;
use crate::error::EngineError;
use crate::manifest::write_json;

/// JSON artifact directory.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Artifact path for `version/slug`.
    #[must_use]
    pub fn path(&self, version: &str, slug: &[String]) -> PathBuf {
        let mut path = self.root.join(version);
        if let Some((name, dirs)) = slug.split_last() {
            for dir in dirs {
                path.push(dir);
            }
            path.push(format!("{name}.json"));
        } else {
            path.push("index.json");
        }
        path
    }

    /// Read an artifact back.
    ///
    /// A missing or unreadable artifact is `None`.
    pub async fn load(&self, version: &str, slug: &[String]) -> Option<DocFile> {
        let path = self.path(version, slug);
        let bytes = fs::read(&path).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Discarding corrupt artifact");
                None
            }
        }
    }

    /// Write `doc` as the artifact for `version`.
    pub async fn save(&self, version: &str, doc: &DocFile) -> Result<(), EngineError> {
        write_json(&self.path(version, &doc.slug), doc, "document artifact").await
    }
}
