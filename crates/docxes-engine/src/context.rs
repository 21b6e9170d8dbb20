//! Engine context.
//!
//! [`Engine`] owns everything the build and read paths share: settings, the
//! resolver, the processor with its content store, the artifact store and the
//! manifest loaded at startup. It is constructed once and only read
//! afterwards; after a rebuild, callers swap in the new manifest with
//! [`Engine::with_manifest`].
//!
//! Read-path queries answer from the manifest when one is loaded and fall
//! back to computing from source otherwise.

use std::path::PathBuf;
use std::sync::Arc;

use docxes_cache::{ContentStore, FileStore, NullStore};
use futures::future::join_all;

use crate::artifact::ArtifactStore;
use crate::build::{BuildOrchestrator, BuildOutcome};
use crate::document::{DocFile, DocMeta, SourceInfo, load_document};
use crate::error::EngineError;
use crate::lookup::{ManifestTier, MetadataChain, SourceTier};
use crate::manifest::{Manifest, ManifestStore, VersionMetadata};
use crate::navigation::{NavItem, NavigationBuilder};
use crate::pipeline::{Collaborators, CompileOptions};
use crate::plugin::PluginPipeline;
use crate::processor::{BuildMode, CACHE_FORMAT_VERSION, Processor};
use crate::resolver::DocumentResolver;
use crate::search::{
    IndexEntry, IndexFields, SearchIndexBuilder, SearchOptions, SearchRecord, filter_records,
};
use crate::slug::{SlugStrategy, doc_key};
use crate::version::list_versions;
use crate::walk::discover_documents;

/// Engine settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    /// Directory holding one subdirectory per version.
    pub content_dir: PathBuf,
    /// Root of the manifest, hash map, artifacts and content store.
    pub cache_dir: PathBuf,
    /// Output directory for the public search index and sitemap.
    pub public_dir: PathBuf,
    /// URL prefix for document hrefs. [`Engine`] strips trailing slashes and
    /// adds a missing leading one, so `"/"` yields `/v1/...` hrefs.
    pub base_path: String,
    pub mode: BuildMode,
    pub slug_strategy: SlugStrategy,
    pub compile: CompileOptions,
    /// Absolute site URL; a sitemap is written only when set.
    pub site_url: Option<String>,
}

impl EngineSettings {
    #[must_use]
    pub fn new(content_dir: PathBuf, cache_dir: PathBuf) -> Self {
        Self {
            content_dir,
            cache_dir,
            public_dir: PathBuf::from("public"),
            base_path: "/docs".to_owned(),
            mode: BuildMode::default(),
            slug_strategy: SlugStrategy::default(),
            compile: CompileOptions::default(),
            site_url: None,
        }
    }

    /// Per-document artifact directory.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.cache_dir.join("data")
    }

    /// Content store directory.
    #[must_use]
    pub fn content_store_dir(&self) -> PathBuf {
        self.cache_dir.join("content")
    }

    #[must_use]
    pub fn hashes_path(&self) -> PathBuf {
        self.cache_dir.join("file-hashes.json")
    }
}

/// `"/docs/"` → `"/docs"`, `"docs"` → `"/docs"`, `"/"` → `""`.
fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Shared build and read context.
pub struct Engine {
    settings: EngineSettings,
    resolver: DocumentResolver,
    processor: Processor,
    artifacts: ArtifactStore,
    manifest: Option<Arc<Manifest>>,
}

impl Engine {
    /// Open an engine over `settings`, loading the persisted manifest if any.
    ///
    /// Development mode uses a no-op content store.
    pub async fn open(
        settings: EngineSettings,
        collaborators: Collaborators,
        plugins: PluginPipeline,
    ) -> Self {
        let store: Arc<dyn ContentStore> = match settings.mode {
            BuildMode::Production => Arc::new(
                FileStore::open(settings.content_store_dir(), CACHE_FORMAT_VERSION).await,
            ),
            BuildMode::Development => Arc::new(NullStore),
        };
        let manifest = ManifestStore::new(&settings.cache_dir)
            .load()
            .await
            .map(Arc::new);
        Self::with_store(settings, collaborators, plugins, store).with_manifest(manifest)
    }

    /// Build an engine with an explicit content store and no manifest.
    #[must_use]
    pub fn with_store(
        settings: EngineSettings,
        collaborators: Collaborators,
        plugins: PluginPipeline,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        let mut settings = settings;
        settings.base_path = normalize_base_path(&settings.base_path);
        let resolver = DocumentResolver::new(settings.content_dir.clone(), settings.slug_strategy);
        let processor = Processor::new(
            collaborators,
            plugins,
            store,
            settings.compile.clone(),
            settings.mode,
            settings.slug_strategy,
        );
        let artifacts = ArtifactStore::new(settings.data_dir());
        Self {
            settings,
            resolver,
            processor,
            artifacts,
            manifest: None,
        }
    }

    /// Replace the loaded manifest.
    #[must_use]
    pub fn with_manifest(mut self, manifest: Option<Arc<Manifest>>) -> Self {
        self.manifest = manifest;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[must_use]
    pub fn resolver(&self) -> &DocumentResolver {
        &self.resolver
    }

    #[must_use]
    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    #[must_use]
    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    #[must_use]
    pub fn manifest(&self) -> Option<&Arc<Manifest>> {
        self.manifest.as_ref()
    }

    /// Run a build. See [`BuildOrchestrator`].
    pub async fn build(&self, incremental: bool) -> Result<BuildOutcome, EngineError> {
        BuildOrchestrator::new(self).run(incremental).await
    }

    /// All versions, sorted.
    pub async fn versions(&self) -> Vec<String> {
        match &self.manifest {
            Some(manifest) => manifest.versions.clone(),
            None => list_versions(&self.settings.content_dir).await,
        }
    }

    /// Title and description of `version`.
    pub async fn version_metadata(&self, version: &str) -> VersionMetadata {
        if let Some(meta) = self
            .manifest
            .as_ref()
            .and_then(|m| m.version_metadata.get(version))
        {
            return meta.clone();
        }
        self.compute_version_metadata(version).await
    }

    /// Version metadata from the root landing page, computed from source.
    pub(crate) async fn compute_version_metadata(&self, version: &str) -> VersionMetadata {
        let Some(path) = self.resolver.resolve_landing(version).await else {
            return VersionMetadata::default();
        };
        let inspected = match tokio::fs::read_to_string(&path).await {
            Ok(source) => self.processor.inspect(&source, version).await,
            Err(e) => Err(EngineError::read(&path, e)),
        };
        match inspected {
            Ok(metadata) => VersionMetadata {
                title: metadata.frontmatter.title,
                description: metadata.frontmatter.description,
            },
            Err(e) => {
                tracing::warn!(version, error = %e, "Failed to read version landing page");
                VersionMetadata::default()
            }
        }
    }

    /// Navigation tree of `version`.
    pub async fn navigation(&self, version: &str) -> Vec<NavItem> {
        if let Some(nav) = self
            .manifest
            .as_ref()
            .and_then(|m| m.navigation.get(version))
        {
            return nav.clone();
        }

        let mut chain = MetadataChain::new();
        if let Some(manifest) = &self.manifest {
            chain = chain.with(ManifestTier::new(Arc::clone(manifest)));
        }
        let chain = chain.with(SourceTier::new(&self.resolver, &self.processor));
        NavigationBuilder::new(&self.resolver, &chain, &self.settings.base_path)
            .build(version)
            .await
    }

    /// Fully processed document, or `None` when it does not exist.
    ///
    /// In production mode a document listed in the manifest is served from
    /// its build artifact.
    pub async fn document(&self, version: &str, slug: &[String]) -> Result<Option<DocFile>, EngineError> {
        if self.settings.mode == BuildMode::Production
            && self.manifest.as_ref().is_some_and(|m| m.doc(version, slug).is_some())
            && let Some(doc) = self.artifacts.load(version, slug).await
        {
            return Ok(Some(doc));
        }
        load_document(&self.processor, &self.resolver, version, slug).await
    }

    /// Search records for every non-landing document.
    ///
    /// Without `content` in `fields`, a loaded manifest answers without
    /// touching document bodies.
    pub async fn search_index(&self, fields: IndexFields) -> Vec<SearchRecord> {
        let builder = SearchIndexBuilder::new(&self.settings.base_path, fields);

        if let Some(manifest) = &self.manifest {
            let contents = if fields.content {
                self.artifact_contents(manifest).await
            } else {
                Vec::new()
            };
            let entries = manifest.docs.iter().enumerate().map(|(i, (key, meta))| IndexEntry {
                version: version_of(key),
                meta,
                content: contents.get(i).and_then(Option::as_deref),
            });
            return ordered_records(&builder, &manifest.versions, entries);
        }

        let versions = list_versions(&self.settings.content_dir).await;
        let per_version = join_all(versions.iter().map(|v| self.inspect_version(v))).await;
        let entries = versions
            .iter()
            .zip(&per_version)
            .flat_map(|(version, docs)| {
                docs.iter().map(move |(meta, text)| IndexEntry {
                    version: version.as_str(),
                    meta,
                    content: Some(text.as_str()),
                })
            });
        ordered_records(&builder, &versions, entries)
    }

    /// Filter the full search index by `query`.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Vec<SearchRecord> {
        filter_records(&self.search_index(IndexFields::ALL).await, query, options)
    }

    /// Plain text of every manifest document, in `docs` order.
    async fn artifact_contents(&self, manifest: &Manifest) -> Vec<Option<String>> {
        join_all(manifest.docs.iter().map(|(key, meta)| async move {
            if meta.landing {
                return None;
            }
            let version = version_of(key);
            if let Some(doc) = self.artifacts.load(version, &meta.slug).await {
                return Some(doc.plain_text);
            }
            let path = self.resolver.resolve(version, &meta.slug).await?;
            let source = tokio::fs::read_to_string(&path).await.ok()?;
            let metadata = self.processor.inspect(&source, key).await.ok()?;
            Some(metadata.plain_text)
        }))
        .await
    }

    /// Metadata and plain text of every document of `version`, from source.
    async fn inspect_version(&self, version: &str) -> Vec<(DocMeta, String)> {
        let docs = discover_documents(&self.resolver, version).await;
        let inspected = join_all(docs.into_iter().map(|doc| async move {
            let key = doc_key(version, &doc.slug);
            let source = match tokio::fs::read_to_string(&doc.path).await {
                Ok(source) => source,
                Err(e) => {
                    tracing::warn!(key, error = %e, "Skipping unreadable document");
                    return None;
                }
            };
            match self.processor.inspect(&source, &key).await {
                Ok(metadata) => {
                    let text = metadata.plain_text.clone();
                    let info = SourceInfo::new(&self.resolver, &doc.path);
                    Some((DocMeta::from_metadata(doc.slug, info, metadata), text))
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "Skipping document");
                    None
                }
            }
        }))
        .await;
        inspected.into_iter().flatten().collect()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.settings)
            .field("manifest", &self.manifest.is_some())
            .finish_non_exhaustive()
    }
}

/// Version part of a `version/slug` key.
pub(crate) fn version_of(key: &str) -> &str {
    key.split_once('/').map_or(key, |(version, _)| version)
}

/// Records in version order, then document key order within a version.
pub(crate) fn ordered_records<'e>(
    builder: &SearchIndexBuilder<'_>,
    versions: &[String],
    entries: impl IntoIterator<Item = IndexEntry<'e>>,
) -> Vec<SearchRecord> {
    let mut entries: Vec<IndexEntry<'e>> = entries.into_iter().collect();
    let rank = |version: &str| versions.iter().position(|v| v == version).unwrap_or(usize::MAX);
    entries.sort_by_cached_key(|e| (rank(e.version), doc_key(e.version, &e.meta.slug)));
    builder.build(entries)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::slug::parse_slug;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn engine(root: &Path) -> Engine {
        let settings = EngineSettings::new(root.join("content"), root.join(".docxes"));
        Engine::with_store(
            settings,
            Collaborators::default(),
            PluginPipeline::default(),
            Arc::new(NullStore),
        )
    }

    #[test]
    fn test_settings_paths() {
        let settings = EngineSettings::new(PathBuf::from("docs"), PathBuf::from(".cache"));
        assert_eq!(settings.data_dir(), PathBuf::from(".cache/data"));
        assert_eq!(settings.content_store_dir(), PathBuf::from(".cache/content"));
        assert_eq!(settings.hashes_path(), PathBuf::from(".cache/file-hashes.json"));
        assert_eq!(settings.base_path, "/docs");
    }

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path("/docs"), "/docs");
        assert_eq!(normalize_base_path("/docs/"), "/docs");
        assert_eq!(normalize_base_path("docs"), "/docs");
        assert_eq!(normalize_base_path("/"), "");
        assert_eq!(normalize_base_path(""), "");
    }

    #[tokio::test]
    async fn test_root_base_path_hrefs() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "content/v1/intro.md", "Hello");
        let mut settings = EngineSettings::new(tmp.path().join("content"), tmp.path().join(".docxes"));
        settings.base_path = "/".to_owned();
        let engine = Engine::with_store(
            settings,
            Collaborators::default(),
            PluginPipeline::default(),
            Arc::new(NullStore),
        );

        assert_eq!(engine.settings().base_path, "");
        let nav = engine.navigation("v1").await;
        assert_eq!(nav[0].href.as_deref(), Some("/v1/intro"));
        let index = engine.search_index(IndexFields::METADATA).await;
        assert_eq!(index[0].href, "/v1/intro");
    }

    #[tokio::test]
    async fn test_document_outside_content_root_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "secret.md", "---\ntitle: Secret\n---\nHidden");
        write(tmp.path(), "content/v1/intro.md", "Hello");
        let engine = engine(tmp.path());

        let escape = ["secret".to_owned()];
        assert!(engine.document("..", &escape).await.unwrap().is_none());
        assert!(engine.navigation("..").await.is_empty());
        assert_eq!(engine.version_metadata("..").await, VersionMetadata::default());
        assert!(
            engine
                .document("v1", &["..".to_owned(), "..".to_owned(), "secret".to_owned()])
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            engine
                .document("v1", &["../../secret".to_owned()])
                .await
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_version_of() {
        assert_eq!(version_of("v1/guides/setup"), "v1");
        assert_eq!(version_of("v1"), "v1");
    }

    #[tokio::test]
    async fn test_on_demand_queries_without_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "content/v2/main.md", "---\ntitle: Two\ndescription: Second\n---\nHome");
        write(tmp.path(), "content/v2/intro.md", "---\ntitle: Intro\n---\nHello there");
        write(tmp.path(), "content/v1/intro.md", "Old intro");
        let engine = engine(tmp.path());

        assert_eq!(engine.versions().await, vec!["v1", "v2"]);
        assert_eq!(
            engine.version_metadata("v2").await,
            VersionMetadata {
                title: Some("Two".to_owned()),
                description: Some("Second".to_owned()),
            }
        );
        assert_eq!(engine.version_metadata("v1").await, VersionMetadata::default());

        let nav = engine.navigation("v2").await;
        assert_eq!(nav.len(), 1);
        assert_eq!(nav[0].href.as_deref(), Some("/docs/v2/intro"));

        let doc = engine
            .document("v2", &parse_slug("intro"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.title, "Intro");
        assert!(engine.document("v2", &parse_slug("nope")).await.unwrap().is_none());

        let ids: Vec<String> = engine
            .search_index(IndexFields::ALL)
            .await
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["v1-intro", "v2-intro"]);

        let hits = engine
            .search(
                "hello",
                &SearchOptions {
                    version: Some("v2".to_owned()),
                    limit: None,
                },
            )
            .await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content.as_deref(), Some("Hello there"));
    }

    #[tokio::test]
    async fn test_manifest_answers_reads() {
        let tmp = tempfile::tempdir().unwrap();
        let mut manifest = Manifest {
            versions: vec!["v9".to_owned()],
            ..Manifest::default()
        };
        manifest.navigation.insert(
            "v9".to_owned(),
            vec![NavItem {
                title: "Cached".to_owned(),
                href: None,
                children: Vec::new(),
                order: 1,
            }],
        );
        let engine = engine(tmp.path()).with_manifest(Some(Arc::new(manifest)));

        assert_eq!(engine.versions().await, vec!["v9"]);
        assert_eq!(engine.navigation("v9").await[0].title, "Cached");
        assert!(engine.search_index(IndexFields::METADATA).await.is_empty());
    }
}
