//! Incremental and full builds.
//!
//! A build walks every version concurrently. Within a version every document
//! is hashed, then either reused from its artifact (incremental build,
//! unchanged digest) or processed and persisted. Navigation is built once all
//! documents are known, from the in-memory results first and the source
//! second.
//!
//! Per-document outcome:
//!
//! ```text
//! unknown -> hash-checked -> skipped-unchanged -> persisted
//!                         -> recompiled        -> persisted
//!         (any step)      -> failed
//! ```
//!
//! Failures are scoped to their document. Only failing to write the shared
//! outputs (manifest, hash map, public index, sitemap) aborts the build.
//!
//! Hash updates are collected from document tasks and applied after all
//! versions finish, so the tracker is never shared mutably.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Utc;
use docxes_cache::HashTracker;
use futures::future::join_all;
use tokio::fs;

use crate::context::{Engine, ordered_records, version_of};
use crate::document::{DocFile, DocMeta, process_file};
use crate::error::EngineError;
use crate::lookup::{MemoryTier, MetadataChain, SourceTier};
use crate::manifest::{Manifest, ManifestStore, VersionMetadata, write_json};
use crate::navigation::{NavItem, NavigationBuilder};
use crate::search::{IndexEntry, IndexFields, SearchIndexBuilder, SearchRecord};
use crate::sitemap::render_sitemap;
use crate::slug::doc_key;
use crate::version::list_versions;
use crate::walk::{DiscoveredDoc, discover_documents};

/// A document that could not be built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildFailure {
    /// Document key (`version/slug`).
    pub key: String,
    pub message: String,
}

/// Summary of a build.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub versions: usize,
    /// Documents run through the pipeline.
    pub processed: usize,
    /// Documents reused from their artifact.
    pub skipped: usize,
    pub failures: Vec<BuildFailure>,
}

/// Result of a successful build.
#[derive(Debug)]
pub struct BuildOutcome {
    pub manifest: Manifest,
    pub report: BuildReport,
}

enum DocOutcome {
    Skipped(DocFile),
    Processed {
        doc: DocFile,
        path: String,
        digest: String,
    },
    Failed(BuildFailure),
}

struct VersionBuild {
    version: String,
    metadata: VersionMetadata,
    navigation: Vec<NavItem>,
    docs: Vec<DocFile>,
    hash_updates: Vec<(String, String)>,
    processed: usize,
    skipped: usize,
    failures: Vec<BuildFailure>,
}

/// Drives a build over an [`Engine`].
pub struct BuildOrchestrator<'a> {
    engine: &'a Engine,
}

impl<'a> BuildOrchestrator<'a> {
    #[must_use]
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Build every version and persist the results.
    ///
    /// With `incremental`, documents whose digest matches the stored hash map
    /// and whose artifact is readable and was produced under the current
    /// pipeline configuration are not reprocessed.
    ///
    /// # Errors
    ///
    /// Returns an error when a shared output cannot be written. Document
    /// failures are reported in [`BuildReport::failures`] instead.
    pub async fn run(&self, incremental: bool) -> Result<BuildOutcome, EngineError> {
        let started = Instant::now();
        let settings = self.engine.settings();

        fs::create_dir_all(&settings.cache_dir)
            .await
            .map_err(|e| EngineError::write(&settings.cache_dir, e))?;

        let mut tracker = if incremental {
            HashTracker::load(settings.hashes_path()).await
        } else {
            HashTracker::empty(settings.hashes_path())
        };

        let versions = list_versions(&settings.content_dir).await;
        tracing::info!(versions = versions.len(), incremental, "Starting build");

        let builds = join_all(
            versions
                .iter()
                .map(|version| self.build_version(version, &tracker, incremental)),
        )
        .await;

        let mut report = BuildReport {
            versions: versions.len(),
            ..BuildReport::default()
        };
        let mut manifest = Manifest {
            versions: versions.clone(),
            ..Manifest::default()
        };
        let mut contents: BTreeMap<String, String> = BTreeMap::new();

        for build in builds {
            for (path, digest) in build.hash_updates {
                tracker.update(path, digest);
            }
            report.processed += build.processed;
            report.skipped += build.skipped;
            report.failures.extend(build.failures);

            manifest
                .version_metadata
                .insert(build.version.clone(), build.metadata);
            manifest
                .navigation
                .insert(build.version.clone(), build.navigation);
            for doc in build.docs {
                let key = doc_key(&build.version, &doc.slug);
                manifest.docs.insert(key.clone(), doc.meta());
                contents.insert(key, doc.plain_text);
            }
        }

        let base_path = settings.base_path.as_str();
        manifest.search_index = index(
            &SearchIndexBuilder::new(base_path, IndexFields::METADATA),
            &versions,
            &manifest.docs,
            &contents,
        );
        let public_index = index(
            &SearchIndexBuilder::new(base_path, IndexFields::ALL),
            &versions,
            &manifest.docs,
            &contents,
        );
        manifest.generated_at = Utc::now();

        ManifestStore::new(&settings.cache_dir)
            .save(&manifest)
            .await?;
        tracker
            .save()
            .await
            .map_err(|e| EngineError::write(settings.hashes_path(), e))?;
        write_json(
            &settings.public_dir.join("search-index.json"),
            &public_index,
            "search index",
        )
        .await?;

        if let Some(site_url) = &settings.site_url {
            let path = settings.public_dir.join("sitemap.xml");
            let xml = render_sitemap(site_url, base_path, &manifest)
                .map_err(|e| EngineError::write(&path, e))?;
            fs::write(&path, xml)
                .await
                .map_err(|e| EngineError::write(&path, e))?;
        }

        tracing::info!(
            versions = report.versions,
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failures.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "Build finished"
        );

        Ok(BuildOutcome { manifest, report })
    }

    async fn build_version(
        &self,
        version: &str,
        tracker: &HashTracker,
        incremental: bool,
    ) -> VersionBuild {
        let discovered = discover_documents(self.engine.resolver(), version).await;
        let outcomes = join_all(
            discovered
                .into_iter()
                .map(|doc| self.build_document(version, doc, tracker, incremental)),
        )
        .await;

        let mut build = VersionBuild {
            version: version.to_owned(),
            metadata: VersionMetadata::default(),
            navigation: Vec::new(),
            docs: Vec::new(),
            hash_updates: Vec::new(),
            processed: 0,
            skipped: 0,
            failures: Vec::new(),
        };
        for outcome in outcomes {
            match outcome {
                DocOutcome::Skipped(doc) => {
                    build.skipped += 1;
                    build.docs.push(doc);
                }
                DocOutcome::Processed { doc, path, digest } => {
                    build.processed += 1;
                    build.hash_updates.push((path, digest));
                    build.docs.push(doc);
                }
                DocOutcome::Failed(failure) => build.failures.push(failure),
            }
        }

        let memory: BTreeMap<String, DocMeta> = build
            .docs
            .iter()
            .map(|doc| (doc_key(version, &doc.slug), doc.meta()))
            .collect();
        let chain = MetadataChain::new()
            .with(MemoryTier::new(memory))
            .with(SourceTier::new(
                self.engine.resolver(),
                self.engine.processor(),
            ));
        let settings = self.engine.settings();
        build.navigation =
            NavigationBuilder::new(self.engine.resolver(), &chain, &settings.base_path)
                .build(version)
                .await;
        build.metadata = self.engine.compute_version_metadata(version).await;

        tracing::debug!(
            version,
            processed = build.processed,
            skipped = build.skipped,
            "Version built"
        );
        build
    }

    async fn build_document(
        &self,
        version: &str,
        discovered: DiscoveredDoc,
        tracker: &HashTracker,
        incremental: bool,
    ) -> DocOutcome {
        let DiscoveredDoc { slug, path } = discovered;
        let key = doc_key(version, &slug);
        let resolver = self.engine.resolver();
        let artifacts = self.engine.artifacts();

        let digest = match HashTracker::digest_file(&path).await {
            Ok(digest) => digest,
            Err(e) => return failed(key, &EngineError::read(&path, e)),
        };
        let relative = resolver.relative_key(&path);

        if incremental && !tracker.has_changed(&relative, &digest) {
            let processor = self.engine.processor();
            match artifacts.load(version, &slug).await {
                // A different source may have backed this slug last time, or
                // the pipeline configuration may have changed since.
                Some(doc)
                    if doc.source_path == relative
                        && doc.fingerprint == processor.fingerprint() =>
                {
                    tracing::debug!(key, "Unchanged, reusing artifact");
                    return DocOutcome::Skipped(doc);
                }
                _ => tracing::debug!(key, "Artifact missing or stale, reprocessing"),
            }
        }

        let doc = match process_file(self.engine.processor(), resolver, version, slug, &path).await {
            Ok(doc) => doc,
            Err(e) => return failed(key, &e),
        };
        if let Err(e) = artifacts.save(version, &doc).await {
            return failed(key, &e);
        }

        tracing::debug!(key, "Processed");
        DocOutcome::Processed {
            doc,
            path: relative,
            digest,
        }
    }
}

fn failed(key: String, error: &EngineError) -> DocOutcome {
    tracing::error!(key, error = %error, "Document failed");
    DocOutcome::Failed(BuildFailure {
        key,
        message: error.to_string(),
    })
}

fn index(
    builder: &SearchIndexBuilder<'_>,
    versions: &[String],
    docs: &BTreeMap<String, DocMeta>,
    contents: &BTreeMap<String, String>,
) -> Vec<SearchRecord> {
    let entries = docs.iter().map(|(key, meta)| IndexEntry {
        version: version_of(key),
        meta,
        content: contents.get(key).map(String::as_str),
    });
    ordered_records(builder, versions, entries)
}
