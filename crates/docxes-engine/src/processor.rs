//! Content pipeline.
//!
//! [`Processor::process`] runs
//! `before_parse → parse → after_parse → toc + plain text → before_compile →
//! compile → after_render`, memoized in a [`ContentStore`] under a composite
//! key:
//!
//! ```text
//! {format}:{version/slug}:{compile options hash}:{plugins hash}:{slug mode hash}:{source hash}
//! ```
//!
//! Any component changing produces a new key, so stale entries are never
//! read. Entries are not evicted.

use std::sync::Arc;

use docxes_cache::{ContentStore, ContentStoreExt, digest_bytes};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Stage};
use crate::markdown::plain_text;
use crate::pipeline::{CollaboratorError, Collaborators, CompileOptions, Frontmatter, Heading};
use crate::plugin::PluginPipeline;
use crate::slug::SlugStrategy;

/// Bumped whenever the shape of [`ProcessedDocument`] changes.
pub const CACHE_FORMAT_VERSION: &str = "1";

/// Whether the content cache is used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Cache is authoritative.
    #[default]
    Production,
    /// Cache is bypassed on read and write.
    Development,
}

/// Everything the pipeline learns about a document besides compiled output.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocMetadata {
    pub frontmatter: Frontmatter,
    pub toc: Vec<Heading>,
    pub ast: serde_json::Value,
    pub plain_text: String,
}

/// Pipeline output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub compiled: String,
    pub metadata: DocMetadata,
}

/// Parser → TOC → compiler orchestration with plugin hooks and caching.
pub struct Processor {
    collaborators: Collaborators,
    plugins: PluginPipeline,
    store: Arc<dyn ContentStore>,
    options: CompileOptions,
    mode: BuildMode,
    /// Hashes of everything besides key and source that feeds the cache key.
    fingerprint: String,
}

impl Processor {
    pub fn new(
        collaborators: Collaborators,
        plugins: PluginPipeline,
        store: Arc<dyn ContentStore>,
        options: CompileOptions,
        mode: BuildMode,
        strategy: SlugStrategy,
    ) -> Self {
        let options_hash = digest_bytes(&serde_json::to_vec(&options).unwrap_or_default());
        let plugins_hash = digest_bytes(plugins.names().join("\n").as_bytes());
        let strategy_hash = digest_bytes(strategy.id().as_bytes());
        Self {
            collaborators,
            plugins,
            store,
            options,
            mode,
            fingerprint: format!("{options_hash}:{plugins_hash}:{strategy_hash}"),
        }
    }

    #[must_use]
    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Source-independent part of the cache key.
    ///
    /// Artifacts record it so incremental builds notice configuration changes.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Composite content cache key for `source` under document `key`.
    #[must_use]
    pub fn cache_key(&self, key: &str, source: &str) -> String {
        format!(
            "{CACHE_FORMAT_VERSION}:{key}:{}:{}",
            self.fingerprint,
            digest_bytes(source.as_bytes())
        )
    }

    /// Run the full pipeline for one document.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Compile`] when the parser or compiler fails.
    pub async fn process(&self, source: &str, key: &str) -> Result<ProcessedDocument, EngineError> {
        let cache_key = match self.mode {
            BuildMode::Production => Some(self.cache_key(key, source)),
            BuildMode::Development => None,
        };

        if let Some(cache_key) = &cache_key
            && let Some(hit) = self.store.get_json::<ProcessedDocument>(cache_key).await
        {
            tracing::debug!(key, "Content cache hit");
            return Ok(hit);
        }

        let (content, metadata) = self.analyze(source, key).await?;

        let content = self.plugins.apply_before_compile(content);
        let compiled = self
            .collaborators
            .compiler
            .compile(&content, &self.options)
            .await
            .map_err(|e| wrap(key, Stage::Compile, e))?;
        let compiled = self.plugins.apply_after_render(compiled);

        let output = ProcessedDocument { compiled, metadata };
        if let Some(cache_key) = &cache_key {
            self.store.set_json(cache_key, &output).await;
        }
        Ok(output)
    }

    /// Run the pipeline up to plain-text derivation.
    ///
    /// Nothing is compiled and the cache is not touched.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Compile`] when the parser fails.
    pub async fn inspect(&self, source: &str, key: &str) -> Result<DocMetadata, EngineError> {
        self.analyze(source, key).await.map(|(_, metadata)| metadata)
    }

    async fn analyze(&self, source: &str, key: &str) -> Result<(String, DocMetadata), EngineError> {
        let source = self.plugins.apply_before_parse(source.to_owned());
        let parsed = self
            .collaborators
            .parser
            .parse(&source)
            .await
            .map_err(|e| wrap(key, Stage::Parse, e))?;
        let parsed = self.plugins.apply_after_parse(parsed);

        let toc = self.collaborators.toc.extract_headings(&parsed.content);
        let metadata = DocMetadata {
            frontmatter: parsed.frontmatter,
            toc,
            ast: parsed.ast,
            plain_text: plain_text(&parsed.content),
        };
        Ok((parsed.content, metadata))
    }
}

fn wrap(key: &str, stage: Stage, error: CollaboratorError) -> EngineError {
    EngineError::Compile {
        key: key.to_owned(),
        stage,
        location: error.location,
        message: error.message,
    }
}
