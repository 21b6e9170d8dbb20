//! Tiered document metadata lookup.
//!
//! Metadata for a `(version, slug)` can come from three places, tried in a
//! fixed order by a [`MetadataChain`]:
//!
//! - [`MemoryTier`]: documents processed by the running build
//! - [`ManifestTier`]: the persisted manifest loaded at startup
//! - [`SourceTier`]: the source file itself, parsed without compiling
//!
//! Every tier answers hit (`Some`) or miss (`None`); the first hit wins.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::document::{DocMeta, inspect_file};
use crate::error::EngineError;
use crate::manifest::Manifest;
use crate::processor::Processor;
use crate::resolver::DocumentResolver;
use crate::slug::doc_key;

/// One level of the metadata cache chain.
#[async_trait]
pub trait MetadataTier: Send + Sync {
    /// Short tier name for logs.
    fn name(&self) -> &'static str;

    /// Metadata for `version/slug`, or `None` on miss.
    async fn lookup(&self, version: &str, slug: &[String]) -> Result<Option<DocMeta>, EngineError>;
}

/// Documents already processed in memory, keyed by `version/slug`.
#[derive(Debug, Default)]
pub struct MemoryTier {
    docs: BTreeMap<String, DocMeta>,
}

impl MemoryTier {
    #[must_use]
    pub fn new(docs: BTreeMap<String, DocMeta>) -> Self {
        Self { docs }
    }
}

#[async_trait]
impl MetadataTier for MemoryTier {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn lookup(&self, version: &str, slug: &[String]) -> Result<Option<DocMeta>, EngineError> {
        Ok(self.docs.get(&doc_key(version, slug)).cloned())
    }
}

/// The `docs` map of a loaded manifest.
#[derive(Debug)]
pub struct ManifestTier {
    manifest: Arc<Manifest>,
}

impl ManifestTier {
    #[must_use]
    pub fn new(manifest: Arc<Manifest>) -> Self {
        Self { manifest }
    }
}

#[async_trait]
impl MetadataTier for ManifestTier {
    fn name(&self) -> &'static str {
        "manifest"
    }

    async fn lookup(&self, version: &str, slug: &[String]) -> Result<Option<DocMeta>, EngineError> {
        Ok(self.manifest.docs.get(&doc_key(version, slug)).cloned())
    }
}

/// Resolve and inspect the source file.
pub struct SourceTier<'a> {
    resolver: &'a DocumentResolver,
    processor: &'a Processor,
}

impl<'a> SourceTier<'a> {
    #[must_use]
    pub fn new(resolver: &'a DocumentResolver, processor: &'a Processor) -> Self {
        Self {
            resolver,
            processor,
        }
    }
}

#[async_trait]
impl MetadataTier for SourceTier<'_> {
    fn name(&self) -> &'static str {
        "source"
    }

    async fn lookup(&self, version: &str, slug: &[String]) -> Result<Option<DocMeta>, EngineError> {
        let Some(path) = self.resolver.resolve(version, slug).await else {
            return Ok(None);
        };
        inspect_file(self.processor, self.resolver, version, slug.to_vec(), &path)
            .await
            .map(Some)
    }
}

/// Ordered list of tiers.
#[derive(Default)]
pub struct MetadataChain<'a> {
    tiers: Vec<Box<dyn MetadataTier + 'a>>,
}

impl<'a> MetadataChain<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self { tiers: Vec::new() }
    }

    /// Append a tier, tried after the existing ones.
    #[must_use]
    pub fn with(mut self, tier: impl MetadataTier + 'a) -> Self {
        self.tiers.push(Box::new(tier));
        self
    }

    /// First hit across all tiers.
    ///
    /// A tier error stops the lookup; later tiers are not consulted.
    pub async fn lookup(&self, version: &str, slug: &[String]) -> Result<Option<DocMeta>, EngineError> {
        for tier in &self.tiers {
            if let Some(meta) = tier.lookup(version, slug).await? {
                tracing::trace!(tier = tier.name(), version, slug = ?slug, "Metadata hit");
                return Ok(Some(meta));
            }
        }
        Ok(None)
    }
}
