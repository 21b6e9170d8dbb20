//! Versioned documentation build engine.
//!
//! Content lives under one directory per version:
//!
//! ```text
//! content/
//!   v1/
//!     main.mdx          version landing page
//!     intro.mdx
//!     guides/
//!       main.mdx        landing page of "guides"
//!       setup.md
//! ```
//!
//! This crate provides:
//! - [`Engine`]: shared context answering read queries (versions, navigation,
//!   documents, search) from the manifest or, failing that, from source
//! - [`BuildOrchestrator`]: incremental and full builds writing the manifest,
//!   per-document artifacts, the public search index and the sitemap
//! - [`Processor`]: the plugin-wrapped parse and compile pipeline with its
//!   content-addressed cache
//! - [`DocumentResolver`]: slug to source file resolution
//!
//! # Quick Start
//!
//! ```no_run
//! # async fn run() -> Result<(), docxes_engine::EngineError> {
//! use std::path::PathBuf;
//! use docxes_engine::{Collaborators, Engine, EngineSettings, PluginPipeline};
//!
//! let settings = EngineSettings::new(PathBuf::from("content"), PathBuf::from(".docxes"));
//! let engine = Engine::open(settings, Collaborators::default(), PluginPipeline::default()).await;
//!
//! let outcome = engine.build(true).await?;
//! println!("processed {} documents", outcome.report.processed);
//!
//! let nav = engine.navigation("v1").await;
//! # let _ = nav;
//! # Ok(())
//! # }
//! ```

mod artifact;
mod build;
mod context;
mod document;
mod error;
mod lookup;
mod manifest;
pub mod markdown;
mod navigation;
mod pipeline;
mod plugin;
mod processor;
mod resolver;
mod search;
mod sitemap;
mod slug;
mod version;
mod walk;

pub use artifact::ArtifactStore;
pub use build::{BuildFailure, BuildOrchestrator, BuildOutcome, BuildReport};
pub use context::{Engine, EngineSettings};
pub use document::{DocFile, DocMeta, load_document};
pub use error::{EngineError, SourceLocation, Stage};
pub use lookup::{ManifestTier, MemoryTier, MetadataChain, MetadataTier, SourceTier};
pub use manifest::{Manifest, ManifestStore, VersionMetadata};
pub use navigation::{DEFAULT_ORDER, NavItem, NavigationBuilder, doc_href};
pub use pipeline::{
    CollaboratorError, Collaborators, CompileOptions, Compiler, Frontmatter, Heading,
    ParsedDocument, Parser, TocExtractor,
};
pub use plugin::{Hook, NORMALIZE_LINE_ENDINGS, Plugin, PluginPipeline, STRIP_HTML_COMMENTS};
pub use processor::{BuildMode, CACHE_FORMAT_VERSION, DocMetadata, ProcessedDocument, Processor};
pub use resolver::DocumentResolver;
pub use search::{
    IndexEntry, IndexFields, SearchIndexBuilder, SearchOptions, SearchRecord, filter_records,
    record_id,
};
pub use sitemap::render_sitemap;
pub use slug::{SlugStrategy, doc_key, parse_slug, slug_path, slugify};
pub use version::{list_versions, sort_versions};
pub use walk::{DiscoveredDoc, discover_documents};

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(Engine: Send, Sync);
    static_assertions::assert_impl_all!(Processor: Send, Sync);
    static_assertions::assert_impl_all!(Manifest: Send, Sync, Clone);
    static_assertions::assert_impl_all!(PluginPipeline: Send, Sync, Clone);
}
