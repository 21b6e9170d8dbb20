//! Document records.
//!
//! [`DocFile`] is the full per-document record persisted as a build artifact.
//! [`DocMeta`] is the content-free projection stored in the manifest and
//! used by navigation and the search index.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::EngineError;
use crate::pipeline::Heading;
use crate::processor::{DocMetadata, Processor};
use crate::resolver::DocumentResolver;
use crate::slug::{doc_key, markdown_stem};

/// Fully processed document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocFile {
    pub slug: Vec<String>,
    /// Content-root-relative source path with `/` separators.
    pub source_path: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub compiled_content: String,
    pub raw_source: String,
    pub plain_text: String,
    pub headings: Vec<Heading>,
    /// Backed by a `main` file.
    #[serde(default)]
    pub landing: bool,
    /// Pipeline configuration the document was processed under.
    #[serde(default)]
    pub fingerprint: String,
}

impl DocFile {
    /// True when the document has visible text.
    #[must_use]
    pub fn clickable(&self) -> bool {
        !self.plain_text.is_empty()
    }

    /// Content-free projection.
    #[must_use]
    pub fn meta(&self) -> DocMeta {
        DocMeta {
            slug: self.slug.clone(),
            source_path: self.source_path.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            order: self.order,
            keywords: self.keywords.clone(),
            headings: self.headings.clone(),
            landing: self.landing,
            clickable: self.clickable(),
        }
    }
}

/// Document metadata without compiled content, raw source or plain text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocMeta {
    pub slug: Vec<String>,
    pub source_path: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub headings: Vec<Heading>,
    #[serde(default)]
    pub landing: bool,
    pub clickable: bool,
}

/// Where a resolved document lives and how it is named.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SourceInfo {
    /// Content-root-relative path.
    pub(crate) relative: String,
    /// On-disk name used when frontmatter has no title.
    pub(crate) fallback_title: String,
    pub(crate) landing: bool,
}

impl SourceInfo {
    pub(crate) fn new(resolver: &DocumentResolver, path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = markdown_stem(&file_name).unwrap_or(&file_name);
        let landing = stem == "main";

        let fallback_title = if landing {
            path.parent()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| stem.to_owned())
        } else {
            stem.to_owned()
        };

        Self {
            relative: resolver.relative_key(path),
            fallback_title,
            landing,
        }
    }
}

impl DocMeta {
    pub(crate) fn from_metadata(slug: Vec<String>, info: SourceInfo, metadata: DocMetadata) -> Self {
        let frontmatter = metadata.frontmatter;
        Self {
            slug,
            source_path: info.relative,
            title: frontmatter.title.unwrap_or(info.fallback_title),
            description: frontmatter.description,
            order: frontmatter.order,
            keywords: frontmatter.keywords,
            headings: metadata.toc,
            landing: info.landing,
            clickable: !metadata.plain_text.is_empty(),
        }
    }
}

/// Read and process the file at `path` as document `version/slug`.
pub(crate) async fn process_file(
    processor: &Processor,
    resolver: &DocumentResolver,
    version: &str,
    slug: Vec<String>,
    path: &Path,
) -> Result<DocFile, EngineError> {
    let raw_source = fs::read_to_string(path)
        .await
        .map_err(|e| EngineError::read(path, e))?;
    let key = doc_key(version, &slug);
    let processed = processor.process(&raw_source, &key).await?;

    let info = SourceInfo::new(resolver, path);
    let frontmatter = processed.metadata.frontmatter;
    Ok(DocFile {
        slug,
        source_path: info.relative,
        title: frontmatter.title.unwrap_or(info.fallback_title),
        description: frontmatter.description,
        order: frontmatter.order,
        keywords: frontmatter.keywords,
        compiled_content: processed.compiled,
        raw_source,
        plain_text: processed.metadata.plain_text,
        headings: processed.metadata.toc,
        landing: info.landing,
        fingerprint: processor.fingerprint().to_owned(),
    })
}

/// Read the file at `path` and extract its metadata without compiling.
pub(crate) async fn inspect_file(
    processor: &Processor,
    resolver: &DocumentResolver,
    version: &str,
    slug: Vec<String>,
    path: &Path,
) -> Result<DocMeta, EngineError> {
    let raw_source = fs::read_to_string(path)
        .await
        .map_err(|e| EngineError::read(path, e))?;
    let metadata = processor
        .inspect(&raw_source, &doc_key(version, &slug))
        .await?;
    Ok(DocMeta::from_metadata(
        slug,
        SourceInfo::new(resolver, path),
        metadata,
    ))
}

/// Resolve and process `version/slug`.
///
/// Returns `Ok(None)` when no backing file exists.
pub async fn load_document(
    processor: &Processor,
    resolver: &DocumentResolver,
    version: &str,
    slug: &[String],
) -> Result<Option<DocFile>, EngineError> {
    let Some(path) = resolver.resolve(version, slug).await else {
        return Ok(None);
    };
    process_file(processor, resolver, version, slug.to_vec(), &path)
        .await
        .map(Some)
}
