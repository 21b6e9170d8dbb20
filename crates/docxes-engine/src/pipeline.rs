//! Collaborator contracts for the content pipeline.
//!
//! The engine never looks inside compiled output. It needs three narrow
//! services:
//!
//! - [`Parser`]: split raw source into content, frontmatter and an AST
//! - [`Compiler`]: turn content into an opaque compiled artifact
//! - [`TocExtractor`]: list the headings of a document
//!
//! Default Markdown implementations live in [`crate::markdown`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SourceLocation;
use crate::markdown::{MarkdownCompiler, MarkdownParser, MarkdownToc};

/// Document frontmatter.
///
/// Known keys are typed; everything else is kept in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    /// Ignored unless a string.
    #[serde(
        default,
        deserialize_with = "deserialize_title",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_description",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    /// Ignored unless an integer.
    #[serde(
        default,
        deserialize_with = "deserialize_order",
        skip_serializing_if = "Option::is_none"
    )]
    pub order: Option<i64>,
    /// Accepts a list or a comma-separated string.
    #[serde(
        default,
        deserialize_with = "deserialize_keywords",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub keywords: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn deserialize_title<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Option::<serde_json::Value>::deserialize(deserializer).map(|v| lenient_string("title", v))
}

fn deserialize_description<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<serde_json::Value>::deserialize(deserializer).map(|v| lenient_string("description", v))
}

fn lenient_string(field: &str, value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => {
            tracing::warn!(field, value = %other, "Ignoring non-string frontmatter field");
            None
        }
    }
}

fn deserialize_order<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let order = match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => None,
        Some(value) => {
            let order = value.as_i64();
            if order.is_none() {
                tracing::warn!(value = %value, "Ignoring non-integer frontmatter order");
            }
            order
        }
    };
    Ok(order)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeywordsRepr {
    List(Vec<String>),
    Csv(String),
}

fn deserialize_keywords<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let keywords = match Option::<KeywordsRepr>::deserialize(deserializer)? {
        Some(KeywordsRepr::List(list)) => list,
        Some(KeywordsRepr::Csv(csv)) => csv.split(',').map(str::to_owned).collect(),
        None => Vec::new(),
    };
    Ok(keywords
        .into_iter()
        .map(|k| k.trim().to_owned())
        .filter(|k| !k.is_empty())
        .collect())
}

/// Parser output.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// Source with the frontmatter block removed.
    pub content: String,
    pub frontmatter: Frontmatter,
    /// Parser-specific syntax tree, stored verbatim.
    pub ast: serde_json::Value,
}

/// Table-of-contents entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub id: String,
    pub title: String,
    pub depth: u8,
}

/// Options forwarded to the [`Compiler`].
///
/// Hashed into content cache keys, so any change invalidates compiled output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    pub highlighter: Option<String>,
    pub theme: Option<String>,
    pub keep_background: bool,
    pub highlight_code: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            highlighter: None,
            theme: None,
            keep_background: false,
            highlight_code: true,
        }
    }
}

/// Failure reported by a parser or compiler.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CollaboratorError {
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    #[must_use]
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.location = Some(SourceLocation { line, column });
        self
    }
}

/// Splits raw source into content, frontmatter and AST.
#[async_trait]
pub trait Parser: Send + Sync {
    async fn parse(&self, source: &str) -> Result<ParsedDocument, CollaboratorError>;
}

/// Compiles document content into an opaque artifact.
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(
        &self,
        content: &str,
        options: &CompileOptions,
    ) -> Result<String, CollaboratorError>;
}

/// Extracts the heading list of a document.
pub trait TocExtractor: Send + Sync {
    fn extract_headings(&self, content: &str) -> Vec<Heading>;
}

/// The set of collaborators a processor runs.
#[derive(Clone)]
pub struct Collaborators {
    pub parser: Arc<dyn Parser>,
    pub compiler: Arc<dyn Compiler>,
    pub toc: Arc<dyn TocExtractor>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            parser: Arc::new(MarkdownParser),
            compiler: Arc::new(MarkdownCompiler),
            toc: Arc::new(MarkdownToc),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
