//! Flat search index.
//!
//! One [`SearchRecord`] per non-landing document of every version, keyed
//! `"<version>-<slug/path>"`. Which optional fields are filled is controlled
//! by [`IndexFields`]; leaving out `content` avoids touching plain text at
//! all. Ranking is left to the consumer; [`filter_records`] only does
//! case-insensitive substring matching.

use serde::{Deserialize, Serialize};

use crate::document::DocMeta;
use crate::navigation::doc_href;
use crate::slug::slug_path;

/// Search index entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub id: String,
    pub version: String,
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Optional record fields to include.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexFields {
    pub title: bool,
    pub description: bool,
    pub keywords: bool,
    pub content: bool,
}

impl IndexFields {
    /// Every field, including plain-text content.
    pub const ALL: Self = Self {
        title: true,
        description: true,
        keywords: true,
        content: true,
    };

    /// Everything except content.
    pub const METADATA: Self = Self {
        content: false,
        ..Self::ALL
    };
}

impl Default for IndexFields {
    fn default() -> Self {
        Self::ALL
    }
}

/// Record id for `version/slug`.
#[must_use]
pub fn record_id(version: &str, slug: &[String]) -> String {
    format!("{version}-{}", slug_path(slug))
}

/// Document metadata plus optional plain text, ready for indexing.
#[derive(Clone, Copy, Debug)]
pub struct IndexEntry<'a> {
    pub version: &'a str,
    pub meta: &'a DocMeta,
    pub content: Option<&'a str>,
}

/// Turns document metadata into search records.
#[derive(Clone, Copy, Debug)]
pub struct SearchIndexBuilder<'a> {
    base_path: &'a str,
    fields: IndexFields,
}

impl<'a> SearchIndexBuilder<'a> {
    #[must_use]
    pub fn new(base_path: &'a str, fields: IndexFields) -> Self {
        Self { base_path, fields }
    }

    /// Record for one document, `None` for landing pages.
    #[must_use]
    pub fn record(&self, entry: IndexEntry<'_>) -> Option<SearchRecord> {
        let IndexEntry {
            version,
            meta,
            content,
        } = entry;
        if meta.landing {
            return None;
        }

        let fields = self.fields;
        Some(SearchRecord {
            id: record_id(version, &meta.slug),
            version: version.to_owned(),
            href: doc_href(self.base_path, version, &meta.slug),
            title: fields.title.then(|| meta.title.clone()),
            description: if fields.description {
                meta.description.clone()
            } else {
                None
            },
            keywords: fields.keywords.then(|| meta.keywords.clone()),
            content: if fields.content {
                Some(content.unwrap_or_default().to_owned())
            } else {
                None
            },
        })
    }

    /// Records for `entries`, in input order.
    pub fn build<'e>(&self, entries: impl IntoIterator<Item = IndexEntry<'e>>) -> Vec<SearchRecord> {
        entries
            .into_iter()
            .filter_map(|entry| self.record(entry))
            .collect()
    }
}

/// Search options.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Restrict to one version; `"all"` or `None` searches every version.
    pub version: Option<String>,
    pub limit: Option<usize>,
}

/// Case-insensitive substring filter over title, description, content and
/// keywords. Index order is preserved.
#[must_use]
pub fn filter_records(
    records: &[SearchRecord],
    query: &str,
    options: &SearchOptions,
) -> Vec<SearchRecord> {
    let needle = query.to_lowercase();
    let version = options.version.as_deref().filter(|v| *v != "all");
    let contains = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&needle));

    records
        .iter()
        .filter(|r| version.is_none_or(|v| r.version == v))
        .filter(|r| {
            contains(r.title.as_deref())
                || contains(r.description.as_deref())
                || contains(r.content.as_deref())
                || r
                    .keywords
                    .iter()
                    .flatten()
                    .any(|k| contains(Some(k.as_str())))
        })
        .take(options.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect()
}
