//! Slug segments and document keys.

use serde::{Deserialize, Serialize};

/// How on-disk names are turned into slug segments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlugStrategy {
    /// Lowercase, whitespace runs become `-`, everything but ASCII word
    /// characters and `-` is dropped.
    #[default]
    Slugify,
    /// Names are used verbatim.
    Preserve,
}

impl SlugStrategy {
    /// Slug segment for an on-disk directory name or file stem.
    #[must_use]
    pub fn segment(self, name: &str) -> String {
        match self {
            Self::Slugify => slugify(name),
            Self::Preserve => name.to_owned(),
        }
    }

    /// Stable identifier hashed into content cache keys.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Slugify => "slugify",
            Self::Preserve => "preserve",
        }
    }
}

/// Lowercase `name`, collapse whitespace to `-`, drop other punctuation.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.trim().chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('-');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c.to_ascii_lowercase());
        }
    }
    out
}

/// Join slug segments with `/`.
#[must_use]
pub fn slug_path(slug: &[String]) -> String {
    slug.join("/")
}

/// Manifest and artifact key for a document: `version/slug/path`.
#[must_use]
pub fn doc_key(version: &str, slug: &[String]) -> String {
    format!("{version}/{}", slug_path(slug))
}

/// Split a `/`-separated slug path into segments, ignoring empty ones.
#[must_use]
pub fn parse_slug(path: &str) -> Vec<String> {
    path.split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Strip a `.md` / `.mdx` extension, returning `None` for other files.
pub(crate) fn markdown_stem(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(".mdx")
        .or_else(|| file_name.strip_suffix(".md"))
}

/// True for stems that name a landing page rather than a standalone entry.
pub(crate) fn is_landing_stem(stem: &str) -> bool {
    stem == "main" || stem == "index"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Getting Started"), "getting-started");
        assert_eq!(slugify("API  Reference (v2)"), "api-reference-v2");
        assert_eq!(slugify("already-slugged_name"), "already-slugged_name");
        assert_eq!(slugify("  padded  "), "padded");
    }

    #[test]
    fn test_preserve_keeps_case() {
        assert_eq!(SlugStrategy::Preserve.segment("Getting Started"), "Getting Started");
        assert_eq!(SlugStrategy::Slugify.segment("Getting Started"), "getting-started");
    }

    #[test]
    fn test_doc_key_and_parse() {
        let slug = parse_slug("/guides//setup/");
        assert_eq!(slug, vec!["guides", "setup"]);
        assert_eq!(doc_key("v1", &slug), "v1/guides/setup");
        assert_eq!(parse_slug("a\\b"), vec!["a", "b"]);
    }

    #[test]
    fn test_markdown_stem() {
        assert_eq!(markdown_stem("intro.mdx"), Some("intro"));
        assert_eq!(markdown_stem("intro.md"), Some("intro"));
        assert_eq!(markdown_stem("logo.png"), None);
    }
}
