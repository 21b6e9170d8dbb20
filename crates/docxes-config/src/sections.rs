//! `docxes.toml` sections.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// `[docs]` as written, paths still relative to the config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct DocsSection {
    pub(crate) content_dir: Option<String>,
    pub(crate) cache_dir: Option<String>,
    pub(crate) public_dir: Option<String>,
    pub(crate) base_path: Option<String>,
    pub(crate) slugify: Option<SlugMode>,
}

impl DocsSection {
    /// Resolve against `root`, filling defaults.
    pub(crate) fn resolve(&self, root: &Path) -> DocsConfig {
        let dir = |value: Option<&str>, default: &str| root.join(value.unwrap_or(default));
        let base_path = self
            .base_path
            .as_deref()
            .unwrap_or(DEFAULT_BASE_PATH)
            .trim_end_matches('/');

        DocsConfig {
            content_dir: dir(self.content_dir.as_deref(), "content/docs"),
            cache_dir: dir(self.cache_dir.as_deref(), ".docxes"),
            public_dir: dir(self.public_dir.as_deref(), "public"),
            base_path: if base_path.is_empty() {
                "/".to_owned()
            } else {
                base_path.to_owned()
            },
            slugify: self.slugify.unwrap_or_default(),
        }
    }
}

const DEFAULT_BASE_PATH: &str = "/docs";

/// Resolved `[docs]` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocsConfig {
    /// Root holding one directory per version.
    pub content_dir: PathBuf,
    /// Manifest, hashes, artifacts and content store.
    pub cache_dir: PathBuf,
    /// Search index and sitemap output.
    pub public_dir: PathBuf,
    /// URL prefix for document hrefs, no trailing slash.
    pub base_path: String,
    pub slugify: SlugMode,
}

/// How on-disk names become slug segments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlugMode {
    /// Lowercase, whitespace to `-`, drop other punctuation.
    #[default]
    Slugify,
    /// Keep names verbatim.
    Preserve,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Content cache is authoritative.
    #[default]
    Production,
    /// Content cache is bypassed so edits always show up.
    Development,
}

/// `[build]`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    pub mode: BuildMode,
    /// Skip files whose content hash is unchanged.
    pub incremental: bool,
    /// Built-in plugin names, applied in order.
    pub plugins: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            mode: BuildMode::Production,
            incremental: true,
            plugins: Vec::new(),
        }
    }
}

/// `[compiler]`, handed to the compiler and hashed into cache keys.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    pub highlighter: Option<String>,
    pub theme: Option<String>,
    /// Keep the theme background in highlighted blocks.
    pub keep_background: bool,
    pub highlight_code: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            highlighter: None,
            theme: None,
            keep_background: false,
            highlight_code: true,
        }
    }
}

/// `[sitemap]`
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SitemapConfig {
    pub enabled: bool,
    /// Absolute site URL prefixed to every entry. Supports `${VAR}`.
    pub site_url: Option<String>,
}

impl SitemapConfig {
    /// Site URL when sitemap generation is on.
    #[must_use]
    pub fn active_site_url(&self) -> Option<&str> {
        self.enabled.then_some(self.site_url.as_deref()).flatten()
    }
}
