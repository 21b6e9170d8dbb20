//! Navigation tree construction.
//!
//! Walks a version directory and produces an ordered tree of [`NavItem`]s:
//!
//! - Files become leaf entries; `main`/`index` files are landing pages and
//!   never appear on their own
//! - Directories become nodes titled by their landing page, kept only when
//!   they have children or a clickable landing page
//! - A file and a directory with the same slug segment merge into one node
//!
//! Siblings are sorted by `order`, then case-insensitive title. Subdirectories
//! are walked concurrently.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::lookup::MetadataChain;
use crate::resolver::DocumentResolver;
use crate::slug::{is_landing_stem, markdown_stem, slug_path};
use crate::version::is_hidden;

/// Sort position for entries without an explicit `order`.
pub const DEFAULT_ORDER: i64 = 2_147_483_647;

/// Navigation tree node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavItem {
    pub title: String,
    /// Absent for folders without a clickable landing page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavItem>,
    pub order: i64,
}

/// Document href: `{base_path}/{version}/{slug}`.
#[must_use]
pub fn doc_href(base_path: &str, version: &str, slug: &[String]) -> String {
    format!("{base_path}/{version}/{}", slug_path(slug))
}

/// On-disk entries sharing one slug segment.
#[derive(Debug, Default)]
struct Entry {
    /// File stem, if a document file exists.
    file: Option<String>,
    dir: Option<String>,
}

impl Entry {
    /// Title used when no metadata is found.
    fn fallback_title(self) -> String {
        self.file.or(self.dir).unwrap_or_default()
    }
}

/// Keep the lexically smallest of several names normalizing alike.
fn keep_first(slot: &mut Option<String>, name: String) {
    if slot.as_ref().is_none_or(|current| name < *current) {
        *slot = Some(name);
    }
}

/// Builds navigation trees from the filesystem and a metadata chain.
pub struct NavigationBuilder<'a> {
    resolver: &'a DocumentResolver,
    metadata: &'a MetadataChain<'a>,
    base_path: &'a str,
}

impl<'a> NavigationBuilder<'a> {
    #[must_use]
    pub fn new(
        resolver: &'a DocumentResolver,
        metadata: &'a MetadataChain<'a>,
        base_path: &'a str,
    ) -> Self {
        Self {
            resolver,
            metadata,
            base_path,
        }
    }

    /// Navigation for one version. A missing version yields an empty tree.
    pub async fn build(&self, version: &str) -> Vec<NavItem> {
        let Some(dir) = self.resolver.version_dir(version) else {
            return Vec::new();
        };
        self.build_dir(version, dir, Vec::new()).await
    }

    fn build_dir<'s>(
        &'s self,
        version: &'s str,
        dir: PathBuf,
        parent: Vec<String>,
    ) -> BoxFuture<'s, Vec<NavItem>> {
        async move {
            let entries = match self.scan(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
                Err(e) => {
                    tracing::warn!(path = %dir.display(), error = %e, "Skipping unreadable directory");
                    return Vec::new();
                }
            };

            let tasks = entries.into_iter().map(|(segment, entry)| {
                let mut slug = parent.clone();
                slug.push(segment);
                self.build_entry(version, &dir, slug, entry)
            });

            let mut items: Vec<NavItem> = join_all(tasks).await.into_iter().flatten().collect();
            sort_items(&mut items);
            items
        }
        .boxed()
    }

    async fn build_entry(
        &self,
        version: &str,
        dir: &Path,
        slug: Vec<String>,
        entry: Entry,
    ) -> Option<NavItem> {
        let children = match &entry.dir {
            Some(name) => self.build_dir(version, dir.join(name), slug.clone()).await,
            None => Vec::new(),
        };

        let meta = match self.metadata.lookup(version, &slug).await {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(version, slug = %slug_path(&slug), error = %e, "Skipping navigation entry");
                return None;
            }
        };

        let clickable = meta.as_ref().is_some_and(|m| m.clickable);
        if entry.file.is_none() && children.is_empty() && !clickable {
            return None;
        }

        let (title, order) = match meta {
            Some(meta) => (meta.title, meta.order.unwrap_or(DEFAULT_ORDER)),
            None => (entry.fallback_title(), DEFAULT_ORDER),
        };

        Some(NavItem {
            title,
            href: clickable.then(|| doc_href(self.base_path, version, &slug)),
            children,
            order,
        })
    }

    /// Group visible entries of `dir` by slug segment.
    async fn scan(&self, dir: &Path) -> std::io::Result<BTreeMap<String, Entry>> {
        let strategy = self.resolver.strategy();
        let mut read_dir = fs::read_dir(dir).await?;
        let mut groups: BTreeMap<String, Entry> = BTreeMap::new();

        while let Some(item) = read_dir.next_entry().await? {
            let file_name = item.file_name().to_string_lossy().into_owned();
            if is_hidden(&file_name) {
                continue;
            }

            let is_dir = item.file_type().await.is_ok_and(|t| t.is_dir());
            let name = if is_dir {
                file_name
            } else {
                match markdown_stem(&file_name) {
                    Some(stem) if !is_landing_stem(stem) => stem.to_owned(),
                    _ => continue,
                }
            };

            let segment = strategy.segment(&name);
            if segment.is_empty() {
                tracing::debug!(path = %dir.join(&name).display(), "Skipping entry with empty slug");
                continue;
            }

            let entry = groups.entry(segment).or_default();
            if is_dir {
                keep_first(&mut entry.dir, name);
            } else {
                keep_first(&mut entry.file, name);
            }
        }

        Ok(groups)
    }
}

fn sort_items(items: &mut [NavItem]) {
    items.sort_by(|a, b| {
        a.order
            .cmp(&b.order)
            .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
            .then_with(|| a.href.cmp(&b.href))
            .then_with(|| a.title.cmp(&b.title))
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use docxes_cache::NullStore;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::lookup::SourceTier;
    use crate::pipeline::{Collaborators, CompileOptions};
    use crate::plugin::PluginPipeline;
    use crate::processor::{BuildMode, Processor};
    use crate::slug::SlugStrategy;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    async fn navigation(root: &Path, version: &str) -> Vec<NavItem> {
        let resolver = DocumentResolver::new(root.to_path_buf(), SlugStrategy::Slugify);
        let processor = Processor::new(
            Collaborators::default(),
            PluginPipeline::default(),
            Arc::new(NullStore),
            CompileOptions::default(),
            BuildMode::Production,
            SlugStrategy::Slugify,
        );
        let chain = MetadataChain::new().with(SourceTier::new(&resolver, &processor));
        NavigationBuilder::new(&resolver, &chain, "/docs")
            .build(version)
            .await
    }

    fn leaf(title: &str, href: Option<&str>, order: i64) -> NavItem {
        NavItem {
            title: title.to_owned(),
            href: href.map(str::to_owned),
            children: Vec::new(),
            order,
        }
    }

    #[tokio::test]
    async fn test_single_file_item() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "v1/intro.mdx", "---\ntitle: Intro\norder: 1\n---\nHello");

        let nav = navigation(tmp.path(), "v1").await;

        assert_eq!(nav, vec![leaf("Intro", Some("/docs/v1/intro"), 1)]);
        let json = serde_json::to_value(&nav[0]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"title": "Intro", "href": "/docs/v1/intro", "order": 1})
        );
    }

    #[tokio::test]
    async fn test_folder_with_empty_landing_has_no_href() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "v1/guides/main.mdx", "");
        write(tmp.path(), "v1/guides/setup.mdx", "Install it.");

        let nav = navigation(tmp.path(), "v1").await;

        assert_eq!(
            nav,
            vec![NavItem {
                title: "guides".to_owned(),
                href: None,
                children: vec![leaf("setup", Some("/docs/v1/guides/setup"), DEFAULT_ORDER)],
                order: DEFAULT_ORDER,
            }]
        );
    }

    #[tokio::test]
    async fn test_directory_inclusion_rule() {
        let tmp = tempfile::tempdir().unwrap();
        // No children, empty landing: dropped
        write(tmp.path(), "v1/empty/main.md", "---\ntitle: Empty\n---\n");
        // No children, clickable landing: kept with href
        write(tmp.path(), "v1/overview/main.md", "---\ntitle: Overview\n---\nWelcome");
        // No markdown at all: dropped
        write(tmp.path(), "v1/assets/logo.png", "png");

        let nav = navigation(tmp.path(), "v1").await;

        assert_eq!(nav, vec![leaf("Overview", Some("/docs/v1/overview"), DEFAULT_ORDER)]);
    }

    #[tokio::test]
    async fn test_empty_file_is_kept_without_href() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "v1/todo.md", "---\ntitle: Todo\n---\n");

        let nav = navigation(tmp.path(), "v1").await;

        assert_eq!(nav, vec![leaf("Todo", None, DEFAULT_ORDER)]);
    }

    #[tokio::test]
    async fn test_sorting_by_order_then_title() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "v1/b.md", "---\ntitle: beta\n---\nb");
        write(tmp.path(), "v1/a.md", "---\ntitle: Alpha\n---\na");
        write(tmp.path(), "v1/z.md", "---\ntitle: Zulu\norder: 1\n---\nz");

        let titles: Vec<String> = navigation(tmp.path(), "v1")
            .await
            .into_iter()
            .map(|item| item.title)
            .collect();

        assert_eq!(titles, vec!["Zulu", "Alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_landing_and_hidden_files_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "v1/main.mdx", "Home");
        write(tmp.path(), "v1/index.md", "Home");
        write(tmp.path(), "v1/.draft.md", "Secret");
        write(tmp.path(), "v1/old.hidden/page.md", "Old");
        write(tmp.path(), "v1/page.md", "Page");

        let nav = navigation(tmp.path(), "v1").await;

        assert_eq!(nav, vec![leaf("page", Some("/docs/v1/page"), DEFAULT_ORDER)]);
    }

    #[tokio::test]
    async fn test_file_and_directory_merge() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "v1/api.md", "---\ntitle: API\n---\nReference");
        write(tmp.path(), "v1/api/main.md", "---\ntitle: Ignored\n---\nLanding");
        write(tmp.path(), "v1/api/auth.md", "Auth");

        let nav = navigation(tmp.path(), "v1").await;

        assert_eq!(
            nav,
            vec![NavItem {
                title: "API".to_owned(),
                href: Some("/docs/v1/api".to_owned()),
                children: vec![leaf("auth", Some("/docs/v1/api/auth"), DEFAULT_ORDER)],
                order: DEFAULT_ORDER,
            }]
        );
    }

    #[tokio::test]
    async fn test_slugified_hrefs_use_directory_names() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "v1/Getting Started/First Steps.md", "Go");

        let nav = navigation(tmp.path(), "v1").await;

        assert_eq!(nav[0].title, "Getting Started");
        assert_eq!(
            nav[0].children[0].href.as_deref(),
            Some("/docs/v1/getting-started/first-steps")
        );
    }

    #[tokio::test]
    async fn test_unreadable_entry_does_not_affect_siblings() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "v1/good.md", "Fine");
        std::fs::write(tmp.path().join("v1/bad.md"), [0xff, 0xfe, 0x00]).unwrap();

        let nav = navigation(tmp.path(), "v1").await;

        assert_eq!(nav, vec![leaf("good", Some("/docs/v1/good"), DEFAULT_ORDER)]);
    }

    #[tokio::test]
    async fn test_missing_version_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(navigation(tmp.path(), "v9").await.is_empty());
    }
}
