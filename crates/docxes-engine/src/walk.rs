//! Document discovery.
//!
//! Lists every resolvable document of a version: standalone files plus one
//! landing document per directory that has a `main` page. Slugs are unique;
//! when a file and a directory landing page share a slug the resolver's
//! file-first rule decides which one backs it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use tokio::fs;

use crate::resolver::DocumentResolver;
use crate::slug::{is_landing_stem, markdown_stem, slug_path};
use crate::version::is_hidden;

/// A document found on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveredDoc {
    pub slug: Vec<String>,
    pub path: PathBuf,
}

/// All documents of `version`, sorted by slug.
pub async fn discover_documents(resolver: &DocumentResolver, version: &str) -> Vec<DiscoveredDoc> {
    let Some(dir) = resolver.version_dir(version) else {
        return Vec::new();
    };
    let mut slugs = BTreeSet::new();
    collect_slugs(resolver, dir, Vec::new(), &mut slugs).await;

    let resolved = join_all(slugs.into_iter().map(|slug| async move {
        let path = resolver.resolve(version, &slug).await;
        if path.is_none() {
            tracing::debug!(version, slug = %slug_path(&slug), "Discovered slug does not resolve");
        }
        path.map(|path| DiscoveredDoc { slug, path })
    }))
    .await;

    resolved.into_iter().flatten().collect()
}

fn collect_slugs<'a>(
    resolver: &'a DocumentResolver,
    dir: PathBuf,
    parent: Vec<String>,
    out: &'a mut BTreeSet<Vec<String>>,
) -> BoxFuture<'a, ()> {
    async move {
        let (files, dirs) = match list_dir(&dir).await {
            Ok(listing) => listing,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "Skipping unreadable directory");
                return;
            }
        };
        let strategy = resolver.strategy();

        for stem in files {
            let segment = strategy.segment(&stem);
            if !segment.is_empty() {
                let mut slug = parent.clone();
                slug.push(segment);
                out.insert(slug);
            }
        }

        let subdirs = dirs.into_iter().filter_map(|name| {
            let segment = strategy.segment(&name);
            if segment.is_empty() {
                return None;
            }
            let mut slug = parent.clone();
            slug.push(segment);
            Some((dir.join(name), slug))
        });

        let nested = join_all(subdirs.map(|(path, slug)| async move {
            let mut found = BTreeSet::new();
            if has_landing(&path).await {
                found.insert(slug.clone());
            }
            collect_slugs(resolver, path, slug, &mut found).await;
            found
        }))
        .await;

        for found in nested {
            out.extend(found);
        }
    }
    .boxed()
}

/// Visible markdown stems (landing pages excluded) and subdirectory names.
async fn list_dir(dir: &Path) -> std::io::Result<(Vec<String>, Vec<String>)> {
    let mut read_dir = fs::read_dir(dir).await?;
    let mut files = Vec::new();
    let mut dirs = Vec::new();

    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_hidden(&name) {
            continue;
        }
        if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
            dirs.push(name);
        } else if let Some(stem) = markdown_stem(&name)
            && !is_landing_stem(stem)
        {
            files.push(stem.to_owned());
        }
    }
    Ok((files, dirs))
}

async fn has_landing(dir: &Path) -> bool {
    for name in ["main.mdx", "main.md"] {
        if fs::metadata(dir.join(name)).await.is_ok_and(|m| m.is_file()) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slug::SlugStrategy;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn slugs(docs: &[DiscoveredDoc]) -> Vec<String> {
        docs.iter().map(|d| slug_path(&d.slug)).collect()
    }

    #[tokio::test]
    async fn test_discovers_files_and_landing_pages() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "v1/main.mdx", "Home");
        write(tmp.path(), "v1/intro.mdx", "Intro");
        write(tmp.path(), "v1/guides/main.mdx", "");
        write(tmp.path(), "v1/guides/setup.md", "Setup");
        write(tmp.path(), "v1/guides/index.md", "Ignored");
        write(tmp.path(), "v1/guides/deep/page.md", "Deep");
        write(tmp.path(), "v1/.drafts/wip.md", "Hidden");
        write(tmp.path(), "v1/notes.txt", "Not markdown");
        let resolver = DocumentResolver::new(tmp.path().to_path_buf(), SlugStrategy::Slugify);

        let docs = discover_documents(&resolver, "v1").await;

        assert_eq!(
            slugs(&docs),
            vec!["guides", "guides/deep/page", "guides/setup", "intro"]
        );
        assert_eq!(docs[0].path, tmp.path().join("v1/guides/main.mdx"));
    }

    #[tokio::test]
    async fn test_file_shadows_landing_page() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "v1/api.md", "File");
        write(tmp.path(), "v1/api/main.md", "Landing");
        let resolver = DocumentResolver::new(tmp.path().to_path_buf(), SlugStrategy::Slugify);

        let docs = discover_documents(&resolver, "v1").await;

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].path, tmp.path().join("v1/api.md"));
    }

    #[tokio::test]
    async fn test_slugified_names_resolve() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "v1/Getting Started/First Steps.md", "Go");
        let resolver = DocumentResolver::new(tmp.path().to_path_buf(), SlugStrategy::Slugify);

        let docs = discover_documents(&resolver, "v1").await;

        assert_eq!(slugs(&docs), vec!["getting-started/first-steps"]);
        assert_eq!(
            docs[0].path,
            tmp.path().join("v1/Getting Started/First Steps.md")
        );
    }

    #[tokio::test]
    async fn test_missing_version_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let resolver = DocumentResolver::new(tmp.path().to_path_buf(), SlugStrategy::Slugify);
        assert!(discover_documents(&resolver, "v1").await.is_empty());
    }
}
