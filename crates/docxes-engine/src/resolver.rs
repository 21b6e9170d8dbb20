//! Document resolution.
//!
//! Maps `(version, slug)` to the backing file. For slug `[...dirs, name]`
//! the candidates are tried in this fixed order:
//!
//! 1. `dirs/name.mdx`
//! 2. `dirs/name.md`
//! 3. `dirs/name/main.mdx`
//! 4. `dirs/name/main.md`
//!
//! The first existing file wins, so a leaf file shadows a directory landing
//! page with the same name.
//!
//! Slug segments are derived from on-disk names by a [`SlugStrategy`]. When a
//! segment has no literal match the resolver looks for the entry whose slug
//! form equals the segment, which is how `getting-started` finds the
//! `Getting Started/` directory.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::slug::{SlugStrategy, markdown_stem};
use crate::version::is_hidden;

/// Locates backing files for document slugs.
#[derive(Clone, Debug)]
pub struct DocumentResolver {
    content_root: PathBuf,
    strategy: SlugStrategy,
}

impl DocumentResolver {
    #[must_use]
    pub fn new(content_root: PathBuf, strategy: SlugStrategy) -> Self {
        Self {
            content_root,
            strategy,
        }
    }

    #[must_use]
    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    #[must_use]
    pub fn strategy(&self) -> SlugStrategy {
        self.strategy
    }

    /// Directory of `version`, or `None` for names that are not a single
    /// path component.
    #[must_use]
    pub fn version_dir(&self, version: &str) -> Option<PathBuf> {
        is_plain_segment(version).then(|| self.content_root.join(version))
    }

    /// Resolve a slug to its backing file.
    ///
    /// Returns `None` when no candidate exists; an empty slug never resolves
    /// (see [`resolve_landing`](Self::resolve_landing)). Segments that could
    /// leave the content root never resolve either.
    pub async fn resolve(&self, version: &str, slug: &[String]) -> Option<PathBuf> {
        if !slug.iter().all(|s| is_plain_segment(s)) {
            return None;
        }
        let (name, dirs) = slug.split_last()?;

        let mut dir = self.version_dir(version)?;
        for segment in dirs {
            let actual = self.match_directory(&dir, segment).await?;
            dir.push(actual);
        }

        if let Some(path) = first_file(&candidates(&dir, name)).await {
            return Some(path);
        }

        let actual = self.match_name(&dir, name, false).await?;
        if actual == *name {
            return None;
        }
        first_file(&candidates(&dir, &actual)).await
    }

    /// Resolve the landing page at the root of a version.
    pub async fn resolve_landing(&self, version: &str) -> Option<PathBuf> {
        let dir = self.version_dir(version)?;
        first_file(&[dir.join("main.mdx"), dir.join("main.md")]).await
    }

    /// Content-root-relative path with `/` separators, used as the hash key.
    #[must_use]
    pub fn relative_key(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.content_root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    async fn match_directory(&self, dir: &Path, segment: &str) -> Option<String> {
        if fs::metadata(dir.join(segment))
            .await
            .is_ok_and(|m| m.is_dir())
        {
            return Some(segment.to_owned());
        }
        self.match_name(dir, segment, true).await
    }

    /// Find the entry in `dir` whose slug form equals `segment`.
    ///
    /// Exact names win; among normalized matches the lexically smallest name
    /// is chosen so resolution does not depend on enumeration order.
    async fn match_name(&self, dir: &Path, segment: &str, dirs_only: bool) -> Option<String> {
        let mut entries = fs::read_dir(dir).await.ok()?;
        let mut matches = Vec::new();

        while let Ok(Some(entry)) = entries.next_entry().await {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if is_hidden(&file_name) {
                continue;
            }
            let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
            let name = if is_dir {
                file_name
            } else if dirs_only {
                continue;
            } else if let Some(stem) = markdown_stem(&file_name) {
                stem.to_owned()
            } else {
                continue;
            };

            if name == segment {
                return Some(name);
            }
            if self.strategy.segment(&name) == segment {
                matches.push(name);
            }
        }

        matches.sort();
        matches.into_iter().next()
    }
}

/// A single path component that stays inside its parent directory.
fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
        && !Path::new(segment).has_root()
}

fn candidates(dir: &Path, name: &str) -> [PathBuf; 4] {
    [
        dir.join(format!("{name}.mdx")),
        dir.join(format!("{name}.md")),
        dir.join(name).join("main.mdx"),
        dir.join(name).join("main.md"),
    ]
}

async fn first_file(paths: &[PathBuf]) -> Option<PathBuf> {
    for path in paths {
        if fs::metadata(path).await.is_ok_and(|m| m.is_file()) {
            return Some(path.clone());
        }
    }
    None
}
