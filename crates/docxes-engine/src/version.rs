//! Version discovery and ordering.
//!
//! A version is any visible top-level directory under the content root.
//! Versions sort by semantic version when every name starts with
//! `vMAJOR.MINOR.PATCH` (the `v` is optional), otherwise case-insensitively.

use std::cmp::Ordering;
use std::path::Path;

use tokio::fs;

/// True for entries the engine never looks at.
pub(crate) fn is_hidden(name: &str) -> bool {
    name.starts_with('.') || name.contains(".hidden")
}

/// List versions under `content_root`, sorted ascending.
///
/// Read errors (including a missing root) yield an empty list.
pub async fn list_versions(content_root: &Path) -> Vec<String> {
    let mut entries = match fs::read_dir(content_root).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(path = %content_root.display(), error = %e, "No versions found");
            return Vec::new();
        }
    };

    let mut versions = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(path = %content_root.display(), error = %e, "Failed to list versions");
                return Vec::new();
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_hidden(&name) {
            continue;
        }
        if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
            versions.push(name);
        }
    }

    sort_versions(&mut versions);
    versions
}

/// Sort version names in place.
pub fn sort_versions(versions: &mut [String]) {
    let all_semver = versions.iter().all(|v| parse_semver(v).is_some());
    if all_semver {
        versions.sort_by(|a, b| {
            parse_semver(a)
                .cmp(&parse_semver(b))
                .then_with(|| lexical(a, b))
        });
    } else {
        versions.sort_by(|a, b| lexical(a, b));
    }
}

fn lexical(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Parse a `vMAJOR.MINOR.PATCH` prefix.
///
/// Anything after the patch number (pre-release tags, suffixes) is ignored.
pub(crate) fn parse_semver(name: &str) -> Option<(u64, u64, u64)> {
    let rest = name
        .strip_prefix(['v', 'V'])
        .unwrap_or(name);

    let mut parts = rest.splitn(3, '.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let tail = parts.next()?;
    let digits = tail.len() - tail.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let patch = tail[..digits].parse().ok()?;
    Some((major, minor, patch))
}
