// src/watch/path_utils.rs

use std::path::{Component, Path};

/// Path of `path` relative to `root`, segments joined with `/`.
///
/// Event paths sometimes carry a different absolute prefix than the root
/// (symlinks, `/private/var` on macOS), so a failed `strip_prefix` is retried
/// on canonicalized paths. Removed files cannot be canonicalized; for those
/// only the parent directory is.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(join_segments(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = path.canonicalize().ok().or_else(|| {
        let parent = path.parent()?.canonicalize().ok()?;
        Some(parent.join(path.file_name()?))
    })?;

    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(join_segments)
}

fn join_segments(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
