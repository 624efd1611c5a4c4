// src/globs.rs

//! Glob helpers shared by the watcher and the file actions.
//!
//! Patterns follow gulp conventions: relative to the project root, an
//! optional leading `./`, `*` stays inside one path segment, `**` crosses
//! directories, and a leading `!` negates the pattern.

use std::path::PathBuf;

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Strip a leading `./` (repeatedly) and a trailing `/`.
pub fn normalize(pattern: &str) -> String {
    let mut p = pattern.trim();
    while let Some(rest) = p.strip_prefix("./") {
        p = rest;
    }
    let p = p.trim_end_matches('/');
    if p.is_empty() { ".".to_string() } else { p.to_string() }
}

/// Split `!pattern` into `(true, "pattern")`.
pub fn split_negation(pattern: &str) -> (bool, &str) {
    match pattern.trim().strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, pattern.trim()),
    }
}

pub fn has_glob_chars(segment: &str) -> bool {
    segment.contains(['*', '?', '[', '{'])
}

/// Leading literal directory of a glob: `app/src/**/*.js` -> `app/src`,
/// `app/index.html` -> `app`, `**/*.css` -> `.`.
///
/// For a pattern without any glob characters that names a directory the
/// caller decides; this function always treats the last segment as a file
/// name.
pub fn glob_base(pattern: &str) -> PathBuf {
    let normalized = normalize(pattern);
    let mut base = PathBuf::new();
    let segments: Vec<&str> = normalized.split('/').collect();

    for (i, seg) in segments.iter().enumerate() {
        let is_last = i + 1 == segments.len();
        if has_glob_chars(seg) || is_last {
            break;
        }
        base.push(seg);
    }

    if base.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        base
    }
}

/// Compile patterns into one [`GlobSet`]. `*` does not cross `/`.
pub fn build_globset<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let normalized = normalize(pat.as_ref());
        let glob = GlobBuilder::new(&normalized)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {}", pat.as_ref()))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
