use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

/// Compute the blake3 hash of a single file.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = File::open(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Last content hash seen per (binding, path).
///
/// Used by `use_hash = true` bindings to ignore events that did not change
/// the file's bytes (editors touching a file, `chmod`, save-without-edit).
#[derive(Debug, Default)]
pub struct ContentHashes {
    seen: HashMap<(String, String), String>,
}

impl ContentHashes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `hash` for the key and report whether it differs from the
    /// previous one. The first sighting counts as a change.
    pub fn update(&mut self, binding: &str, path: &str, hash: String) -> bool {
        let key = (binding.to_string(), path.to_string());
        match self.seen.insert(key, hash.clone()) {
            Some(old) if old == hash => false,
            Some(_) | None => {
                debug!(binding, path, hash = %hash, "content hash updated");
                true
            }
        }
    }

    /// Drop the stored hash (e.g. the file was removed).
    pub fn forget(&mut self, binding: &str, path: &str) {
        self.seen.remove(&(binding.to_string(), path.to_string()));
    }
}
