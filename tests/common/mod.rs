#![allow(dead_code)]

pub use assetpipe_test_utils::builders;
pub use assetpipe_test_utils::probe;
pub use assetpipe_test_utils::{init_tracing, with_timeout};

use std::fs;
use std::path::{Path, PathBuf};

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

pub fn read_file(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}
