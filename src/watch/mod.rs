// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling each `[watch.<name>]` binding's glob patterns.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - (Optionally) content hashing so bindings can ignore events that did not
//!   change a file's bytes.
//!
//! It does **not** run tasks; it only turns filesystem changes into reactor
//! events. Debouncing and triggering live in [`crate::engine`].

pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use hash::{compute_file_hash, ContentHashes};
pub use patterns::{build_bindings_from_config, RawBindingSpec, WatchBinding};
pub use watcher::{spawn_watcher, watch_dirs, WatcherHandle};
