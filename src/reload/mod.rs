// src/reload/mod.rs

//! Live-update broadcasting.
//!
//! [`LiveReload`] is the in-process fan-out used by the watch reactor after a
//! binding with `reload = true` completes. [`server`] exposes it to browsers
//! over HTTP together with a static file server.

pub mod broadcaster;
pub mod server;

pub use broadcaster::{LiveReload, ReloadEvent};
