// src/config/mod.rs

//! Configuration loading and validation for assetpipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate task kinds, references, acyclicity and watch bindings
//!   (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    config_root_dir, load_and_validate, load_from_path, load_from_str, resolve_config_path,
    DEFAULT_CONFIG_FILE,
};
pub use model::{
    ActionKind, ConfigFile, ConfigSection, Globs, PathMapping, RawConfigFile, ServerSection,
    StepConfig, TaskConfig, WatchConfig,
};
