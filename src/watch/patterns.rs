use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use globset::GlobSet;

use crate::config::model::ConfigFile;
use crate::globs::{build_globset, split_negation};
use crate::types::{TaskName, TriggeredWhileRunning};

/// Raw binding specification coming from the high-level config.
///
/// `globs` may contain `!negated` entries; they are folded into the exclude
/// set when compiling.
#[derive(Debug, Clone)]
pub struct RawBindingSpec {
    pub name: String,
    pub globs: Vec<String>,
    pub exclude: Vec<String>,
    pub task: Option<TaskName>,
    pub reload: bool,
    pub use_hash: bool,
    pub delay: Duration,
    pub triggered_while_running: TriggeredWhileRunning,
}

/// Compiled watch binding: which paths it cares about and what to do when
/// they change.
///
/// Patterns are relative to the project root. The watcher passes relative
/// paths (e.g. `"app/src/sass/main.scss"`) into [`WatchBinding::matches`].
#[derive(Clone)]
pub struct WatchBinding {
    name: String,
    /// Positive patterns as written, used to pick directories to watch.
    globs: Vec<String>,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
    task: Option<TaskName>,
    reload: bool,
    use_hash: bool,
    delay: Duration,
    triggered_while_running: TriggeredWhileRunning,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("name", &self.name)
            .field("globs", &self.globs)
            .field("task", &self.task)
            .field("reload", &self.reload)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    /// Compile a binding. Fails if there are no positive patterns or a
    /// pattern is not a valid glob.
    pub fn compile(spec: RawBindingSpec) -> Result<Self> {
        let mut positive = Vec::new();
        let mut exclude = spec.exclude.clone();

        for pattern in &spec.globs {
            match split_negation(pattern) {
                (true, rest) => exclude.push(rest.to_string()),
                (false, rest) => positive.push(rest.to_string()),
            }
        }

        if positive.is_empty() {
            anyhow::bail!("watch binding '{}' has no watch patterns", spec.name);
        }

        let watch_set = build_globset(&positive)
            .with_context(|| format!("building watch globset for binding {}", spec.name))?;

        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(
                build_globset(&exclude).with_context(|| {
                    format!("building exclude globset for binding {}", spec.name)
                })?,
            )
        };

        Ok(Self {
            name: spec.name,
            globs: positive,
            watch_set,
            exclude_set,
            task: spec.task,
            reload: spec.reload,
            use_hash: spec.use_hash,
            delay: spec.delay,
            triggered_while_running: spec.triggered_while_running,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn globs(&self) -> &[String] {
        &self.globs
    }

    /// Task to run on change; `None` for reload-only bindings.
    pub fn task(&self) -> Option<&str> {
        self.task.as_deref()
    }

    pub fn reload(&self) -> bool {
        self.reload
    }

    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn triggered_while_running(&self) -> TriggeredWhileRunning {
        self.triggered_while_running
    }

    /// Returns true if this binding is interested in the given path
    /// (relative to project root).
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Build compiled bindings from a loaded `ConfigFile`.
///
/// A binding's patterns are its own `paths` if given, otherwise the `watch`
/// globs of its `category` (falling back to the category's `src`). The
/// debounce delay is the binding's `delay_ms` or `[config].debounce_ms`.
pub fn build_bindings_from_config(cfg: &ConfigFile) -> Result<Vec<WatchBinding>> {
    let section = cfg.config_section();

    cfg.watch_bindings()
        .iter()
        .map(|(name, wc)| {
            let spec = RawBindingSpec {
                name: name.clone(),
                globs: cfg.watch_globs(wc),
                exclude: wc.exclude.to_vec(),
                task: wc.task.clone(),
                reload: wc.reload,
                use_hash: wc.use_hash,
                delay: Duration::from_millis(wc.delay_ms.unwrap_or(section.debounce_ms)),
                triggered_while_running: section.triggered_while_running,
            };
            WatchBinding::compile(spec)
        })
        .collect()
}
