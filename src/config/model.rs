use std::collections::BTreeMap;
use std::ops::Deref;

use serde::Deserialize;

use crate::compose::{parallel, series, Step};
use crate::types::{AssetCategory, TriggeredWhileRunning};

/// Raw top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// default_task = "default"
/// debounce_ms = 100
///
/// [paths.styles]
/// src = "app/src/sass/style.scss"
/// watch = "app/src/sass/**/*.scss"
/// dest = "app/css/prev"
///
/// [task.styles]
/// action = "cmd"
/// cmd = "sass app/src/sass/style.scss app/css/prev/style.css"
///
/// [task.default]
/// series = ["clean", { parallel = ["styles", "scripts"] }]
///
/// [watch.styles]
/// category = "styles"
/// task = "styles"
/// reload = true
/// ```
///
/// All sections except `[task.*]` are optional. This type is not validated;
/// convert it with `ConfigFile::try_from`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Source/destination mapping per asset category.
    #[serde(default)]
    pub paths: BTreeMap<AssetCategory, PathMapping>,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// Watch bindings from `[watch.<name>]`.
    #[serde(default)]
    pub watch: BTreeMap<String, WatchConfig>,

    #[serde(default)]
    pub server: ServerSection,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    paths: BTreeMap<AssetCategory, PathMapping>,
    task: BTreeMap<String, TaskConfig>,
    watch: BTreeMap<String, WatchConfig>,
    server: ServerSection,
}

impl ConfigFile {
    /// Assemble a config without validation. Use `ConfigFile::try_from` on a
    /// [`RawConfigFile`] instead.
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            paths: raw.paths,
            task: raw.task,
            watch: raw.watch,
            server: raw.server,
        }
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn paths(&self) -> &BTreeMap<AssetCategory, PathMapping> {
        &self.paths
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }

    pub fn watch_bindings(&self) -> &BTreeMap<String, WatchConfig> {
        &self.watch
    }

    pub fn server(&self) -> &ServerSection {
        &self.server
    }

    /// Effective source globs of a leaf task: its own `src`, else the `src`
    /// of its category.
    pub fn task_sources(&self, task: &TaskConfig) -> Vec<String> {
        resolve_sources(&self.paths, task)
    }

    /// Effective destination of a copy task: its own `dest`, else the `dest`
    /// of its category.
    pub fn task_dest(&self, task: &TaskConfig) -> Option<String> {
        resolve_dest(&self.paths, task)
    }

    /// Effective patterns of a watch binding: its own `paths`, else the
    /// category's `watch` globs, else the category's `src`.
    pub fn watch_globs(&self, binding: &WatchConfig) -> Vec<String> {
        resolve_watch_globs(&self.paths, binding)
    }
}

pub(crate) fn resolve_sources(
    paths: &BTreeMap<AssetCategory, PathMapping>,
    task: &TaskConfig,
) -> Vec<String> {
    match (&task.src, task.category.and_then(|c| paths.get(&c))) {
        (Some(src), _) => src.to_vec(),
        (None, Some(mapping)) => mapping.src.to_vec(),
        (None, None) => Vec::new(),
    }
}

pub(crate) fn resolve_dest(
    paths: &BTreeMap<AssetCategory, PathMapping>,
    task: &TaskConfig,
) -> Option<String> {
    task.dest.clone().or_else(|| {
        task.category
            .and_then(|c| paths.get(&c))
            .and_then(|m| m.dest.clone())
    })
}

pub(crate) fn resolve_watch_globs(
    paths: &BTreeMap<AssetCategory, PathMapping>,
    binding: &WatchConfig,
) -> Vec<String> {
    if let Some(own) = &binding.paths {
        return own.to_vec();
    }
    match binding.category.and_then(|c| paths.get(&c)) {
        Some(mapping) => mapping
            .watch
            .as_ref()
            .unwrap_or(&mapping.src)
            .to_vec(),
        None => Vec::new(),
    }
}

/// A list of glob patterns, written either as one string or as an array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "OneOrMany")]
pub struct Globs(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Globs {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => Globs(vec![s]),
            OneOrMany::Many(v) => Globs(v),
        }
    }
}

impl From<Vec<String>> for Globs {
    fn from(value: Vec<String>) -> Self {
        Globs(value)
    }
}

impl Deref for Globs {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Task run when the CLI is given no task name.
    #[serde(default = "default_task_name")]
    pub default_task: String,

    /// Quiet period before a burst of changes fires a binding.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// `"queue"` (default) or `"drop"`.
    #[serde(default)]
    pub triggered_while_running: TriggeredWhileRunning,
}

fn default_task_name() -> String {
    "default".to_string()
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            default_task: default_task_name(),
            debounce_ms: default_debounce_ms(),
            triggered_while_running: TriggeredWhileRunning::default(),
        }
    }
}

/// `[paths.<category>]` entry. Pure data consumed by task actions and watch
/// bindings that name the category.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PathMapping {
    #[serde(default)]
    pub src: Globs,

    /// Patterns to watch when they differ from `src` (e.g. every partial of
    /// a stylesheet whose entry point is `src`).
    #[serde(default)]
    pub watch: Option<Globs>,

    #[serde(default)]
    pub dest: Option<String>,
}

/// Built-in leaf actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Delete everything matched by `src`.
    Clean,
    /// Copy `src` to `dest`, keeping paths relative to the glob base.
    Copy,
    /// Concatenate `src` (in glob order) into the single file `output`.
    Concat,
    /// Run `cmd` through the platform shell.
    Cmd,
}

/// One member of a `series` / `parallel` list: a task name or an inline
/// nested composition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StepConfig {
    Name(String),
    Series { series: Vec<StepConfig> },
    Parallel { parallel: Vec<StepConfig> },
}

impl StepConfig {
    pub fn to_step(&self) -> Step {
        match self {
            StepConfig::Name(name) => Step::Task(name.clone()),
            StepConfig::Series { series: members } => series(members.iter().map(StepConfig::to_step)),
            StepConfig::Parallel { parallel: members } => {
                parallel(members.iter().map(StepConfig::to_step))
            }
        }
    }
}

/// `[task.<name>]` section.
///
/// Exactly one of `action`, `series`, `parallel` must be set. The remaining
/// fields parameterise the action.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskConfig {
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub action: Option<ActionKind>,

    #[serde(default)]
    pub series: Option<Vec<StepConfig>>,

    #[serde(default)]
    pub parallel: Option<Vec<StepConfig>>,

    /// Shell command for `action = "cmd"`.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Source globs; for `clean` the paths to delete.
    #[serde(default)]
    pub src: Option<Globs>,

    /// Take `src` / `dest` defaults from `[paths.<category>]`.
    #[serde(default)]
    pub category: Option<AssetCategory>,

    /// Destination directory for `copy`.
    #[serde(default)]
    pub dest: Option<String>,

    /// Output file for `concat`.
    #[serde(default)]
    pub output: Option<String>,

    /// For `copy`: skip sources that are not newer than their destination.
    #[serde(default)]
    pub newer: bool,
}

impl TaskConfig {
    /// The composite step for `series` / `parallel` tasks, `None` for leaves.
    pub fn composite_step(&self) -> Option<Step> {
        match (&self.series, &self.parallel) {
            (Some(members), _) => Some(series(members.iter().map(StepConfig::to_step))),
            (None, Some(members)) => Some(parallel(members.iter().map(StepConfig::to_step))),
            (None, None) => None,
        }
    }
}

/// `[watch.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WatchConfig {
    /// Patterns to watch; overrides `category`.
    #[serde(default)]
    pub paths: Option<Globs>,

    #[serde(default)]
    pub category: Option<AssetCategory>,

    #[serde(default)]
    pub exclude: Globs,

    /// Task to run on change. Without one, the binding only reloads.
    #[serde(default)]
    pub task: Option<String>,

    /// Notify live-reload observers after the task succeeds.
    #[serde(default)]
    pub reload: bool,

    /// Ignore events that leave the file's content unchanged.
    #[serde(default)]
    pub use_hash: bool,

    /// Per-binding debounce override.
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

/// `[server]` section: static file server plus live-reload endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_addr")]
    pub addr: String,

    /// Directory served as `/`, relative to the project root.
    #[serde(default = "default_base_dir")]
    pub base_dir: String,
}

fn default_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_base_dir() -> String {
    ".".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_addr(),
            base_dir: default_base_dir(),
        }
    }
}
