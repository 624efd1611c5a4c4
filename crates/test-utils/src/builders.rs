#![allow(dead_code)]

use assetpipe::config::{
    ActionKind, ConfigFile, Globs, PathMapping, RawConfigFile, StepConfig, TaskConfig,
    WatchConfig,
};
use assetpipe::types::{AssetCategory, TriggeredWhileRunning};

fn globs(patterns: &[&str]) -> Globs {
    Globs::from(patterns.iter().map(|p| p.to_string()).collect::<Vec<_>>())
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_paths(mut self, category: AssetCategory, src: &[&str], dest: Option<&str>) -> Self {
        self.config.paths.insert(
            category,
            PathMapping {
                src: globs(src),
                watch: None,
                dest: dest.map(str::to_string),
            },
        );
        self
    }

    pub fn with_watch(mut self, name: &str, watch: WatchConfig) -> Self {
        self.config.watch.insert(name.to_string(), watch);
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.config.debounce_ms = ms;
        self
    }

    pub fn triggered_while_running(mut self, behaviour: TriggeredWhileRunning) -> Self {
        self.config.config.triggered_while_running = behaviour;
        self
    }

    /// The unvalidated config, for tests that expect validation to fail.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn cmd(cmd: &str) -> Self {
        Self::action(ActionKind::Cmd).with(|t| t.cmd = Some(cmd.to_string()))
    }

    pub fn copy(src: &[&str], dest: &str) -> Self {
        Self::action(ActionKind::Copy).with(|t| {
            t.src = Some(globs(src));
            t.dest = Some(dest.to_string());
        })
    }

    pub fn concat(src: &[&str], output: &str) -> Self {
        Self::action(ActionKind::Concat).with(|t| {
            t.src = Some(globs(src));
            t.output = Some(output.to_string());
        })
    }

    pub fn clean(src: &[&str]) -> Self {
        Self::action(ActionKind::Clean).with(|t| t.src = Some(globs(src)))
    }

    pub fn action(kind: ActionKind) -> Self {
        Self {
            task: TaskConfig {
                action: Some(kind),
                ..TaskConfig::default()
            },
        }
    }

    pub fn series(members: &[&str]) -> Self {
        Self {
            task: TaskConfig {
                series: Some(names(members)),
                ..TaskConfig::default()
            },
        }
    }

    pub fn parallel(members: &[&str]) -> Self {
        Self {
            task: TaskConfig {
                parallel: Some(names(members)),
                ..TaskConfig::default()
            },
        }
    }

    pub fn category(self, category: AssetCategory) -> Self {
        self.with(|t| t.category = Some(category))
    }

    pub fn newer(self, newer: bool) -> Self {
        self.with(|t| t.newer = newer)
    }

    pub fn description(self, text: &str) -> Self {
        self.with(|t| t.description = Some(text.to_string()))
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }

    fn with(mut self, f: impl FnOnce(&mut TaskConfig)) -> Self {
        f(&mut self.task);
        self
    }
}

fn names(members: &[&str]) -> Vec<StepConfig> {
    members
        .iter()
        .map(|m| StepConfig::Name(m.to_string()))
        .collect()
}

/// Builder for `WatchConfig`.
pub struct WatchConfigBuilder {
    watch: WatchConfig,
}

impl WatchConfigBuilder {
    pub fn paths(patterns: &[&str]) -> Self {
        Self {
            watch: WatchConfig {
                paths: Some(globs(patterns)),
                ..WatchConfig::default()
            },
        }
    }

    pub fn category(category: AssetCategory) -> Self {
        Self {
            watch: WatchConfig {
                category: Some(category),
                ..WatchConfig::default()
            },
        }
    }

    pub fn task(mut self, task: &str) -> Self {
        self.watch.task = Some(task.to_string());
        self
    }

    pub fn reload(mut self, reload: bool) -> Self {
        self.watch.reload = reload;
        self
    }

    pub fn exclude(mut self, patterns: &[&str]) -> Self {
        self.watch.exclude = globs(patterns);
        self
    }

    pub fn use_hash(mut self, use_hash: bool) -> Self {
        self.watch.use_hash = use_hash;
        self
    }

    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.watch.delay_ms = Some(ms);
        self
    }

    pub fn build(self) -> WatchConfig {
        self.watch
    }
}
