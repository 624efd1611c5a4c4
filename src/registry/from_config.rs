// src/registry/from_config.rs

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::compose::Step;
use crate::config::model::{ActionKind, ConfigFile, TaskConfig};
use crate::errors::{PipelineError, Result};
use crate::registry::{Action, Task, TaskRegistry};
use crate::transform::{Clean, CommandAction, FilePipeline};

/// Build a registry from a validated config.
///
/// Leaf tasks become built-in actions rooted at `root` (the directory all
/// config paths are relative to). Composites are registered afterwards in
/// dependency order.
pub fn build_registry_from_config(cfg: &ConfigFile, root: &Path) -> Result<TaskRegistry> {
    let mut registry = TaskRegistry::new();
    let mut composites: BTreeMap<String, Step> = BTreeMap::new();

    for (name, task) in cfg.tasks() {
        if let Some(step) = task.composite_step() {
            composites.insert(name.clone(), step);
            continue;
        }

        let action = leaf_action(cfg, name, task, root)?;
        debug!(task = %name, action = %action.describe(), "built leaf action");
        registry.insert(Task::leaf(name.clone(), action).with_description(task.description.clone()))?;
    }

    registry.register_described_composites(composites, |name| {
        cfg.tasks().get(name).and_then(|t| t.description.clone())
    })?;

    Ok(registry)
}

fn leaf_action(
    cfg: &ConfigFile,
    name: &str,
    task: &TaskConfig,
    root: &Path,
) -> Result<Arc<dyn Action>> {
    let Some(kind) = task.action else {
        return Err(PipelineError::ConfigError(format!(
            "task '{name}' is neither an action nor a composite"
        )));
    };

    let missing = |field: &str| {
        PipelineError::ConfigError(format!("task '{name}' is missing `{field}`"))
    };

    let action: Arc<dyn Action> = match kind {
        ActionKind::Cmd => {
            let cmd = task.cmd.clone().ok_or_else(|| missing("cmd"))?;
            Arc::new(CommandAction::new(cmd, root))
        }
        ActionKind::Clean => Arc::new(Clean::new(root, cfg.task_sources(task))),
        ActionKind::Copy => {
            let dest = cfg.task_dest(task).ok_or_else(|| missing("dest"))?;
            Arc::new(FilePipeline::copy(root, cfg.task_sources(task), dest).newer(task.newer))
        }
        ActionKind::Concat => {
            let output = task.output.clone().ok_or_else(|| missing("output"))?;
            Arc::new(FilePipeline::concat(root, cfg.task_sources(task), output))
        }
    };
    Ok(action)
}
