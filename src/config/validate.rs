use std::collections::BTreeMap;

use crate::compose::{registration_order, Step};
use crate::config::model::{
    resolve_dest, resolve_sources, resolve_watch_globs, ActionKind, ConfigFile, RawConfigFile,
    TaskConfig,
};
use crate::errors::{PipelineError, Result};
use crate::globs::build_globset;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_leaf_tasks(cfg)?;
    validate_composites(cfg)?;
    validate_watch_bindings(cfg)?;
    Ok(())
}

fn config_error(msg: String) -> PipelineError {
    PipelineError::ConfigError(msg)
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(config_error(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_leaf_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        let kinds = [
            task.action.is_some(),
            task.series.is_some(),
            task.parallel.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();

        if kinds != 1 {
            return Err(config_error(format!(
                "task '{name}' must set exactly one of `action`, `series` or `parallel`"
            )));
        }

        if let Some(category) = task.category {
            if !cfg.paths.contains_key(&category) {
                return Err(config_error(format!(
                    "task '{name}' uses category '{category}' but [paths.{category}] is not defined"
                )));
            }
        }

        if let Some(action) = task.action {
            validate_action_fields(cfg, name, action, task)?;
        }
    }
    Ok(())
}

fn validate_action_fields(
    cfg: &RawConfigFile,
    name: &str,
    action: ActionKind,
    task: &TaskConfig,
) -> Result<()> {
    let sources = resolve_sources(&cfg.paths, task);

    match action {
        ActionKind::Cmd => {
            if task.cmd.as_deref().is_none_or(|c| c.trim().is_empty()) {
                return Err(config_error(format!(
                    "task '{name}' has action \"cmd\" but no `cmd`"
                )));
            }
        }
        ActionKind::Clean | ActionKind::Copy | ActionKind::Concat => {
            if sources.is_empty() {
                return Err(config_error(format!(
                    "task '{name}' needs `src` (or a `category` with `src`)"
                )));
            }
            build_globset(&sources).map_err(|e| {
                config_error(format!("task '{name}' has an invalid `src` pattern: {e:#}"))
            })?;
        }
    }

    if action == ActionKind::Copy && resolve_dest(&cfg.paths, task).is_none() {
        return Err(config_error(format!(
            "task '{name}' has action \"copy\" but no `dest` (or a `category` with `dest`)"
        )));
    }

    if action == ActionKind::Concat && task.output.is_none() {
        return Err(config_error(format!(
            "task '{name}' has action \"concat\" but no `output`"
        )));
    }

    Ok(())
}

fn validate_composites(cfg: &RawConfigFile) -> Result<()> {
    let mut composites: BTreeMap<String, Step> = BTreeMap::new();

    for (name, task) in cfg.task.iter() {
        let Some(step) = task.composite_step() else {
            continue;
        };

        step.validate_non_empty()
            .map_err(|reason| PipelineError::InvalidComposite {
                name: name.clone(),
                reason,
            })?;

        for member in step.referenced_tasks() {
            if !cfg.task.contains_key(member) {
                return Err(config_error(format!(
                    "task '{name}' references unknown task '{member}'"
                )));
            }
        }

        composites.insert(name.clone(), step);
    }

    // Fails with TaskCycle on self-references and loops.
    registration_order(&composites)?;
    Ok(())
}

fn validate_watch_bindings(cfg: &RawConfigFile) -> Result<()> {
    for (name, binding) in cfg.watch.iter() {
        if let Some(category) = binding.category {
            if !cfg.paths.contains_key(&category) {
                return Err(config_error(format!(
                    "watch binding '{name}' uses category '{category}' but [paths.{category}] is not defined"
                )));
            }
        }

        let globs = resolve_watch_globs(&cfg.paths, binding);
        if globs.is_empty() {
            return Err(config_error(format!(
                "watch binding '{name}' needs `paths` (or a `category`)"
            )));
        }

        if let Some(task) = &binding.task {
            if !cfg.task.contains_key(task) {
                return Err(config_error(format!(
                    "watch binding '{name}' references unknown task '{task}'"
                )));
            }
        } else if !binding.reload {
            return Err(config_error(format!(
                "watch binding '{name}' has neither a `task` nor `reload = true`"
            )));
        }
    }
    Ok(())
}
