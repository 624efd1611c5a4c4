// src/lib.rs

pub mod cli;
pub mod compose;
pub mod config;
pub mod engine;
pub mod errors;
pub mod globs;
pub mod logging;
pub mod registry;
pub mod reload;
pub mod transform;
pub mod types;
pub mod watch;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{config_root_dir, load_and_validate, resolve_config_path, ConfigFile};
use crate::engine::{Reactor, ReactorEvent, Runner};
use crate::errors::PipelineError;
use crate::registry::{build_registry_from_config, TaskRegistry};
use crate::reload::LiveReload;
use crate::watch::{build_bindings_from_config, spawn_watcher};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and the task registry
/// - one run of the selected task
/// - (with `--watch`) the file watcher, the watch reactor, the optional
///   live-reload server, and Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = resolve_config_path(args.config.as_deref());
    let cfg = load_and_validate(&config_path)?;
    let root = config_root_dir(&config_path);

    let registry = Arc::new(build_registry_from_config(&cfg, &root)?);
    let task = args
        .task
        .clone()
        .unwrap_or_else(|| cfg.config_section().default_task.clone());

    if args.list {
        print_task_list(&registry);
        return Ok(());
    }

    if args.dry_run {
        print_dry_run(&config_path, &root, &cfg, &registry, &task)?;
        return Ok(());
    }

    let runner = Arc::new(Runner::new(registry));
    let report = runner.run(&task).await.map_err(PipelineError::Run)?;
    info!(
        task = %report.task,
        run_id = report.run_id,
        leaves = report.leaves_invoked,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "run complete"
    );

    if !args.watch {
        return Ok(());
    }

    watch_until_shutdown(&cfg, root, runner).await
}

async fn watch_until_shutdown(cfg: &ConfigFile, root: PathBuf, runner: Arc<Runner>) -> Result<()> {
    let bindings = build_bindings_from_config(cfg)?;
    if bindings.is_empty() {
        warn!("no [watch.<name>] bindings configured; nothing to watch");
        return Ok(());
    }

    let (tx, rx) = mpsc::channel::<ReactorEvent>(256);
    let reload = LiveReload::new();

    let watcher = spawn_watcher(root.clone(), &bindings, tx.clone())?;
    debug!(dirs = ?watcher.dirs(), "file watcher ready");

    // Ctrl-C → graceful shutdown.
    {
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(ReactorEvent::ShutdownRequested).await;
        });
    }

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let server = if cfg.server().enabled {
        let addr: SocketAddr = cfg
            .server()
            .addr
            .parse()
            .with_context(|| format!("invalid [server].addr '{}'", cfg.server().addr))?;
        let listener = crate::reload::server::bind(addr).await?;
        let base_dir = root.join(&cfg.server().base_dir);
        Some(tokio::spawn(crate::reload::server::serve(
            listener,
            base_dir,
            reload.clone(),
            stop_rx,
        )))
    } else {
        None
    };

    let reactor = Reactor::new(root, bindings, runner, reload, tx, rx);
    let outcome = reactor.run().await;

    let _ = stop_tx.send(true);
    if let Some(handle) = server {
        handle.await.context("live-reload server task panicked")??;
    }

    let stats = outcome?;
    info!(
        triggers = stats.triggers,
        failures = stats.failures,
        reloads = stats.reloads,
        "watch stopped"
    );
    Ok(())
}

fn print_task_list(registry: &TaskRegistry) {
    println!("tasks ({}):", registry.len());
    for name in registry.names() {
        let Ok(task) = registry.resolve(name) else {
            continue;
        };
        match task.description() {
            Some(desc) => println!("  {name:<20} {desc}"),
            None => println!("  {name:<20} {}", task.summary()),
        }
    }
}

/// Dry-run output: config summary, the selected task tree, watch bindings.
fn print_dry_run(
    config_path: &Path,
    root: &Path,
    cfg: &ConfigFile,
    registry: &TaskRegistry,
    task: &str,
) -> Result<()> {
    let section = cfg.config_section();

    println!("assetpipe dry-run");
    println!("  config = {}", config_path.display());
    println!("  root = {}", root.display());
    println!("  config.debounce_ms = {}", section.debounce_ms);
    println!(
        "  config.triggered_while_running = {:?}",
        section.triggered_while_running
    );
    println!();

    println!("task tree:");
    print!("{}", registry.describe(task)?);
    println!();

    println!("watch bindings ({}):", cfg.watch_bindings().len());
    for (name, binding) in cfg.watch_bindings() {
        println!("  - {name}");
        println!("      paths: {:?}", cfg.watch_globs(binding));
        if !binding.exclude.is_empty() {
            println!("      exclude: {:?}", binding.exclude.to_vec());
        }
        match &binding.task {
            Some(task) => println!("      task: {task}"),
            None => println!("      task: <none>"),
        }
        if binding.reload {
            println!("      reload: true");
        }
        if binding.use_hash {
            println!("      use_hash: true");
        }
        if let Some(delay) = binding.delay_ms {
            println!("      delay_ms: {delay}");
        }
    }

    let server = cfg.server();
    if server.enabled {
        println!();
        println!("server: http://{} serving {}", server.addr, server.base_dir);
    }

    Ok(())
}
