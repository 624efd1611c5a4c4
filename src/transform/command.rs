// src/transform/command.rs

//! Shell command leaf action.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::registry::{Action, ActionFuture};

const STDERR_TAIL_LINES: usize = 10;

/// Run `cmd` through the platform shell in `cwd`.
///
/// Stdout is logged at `info`, stderr at `debug`. A non-zero exit status is
/// a failure whose message ends with the last lines of stderr. The child is
/// killed if the run is dropped.
#[derive(Debug, Clone)]
pub struct CommandAction {
    cmd: String,
    cwd: PathBuf,
}

impl CommandAction {
    pub fn new(cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            cmd: cmd.into(),
            cwd: cwd.into(),
        }
    }

    async fn run(&self) -> Result<()> {
        debug!(cmd = %self.cmd, cwd = %self.cwd.display(), "spawning command");

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        };

        cmd.current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning `{}`", self.cmd))?;

        // Always consume both pipes so buffers don't fill.
        let stdout_task = child.stdout.take().map(|stdout| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!("stdout: {}", line);
                }
            })
        });
        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("stderr: {}", line);
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                tail
            })
        });

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for `{}`", self.cmd))?;

        if let Some(task) = stdout_task {
            let _ = task.await;
        }
        let stderr_tail = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => VecDeque::new(),
        };

        if status.success() {
            return Ok(());
        }

        let mut message = match status.code() {
            Some(code) => format!("command `{}` exited with status {code}", self.cmd),
            None => format!("command `{}` was terminated by a signal", self.cmd),
        };
        if !stderr_tail.is_empty() {
            message.push_str("\nstderr:");
            for line in &stderr_tail {
                message.push_str("\n  ");
                message.push_str(line);
            }
        }
        bail!(message)
    }
}

impl Action for CommandAction {
    fn call(&self) -> ActionFuture<'_> {
        Box::pin(self.run())
    }

    fn describe(&self) -> String {
        format!("cmd: {}", self.cmd)
    }
}
