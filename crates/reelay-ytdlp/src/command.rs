//! Child process construction for the extraction tool.
//!
//! Arguments are always passed as discrete argv entries; nothing is ever run
//! through a shell.

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use reelay_config::ToolSettings;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{ToolError, ToolResult};

/// Launcher for the extraction tool.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    base_args: Vec<String>,
    cookies_file: Option<PathBuf>,
    path_env: Option<OsString>,
}

/// Collected output of a run-to-completion invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Exit code; `None` when terminated by a signal.
    pub exit_code: Option<i32>,
    /// Whether the process exited successfully.
    pub success: bool,
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

impl ToolCommand {
    /// Build a launcher from configuration.
    #[must_use]
    pub fn from_settings(settings: &ToolSettings) -> Self {
        Self {
            program: settings.program.clone(),
            base_args: settings.base_args.clone(),
            cookies_file: settings.cookies_file.clone(),
            path_env: augmented_path(std::env::var_os("PATH"), &settings.extra_path),
        }
    }

    /// Program name used for spawning and diagnostics.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argument vector: base arguments, credentials, then `args`.
    #[must_use]
    pub fn argv<I, S>(&self, args: I) -> Vec<OsString>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut argv: Vec<OsString> = self.base_args.iter().map(OsString::from).collect();
        if let Some(cookies) = &self.cookies_file {
            argv.push(OsString::from("--cookies"));
            argv.push(cookies.clone().into_os_string());
        }
        argv.extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
        argv
    }

    /// Configured child process with piped output, killed when dropped.
    #[must_use]
    pub fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.argv(args))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(path) = &self.path_env {
            cmd.env("PATH", path);
        }
        cmd
    }

    /// Run to completion and collect both streams.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool cannot be spawned, its output cannot be
    /// read, or it exceeds `limit`.
    pub async fn output<I, S>(&self, args: I, limit: Option<Duration>) -> ToolResult<ToolOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut child = self
            .command(args)
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let collect = async {
            let (stdout, stderr) = tokio::join!(read_all(stdout), read_all(stderr));
            let status = child.wait().await;
            (stdout, stderr, status)
        };
        let (stdout, stderr, status) = match limit {
            Some(limit) => tokio::time::timeout(limit, collect)
                .await
                .map_err(|_| ToolError::Timeout { limit })?,
            None => collect.await,
        };

        let io_err = |operation: &'static str| {
            let program = self.program.clone();
            move |source| ToolError::Io {
                operation,
                program,
                source,
            }
        };
        let stdout = stdout.map_err(io_err("tool.read_stdout"))?;
        let stderr = stderr.map_err(io_err("tool.read_stderr"))?;
        let status = status.map_err(io_err("tool.wait"))?;
        debug!(program = %self.program, code = ?status.code(), "tool exited");

        Ok(ToolOutput {
            exit_code: status.code(),
            success: status.success(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}

async fn read_all<R: AsyncRead + Unpin>(handle: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut reader) = handle {
        reader.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// `PATH` for the child with `extra` appended, or `None` to inherit unchanged.
fn augmented_path(current: Option<OsString>, extra: &[PathBuf]) -> Option<OsString> {
    if extra.is_empty() {
        return None;
    }
    let mut paths: Vec<PathBuf> = current
        .as_deref()
        .map(|value| std::env::split_paths(value).collect())
        .unwrap_or_default();
    paths.extend(extra.iter().cloned());
    match std::env::join_paths(paths) {
        Ok(joined) => Some(joined),
        Err(err) => {
            warn!(error = %err, "ignoring extra PATH entries");
            None
        }
    }
}
