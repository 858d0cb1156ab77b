//! Typed configuration sections.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Effective service configuration resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReelayConfig {
    /// HTTP listener settings.
    pub server: ServerSettings,
    /// Directory holding in-flight and completed artifacts.
    pub download_dir: PathBuf,
    /// External extraction tool invocation.
    pub tool: ToolSettings,
    /// Job scheduling and progress cadence.
    pub jobs: JobSettings,
    /// Logging preferences.
    pub logging: LoggingSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Interface to bind.
    pub bind_addr: IpAddr,
    /// Port to bind; never zero.
    pub http_port: u16,
}

impl ServerSettings {
    /// Socket address the API listener binds to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.http_port)
    }
}

/// How the extraction tool is located and invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    /// Executable to spawn.
    pub program: String,
    /// Arguments placed before every invocation-specific argument.
    pub base_args: Vec<String>,
    /// Cookie jar handed to the tool for authenticated sources.
    pub cookies_file: Option<PathBuf>,
    /// Directories appended to the child `PATH`.
    pub extra_path: Vec<PathBuf>,
    /// Hosts (and their subdomains) that require combined best-video+best-audio selection.
    pub combined_hosts: Vec<String>,
}

/// Job scheduling knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSettings {
    /// Interval between progress snapshots on the push stream.
    pub progress_interval: Duration,
    /// Upper bound on concurrently running subprocesses; `None` is unbounded.
    pub max_concurrent_jobs: Option<usize>,
    /// Subprocess watchdog; `None` lets a job run indefinitely.
    pub job_timeout: Option<Duration>,
}

/// Logging preferences forwarded to the telemetry crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Requested output format name (`json`/`pretty`); inferred when absent.
    pub format: Option<String>,
}
