//! Fallback values applied when the environment leaves a setting unset.
//!
//! # Design
//! - Keep every default in one place so docs and behaviour cannot drift.

/// Listener address used when `REELAY_BIND_ADDR` is unset.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
/// Listener port used when neither `REELAY_HTTP_PORT` nor `PORT` is set.
pub const DEFAULT_HTTP_PORT: u16 = 5000;
/// Artifact directory relative to the working directory.
pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";
/// Executable that hosts the extraction tool.
pub const DEFAULT_TOOL_PROGRAM: &str = "python";
/// Leading arguments that select the extraction tool module.
pub const DEFAULT_TOOL_ARGS: &[&str] = &["-m", "yt_dlp"];
/// Hosts that only serve split audio/video streams.
pub const DEFAULT_COMBINED_HOSTS: &[&str] = &["youtube.com", "youtu.be"];
/// Cadence of progress snapshots pushed to listeners.
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 700;
/// Log level when `REELAY_LOG_LEVEL` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";
