//! Environment lookup and credential discovery.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::defaults::{
    DEFAULT_BIND_ADDR, DEFAULT_COMBINED_HOSTS, DEFAULT_DOWNLOAD_DIR, DEFAULT_HTTP_PORT,
    DEFAULT_LOG_LEVEL, DEFAULT_PROGRESS_INTERVAL_MS, DEFAULT_TOOL_ARGS, DEFAULT_TOOL_PROGRAM,
};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{JobSettings, LoggingSettings, ReelayConfig, ServerSettings, ToolSettings};
use crate::validate::{
    parse_bind_addr, parse_limit, parse_millis, parse_port, parse_secs, split_args, split_hosts,
    split_paths,
};

/// Cookie jar locations probed in order: a local file next to the working
/// directory, then the mount point used for deployment secrets.
pub const COOKIE_CANDIDATES: &[&str] = &["cookies.txt", "/etc/secrets/cookies.txt"];

impl ReelayConfig {
    /// Resolve configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable holds an invalid value or names a missing file.
    pub fn from_env() -> ConfigResult<Self> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::from_lookup(&cwd, |name| std::env::var(name).ok())
    }

    /// Resolve configuration through `lookup`, resolving relative paths against `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable holds an invalid value or names a missing file.
    pub fn from_lookup<F>(root: &Path, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let bind_addr = parse_bind_addr(
            "REELAY_BIND_ADDR",
            get("REELAY_BIND_ADDR").as_deref().unwrap_or(DEFAULT_BIND_ADDR),
        )?;
        let http_port = match (get("REELAY_HTTP_PORT"), get("PORT")) {
            (Some(value), _) => parse_port("REELAY_HTTP_PORT", &value)?,
            (None, Some(value)) => parse_port("PORT", &value)?,
            (None, None) => DEFAULT_HTTP_PORT,
        };

        let download_dir = root.join(
            get("REELAY_DOWNLOAD_DIR").unwrap_or_else(|| DEFAULT_DOWNLOAD_DIR.to_string()),
        );

        let program = get("REELAY_TOOL_PROGRAM").unwrap_or_else(|| DEFAULT_TOOL_PROGRAM.into());
        let base_args = get("REELAY_TOOL_ARGS").map_or_else(
            || DEFAULT_TOOL_ARGS.iter().map(ToString::to_string).collect(),
            |value| split_args(&value),
        );
        let cookies_file = match get("REELAY_COOKIES_FILE") {
            Some(value) => {
                let path = root.join(&value);
                if !path.is_file() {
                    return Err(ConfigError::MissingFile {
                        field: "REELAY_COOKIES_FILE",
                        path: value,
                    });
                }
                Some(path)
            }
            None => discover_cookies_file(root, COOKIE_CANDIDATES),
        };
        let extra_path = get("REELAY_EXTRA_PATH")
            .map(|value| split_paths(&value))
            .unwrap_or_default();
        let combined_hosts = get("REELAY_COMBINED_HOSTS").map_or_else(
            || DEFAULT_COMBINED_HOSTS.iter().map(ToString::to_string).collect(),
            |value| split_hosts(&value),
        );

        let progress_interval = get("REELAY_PROGRESS_INTERVAL_MS").map_or_else(
            || Ok(std::time::Duration::from_millis(DEFAULT_PROGRESS_INTERVAL_MS)),
            |value| parse_millis("REELAY_PROGRESS_INTERVAL_MS", &value),
        )?;
        let max_concurrent_jobs = get("REELAY_MAX_CONCURRENT_JOBS")
            .map(|value| parse_limit("REELAY_MAX_CONCURRENT_JOBS", &value))
            .transpose()?;
        let job_timeout = get("REELAY_JOB_TIMEOUT_SECS")
            .map(|value| parse_secs("REELAY_JOB_TIMEOUT_SECS", &value))
            .transpose()?;

        Ok(Self {
            server: ServerSettings {
                bind_addr,
                http_port,
            },
            download_dir,
            tool: ToolSettings {
                program,
                base_args,
                cookies_file,
                extra_path,
                combined_hosts,
            },
            jobs: JobSettings {
                progress_interval,
                max_concurrent_jobs,
                job_timeout,
            },
            logging: LoggingSettings {
                level: get("REELAY_LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
                format: get("REELAY_LOG_FORMAT"),
            },
        })
    }
}

/// Return the first candidate that exists as a regular file; relative
/// candidates are resolved against `root`.
#[must_use]
pub fn discover_cookies_file(root: &Path, candidates: &[&str]) -> Option<PathBuf> {
    let found = candidates
        .iter()
        .map(|candidate| root.join(candidate))
        .find(|path| path.is_file());
    match &found {
        Some(path) => debug!(path = %path.display(), "using cookie file"),
        None => debug!("no cookie file found; authenticated sources may fail"),
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() -> ConfigResult<()> {
        let root = tempfile::tempdir().expect("tempdir");
        let config = ReelayConfig::from_lookup(root.path(), lookup(&[]))?;
        assert_eq!(config.server.http_port, 5000);
        assert_eq!(config.server.socket_addr().to_string(), "0.0.0.0:5000");
        assert_eq!(config.download_dir, root.path().join("downloads"));
        assert_eq!(config.tool.program, "python");
        assert_eq!(config.tool.base_args, vec!["-m", "yt_dlp"]);
        assert_eq!(config.tool.combined_hosts, vec!["youtube.com", "youtu.be"]);
        assert_eq!(config.jobs.progress_interval, Duration::from_millis(700));
        assert_eq!(config.jobs.max_concurrent_jobs, None);
        assert_eq!(config.jobs.job_timeout, None);
        assert_eq!(config.logging.level, "info");
        Ok(())
    }

    #[test]
    fn explicit_values_override_defaults() -> ConfigResult<()> {
        let root = tempfile::tempdir().expect("tempdir");
        let config = ReelayConfig::from_lookup(
            root.path(),
            lookup(&[
                ("REELAY_BIND_ADDR", "127.0.0.1"),
                ("PORT", "9000"),
                ("REELAY_DOWNLOAD_DIR", "/srv/media"),
                ("REELAY_TOOL_PROGRAM", "yt-dlp"),
                ("REELAY_TOOL_ARGS", ""),
                ("REELAY_COMBINED_HOSTS", "vimeo.com"),
                ("REELAY_PROGRESS_INTERVAL_MS", "100"),
                ("REELAY_MAX_CONCURRENT_JOBS", "2"),
                ("REELAY_JOB_TIMEOUT_SECS", "600"),
                ("REELAY_LOG_FORMAT", "json"),
            ]),
        )?;
        assert_eq!(config.server.socket_addr().to_string(), "127.0.0.1:9000");
        assert_eq!(config.download_dir, PathBuf::from("/srv/media"));
        assert_eq!(config.tool.program, "yt-dlp");
        assert_eq!(config.tool.base_args, vec!["-m", "yt_dlp"]);
        assert_eq!(config.tool.combined_hosts, vec!["vimeo.com"]);
        assert_eq!(config.jobs.max_concurrent_jobs, Some(2));
        assert_eq!(config.jobs.job_timeout, Some(Duration::from_secs(600)));
        assert_eq!(config.logging.format.as_deref(), Some("json"));
        Ok(())
    }

    #[test]
    fn http_port_takes_precedence_over_port() -> ConfigResult<()> {
        let root = tempfile::tempdir().expect("tempdir");
        let config = ReelayConfig::from_lookup(
            root.path(),
            lookup(&[("REELAY_HTTP_PORT", "7000"), ("PORT", "9000")]),
        )?;
        assert_eq!(config.server.http_port, 7000);
        Ok(())
    }

    #[test]
    fn invalid_values_are_rejected() {
        let root = tempfile::tempdir().expect("tempdir");
        let err = ReelayConfig::from_lookup(root.path(), lookup(&[("PORT", "0")]))
            .expect_err("zero port");
        assert!(matches!(
            err,
            ConfigError::InvalidField { field: "PORT", .. }
        ));

        let err = ReelayConfig::from_lookup(
            root.path(),
            lookup(&[("REELAY_COOKIES_FILE", "missing.txt")]),
        )
        .expect_err("missing cookie file");
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn cookie_discovery_prefers_local_file() -> ConfigResult<()> {
        let root = tempfile::tempdir().expect("tempdir");
        assert_eq!(discover_cookies_file(root.path(), &["cookies.txt"]), None);

        let local = root.path().join("cookies.txt");
        std::fs::write(&local, "# Netscape HTTP Cookie File\n").expect("write cookies");
        let secret_dir = root.path().join("secrets");
        std::fs::create_dir(&secret_dir).expect("secret dir");
        let secret = secret_dir.join("cookies.txt");
        std::fs::write(&secret, "").expect("write secret");

        let found = discover_cookies_file(
            root.path(),
            &["cookies.txt", secret.to_str().expect("utf-8 path")],
        );
        assert_eq!(found, Some(local.clone()));

        let config = ReelayConfig::from_lookup(root.path(), lookup(&[]))?;
        assert_eq!(config.tool.cookies_file, Some(local));
        Ok(())
    }
}
