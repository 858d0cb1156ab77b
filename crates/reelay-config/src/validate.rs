//! Parsing helpers for individual environment values.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

pub(crate) fn parse_bind_addr(field: &'static str, value: &str) -> ConfigResult<IpAddr> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, "not_an_ip_address", value))
}

pub(crate) fn parse_port(field: &'static str, value: &str) -> ConfigResult<u16> {
    let port: u16 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, "not_a_port", value))?;
    if port == 0 {
        return Err(ConfigError::invalid(field, "zero", value));
    }
    Ok(port)
}

pub(crate) fn parse_positive(field: &'static str, value: &str) -> ConfigResult<u64> {
    let parsed: u64 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, "not_a_number", value))?;
    if parsed == 0 {
        return Err(ConfigError::invalid(field, "zero", value));
    }
    Ok(parsed)
}

pub(crate) fn parse_millis(field: &'static str, value: &str) -> ConfigResult<Duration> {
    parse_positive(field, value).map(Duration::from_millis)
}

pub(crate) fn parse_secs(field: &'static str, value: &str) -> ConfigResult<Duration> {
    parse_positive(field, value).map(Duration::from_secs)
}

pub(crate) fn parse_limit(field: &'static str, value: &str) -> ConfigResult<usize> {
    let parsed = parse_positive(field, value)?;
    usize::try_from(parsed).map_err(|_| ConfigError::invalid(field, "out_of_range", value))
}

/// Split on whitespace, dropping empty segments.
pub(crate) fn split_args(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

/// Split a comma-separated host list, normalising case and leading dots.
pub(crate) fn split_hosts(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|host| host.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|host| !host.is_empty())
        .collect()
}

pub(crate) fn split_paths(value: &str) -> Vec<PathBuf> {
    std::env::split_paths(value)
        .filter(|path| !path.as_os_str().is_empty())
        .collect()
}
