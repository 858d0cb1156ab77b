//! Line-oriented parser for the extraction tool's progress output.
//!
//! The tool's wording drifts between releases, so every rule here is
//! independent and anything unrecognised yields an empty update instead of an
//! error.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::ProgressUpdate;

const DESTINATION_MARKER: &str = "Destination:";
const PROGRESS_MARKER: &str = "[download]";
const MERGER_MARKER: &str = "Merging formats into";

static PERCENT: LazyLock<Regex> = LazyLock::new(|| compile(r"([\d.]+)%"));
static SPEED: LazyLock<Regex> = LazyLock::new(|| compile(r"\bat\s+([\d.]+\S+/s)"));
static ETA: LazyLock<Regex> = LazyLock::new(|| compile(r"\bETA\s+(\S+)"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("progress pattern is valid")
}

/// Parse one line of tool output into a partial update.
#[must_use]
pub fn parse_line(line: &str) -> ProgressUpdate {
    let line = line.trim();
    let mut update = ProgressUpdate::default();
    if line.is_empty() {
        return update;
    }

    if let Some((_, rest)) = line.split_once(DESTINATION_MARKER) {
        let rest = rest.trim();
        if !rest.is_empty() {
            update.destination = Some(rest.to_string());
        }
    } else if let Some((_, rest)) = line.split_once(MERGER_MARKER) {
        let rest = rest.trim().trim_matches('"');
        if !rest.is_empty() {
            update.destination = Some(rest.to_string());
        }
    }

    if line.starts_with(PROGRESS_MARKER) {
        update.percent = PERCENT
            .captures(line)
            .and_then(|caps| caps[1].parse::<f64>().ok());
        update.speed = SPEED.captures(line).map(|caps| caps[1].to_string());
        update.eta = ETA.captures(line).map(|caps| caps[1].to_string());
    }

    update
}
