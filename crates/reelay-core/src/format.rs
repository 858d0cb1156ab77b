//! Format-selection policy for extraction jobs.

use url::Url;

/// Selector that requests audio extraction to MP3.
pub const AUDIO_FORMAT: &str = "mp3";

/// Identifier of the synthetic best-video plus best-audio entry offered by metadata.
pub const MERGED_FORMAT_ID: &str = "merged";

const COMBINED_SELECTOR: &str = "bestvideo+bestaudio/best";
const MERGE_CONTAINER: &str = "mp4";

/// Resolved format arguments for one extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatPlan {
    /// Expression passed to `-f`.
    pub selector: String,
    /// Whether audio is extracted and transcoded instead of merged.
    pub audio_only: bool,
}

impl FormatPlan {
    /// Apply the selection precedence: audio extraction, then hosts that need
    /// combined streams, then an explicit selector, then the combined default.
    #[must_use]
    pub fn resolve(url: &str, format: Option<&str>, combined_hosts: &[String]) -> Self {
        let format = format
            .map(str::trim)
            .filter(|value| !value.is_empty() && *value != MERGED_FORMAT_ID);

        if format.is_some_and(|value| value.eq_ignore_ascii_case(AUDIO_FORMAT)) {
            return Self {
                selector: "bestaudio".to_string(),
                audio_only: true,
            };
        }

        let selector = match format {
            _ if host_requires_combined(url, combined_hosts) => COMBINED_SELECTOR.to_string(),
            Some(value) => format!("{value}+bestaudio/best"),
            None => COMBINED_SELECTOR.to_string(),
        };
        Self {
            selector,
            audio_only: false,
        }
    }

    /// Tool arguments encoding this plan.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["-f".to_string(), self.selector.clone()];
        if self.audio_only {
            args.extend(
                ["-x", "--audio-format", AUDIO_FORMAT, "--audio-quality", "0"]
                    .map(str::to_string),
            );
        } else {
            args.extend(["--merge-output-format", MERGE_CONTAINER].map(str::to_string));
        }
        args
    }
}

/// Whether `url` belongs to one of `hosts` or a subdomain of one.
#[must_use]
pub fn host_requires_combined(url: &str, hosts: &[String]) -> bool {
    let Some(host) = Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
    else {
        return false;
    };
    hosts.iter().any(|candidate| {
        let candidate = candidate.trim_start_matches('.');
        host == candidate
            || host
                .strip_suffix(candidate)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts() -> Vec<String> {
        vec!["youtube.com".to_string(), "youtu.be".to_string()]
    }

    #[test]
    fn mp3_wins_over_everything() {
        let plan = FormatPlan::resolve("https://www.youtube.com/watch?v=x", Some("mp3"), &hosts());
        assert!(plan.audio_only);
        assert_eq!(
            plan.args(),
            vec!["-f", "bestaudio", "-x", "--audio-format", "mp3", "--audio-quality", "0"]
        );
    }

    #[test]
    fn combined_hosts_ignore_selector() {
        let plan = FormatPlan::resolve("https://m.youtube.com/watch?v=x", Some("137"), &hosts());
        assert_eq!(plan.selector, "bestvideo+bestaudio/best");
        assert_eq!(
            plan.args(),
            vec!["-f", "bestvideo+bestaudio/best", "--merge-output-format", "mp4"]
        );
    }

    #[test]
    fn explicit_selector_pairs_with_best_audio() {
        let plan = FormatPlan::resolve("https://example.com/video", Some("22"), &hosts());
        assert_eq!(plan.selector, "22+bestaudio/best");
        assert!(!plan.audio_only);
    }

    #[test]
    fn missing_or_merged_selector_uses_default() {
        for format in [None, Some(""), Some("merged")] {
            let plan = FormatPlan::resolve("https://example.com/video", format, &hosts());
            assert_eq!(plan.selector, "bestvideo+bestaudio/best");
        }
    }

    #[test]
    fn host_matching_respects_label_boundaries() {
        assert!(host_requires_combined("https://youtu.be/abc", &hosts()));
        assert!(host_requires_combined("https://www.YouTube.com/x", &hosts()));
        assert!(!host_requires_combined("https://notyoutube.com/x", &hosts()));
        assert!(!host_requires_combined("not a url", &hosts()));
    }
}
