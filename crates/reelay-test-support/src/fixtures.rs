//! Test fixtures and environment helpers.

use std::path::Path;

/// Interpreter used to run the fake extraction tool.
pub(crate) const SHELL: &str = "/bin/sh";

/// Metadata document emitted by the fake tool in `--dump-json` mode: one MP4
/// video-only stream, one audio-only stream and one `WebM` video stream.
pub const SAMPLE_INFO_JSON: &str = r#"{"id":"abc123","title":"Sample clip","thumbnail":"https://img.example.com/abc123.jpg","duration":63,"uploader":"Reelay Tests","webpage_url":"https://example.com/watch/abc123","formats":[{"format_id":"137","ext":"mp4","height":1080,"vcodec":"avc1.640028","acodec":"none","filesize":1048576},{"format_id":"140","ext":"m4a","vcodec":"none","acodec":"mp4a.40.2","filesize":65536},{"format_id":"248","ext":"webm","height":1080,"vcodec":"vp9","acodec":"none"}]}"#;

/// Returns `true` if a POSIX shell is available to run the fake tool.
#[must_use]
pub fn shell_available() -> bool {
    Path::new(SHELL).exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_info_is_single_line() {
        assert!(!SAMPLE_INFO_JSON.contains('\n'));
        assert!(SAMPLE_INFO_JSON.starts_with('{'));
    }
}
