//! Metadata summary and format list normalisation.

use serde::{Deserialize, Serialize};

use crate::error::{JobError, JobResult};
use crate::format::MERGED_FORMAT_ID;

const VIDEO_CONTAINER: &str = "mp4";
const NO_CODEC: &str = "none";

/// Compact description of a media URL returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataSummary {
    /// Source-specific media identifier.
    pub id: Option<String>,
    /// Media title.
    pub title: Option<String>,
    /// Thumbnail URL.
    pub thumbnail: Option<String>,
    /// Duration in seconds.
    pub duration: Option<f64>,
    /// Uploader or channel name.
    pub uploader: Option<String>,
    /// Canonical page URL.
    pub webpage_url: Option<String>,
    /// Formats this service can download, merged entry first.
    pub formats: Vec<FormatDescriptor>,
}

/// Category of a selectable format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    /// Best video merged with best audio.
    Merged,
    /// MP4 video stream.
    Video,
    /// Audio-only stream.
    Audio,
}

/// A selectable format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatDescriptor {
    /// Identifier passed back as the download `format`.
    pub format_id: String,
    /// Container extension.
    pub ext: String,
    /// Resolution such as `720p`, or `audio`.
    pub label: String,
    /// Vertical resolution for video entries.
    pub height: Option<u32>,
    /// Size in bytes when the tool reports one.
    pub filesize: Option<u64>,
    /// Category.
    pub kind: FormatKind,
}

#[derive(Debug, Deserialize)]
struct RawInfo {
    id: Option<String>,
    title: Option<String>,
    thumbnail: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    webpage_url: Option<String>,
    #[serde(default)]
    formats: Vec<RawFormat>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    format_id: Option<String>,
    ext: Option<String>,
    height: Option<u32>,
    filesize: Option<u64>,
    filesize_approx: Option<u64>,
    format_note: Option<String>,
    acodec: Option<String>,
    vcodec: Option<String>,
}

impl RawFormat {
    fn has_codec(codec: Option<&str>) -> bool {
        codec.is_some_and(|value| !value.is_empty() && value != NO_CODEC)
    }

    fn is_noise(&self) -> bool {
        self.ext.as_deref() == Some("mhtml")
            || self
                .format_note
                .as_deref()
                .is_some_and(|note| note.to_ascii_lowercase().contains("storyboard"))
    }

    fn is_mp4_video(&self) -> bool {
        Self::has_codec(self.vcodec.as_deref()) && self.ext.as_deref() == Some(VIDEO_CONTAINER)
    }

    fn is_audio_only(&self) -> bool {
        !Self::has_codec(self.vcodec.as_deref()) && Self::has_codec(self.acodec.as_deref())
    }

    fn descriptor(&self, id: String, ext: String, kind: FormatKind) -> FormatDescriptor {
        let label = match kind {
            FormatKind::Audio => "audio".to_string(),
            FormatKind::Merged | FormatKind::Video => self.height.map_or_else(
                || {
                    self.format_note
                        .clone()
                        .unwrap_or_else(|| "video".to_string())
                },
                |height| format!("{height}p"),
            ),
        };
        FormatDescriptor {
            format_id: id,
            ext,
            label,
            height: self.height,
            filesize: self.filesize.or(self.filesize_approx),
            kind,
        }
    }
}

/// Parse the tool's `--dump-json` output into a [`MetadataSummary`].
///
/// Only the first JSON document is read, so playlist dumps describe their
/// first entry.
///
/// # Errors
///
/// Returns [`JobError::MalformedOutput`] when stdout does not start with a
/// JSON object of the expected shape.
pub fn parse_metadata(stdout: &str) -> JobResult<MetadataSummary> {
    let raw = serde_json::Deserializer::from_str(stdout)
        .into_iter::<RawInfo>()
        .next()
        .ok_or_else(|| JobError::MalformedOutput {
            operation: "metadata.parse",
            source: "tool produced no output".into(),
        })?
        .map_err(|err| JobError::MalformedOutput {
            operation: "metadata.parse",
            source: Box::new(err),
        })?;
    Ok(normalise(raw))
}

fn normalise(raw: RawInfo) -> MetadataSummary {
    let mut video: Vec<FormatDescriptor> = Vec::new();
    let mut audio: Vec<FormatDescriptor> = Vec::new();

    for format in &raw.formats {
        let (Some(id), Some(ext)) = (format.format_id.as_deref(), format.ext.as_deref()) else {
            continue;
        };
        if format.is_noise() || id == MERGED_FORMAT_ID {
            continue;
        }
        if format.is_mp4_video() {
            let entry = format.descriptor(id.to_string(), ext.to_string(), FormatKind::Video);
            upsert(&mut video, entry, |existing, new| existing.height == new.height);
        } else if format.is_audio_only() {
            let entry = format.descriptor(id.to_string(), ext.to_string(), FormatKind::Audio);
            upsert(&mut audio, entry, |existing, new| existing.ext == new.ext);
        }
    }

    video.sort_by(|a, b| b.height.cmp(&a.height));

    let mut formats = Vec::with_capacity(video.len() + audio.len() + 1);
    if let (Some(best), false) = (video.first(), audio.is_empty()) {
        formats.push(FormatDescriptor {
            format_id: MERGED_FORMAT_ID.to_string(),
            ext: VIDEO_CONTAINER.to_string(),
            label: best.label.clone(),
            height: best.height,
            filesize: None,
            kind: FormatKind::Merged,
        });
    }
    formats.extend(video);
    formats.extend(audio);

    MetadataSummary {
        id: raw.id,
        title: raw.title,
        thumbnail: raw.thumbnail,
        duration: raw.duration,
        uploader: raw.uploader,
        webpage_url: raw.webpage_url,
        formats,
    }
}

/// Later entries replace earlier duplicates in place; the tool lists formats
/// from worst to best.
fn upsert<F>(entries: &mut Vec<FormatDescriptor>, entry: FormatDescriptor, same: F)
where
    F: Fn(&FormatDescriptor, &FormatDescriptor) -> bool,
{
    if let Some(existing) = entries.iter_mut().find(|existing| same(existing, &entry)) {
        *existing = entry;
    } else {
        entries.push(entry);
    }
}
