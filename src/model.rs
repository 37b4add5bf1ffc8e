use std::path::PathBuf;

use serde::{Deserialize, Deserializer};

/// Parsed output of `yt-dlp -J <url>`
#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfo {
    /// Video title, used for display and as the output file name
    #[serde(default = "unknown_title")]
    pub title: String,
    /// Thumbnail image URL, if the extractor provides one
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Every stream yt-dlp can fetch for this URL
    #[serde(default)]
    pub formats: Vec<StreamDescriptor>,
}

fn unknown_title() -> String {
    "Unknown".to_string()
}

/// One candidate audio and/or video stream reported by yt-dlp.
///
/// Numeric fields that are missing, null or not numbers decode as `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamDescriptor {
    pub format_id: String,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub height: Option<u32>,
    #[serde(default, rename = "vcodec")]
    pub video_codec: Option<String>,
    #[serde(default, rename = "acodec")]
    pub audio_codec: Option<String>,
    /// Total bitrate in kbit/s (`tbr`)
    #[serde(default, rename = "tbr", deserialize_with = "lenient_f64")]
    pub bitrate: Option<f64>,
    /// Audio bitrate in kbit/s (`abr`)
    #[serde(default, rename = "abr", deserialize_with = "lenient_f64")]
    pub audio_bitrate: Option<f64>,
}

impl StreamDescriptor {
    /// yt-dlp writes the literal `"none"` for a missing stream; an absent key is not that.
    pub fn has_video(&self) -> bool {
        self.video_codec.as_deref() != Some("none")
    }

    pub fn has_audio(&self) -> bool {
        self.audio_codec.as_deref() != Some("none")
    }

    /// Height usable as a quality key. Zero counts as unknown.
    pub fn known_height(&self) -> Option<u32> {
        self.height.filter(|h| *h > 0)
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64())
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_u64().and_then(|v| u32::try_from(v).ok()))
}

/// What to pass to `yt-dlp -f`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatSelection {
    /// One stream already carries both video and audio
    Single(String),
    /// Separate video and audio streams, merged by ffmpeg
    Paired { video: String, audio: String },
}

impl FormatSelection {
    pub fn selector(&self) -> String {
        match self {
            Self::Single(id) => id.clone(),
            Self::Paired { video, audio } => format!("{video}+{audio}"),
        }
    }
}

/// One entry of the quality menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityOption {
    /// Human-facing label, e.g. "1080p"
    pub label: String,
    pub height: u32,
    pub selection: FormatSelection,
}

/// Coarse phase reported by a single output line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Downloading,
    Merging,
    Unknown,
}

/// Information extracted from one line of yt-dlp output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadProgress {
    /// Percentage in `0.0..=100.0`; `None` when the line carries no number
    pub percent: Option<f32>,
    pub phase: ProgressPhase,
}

/// Everything a download needs, captured when the user presses Download
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub title: String,
    pub label: String,
    pub selection: FormatSelection,
    pub output_dir: PathBuf,
    pub merge_output_format: String,
}

/// Messages sent from the download task to the UI
#[derive(Debug)]
pub enum DownloadEvent {
    Progress(DownloadProgress),
    /// Absolute output folder on success
    Finished(Result<PathBuf, crate::error::AppError>),
}

/// Result of a successful quality lookup
#[derive(Debug, Clone)]
pub struct FetchedVideo {
    pub title: String,
    pub thumbnail: Option<String>,
    pub options: Vec<QualityOption>,
}

/// Represents the current state of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    /// Idle, waiting for input
    Ready,
    /// `yt-dlp -J` is running
    FetchingInfo,
    /// Download is in progress
    Downloading,
    /// ffmpeg is merging video and audio
    Merging,
    /// Download has completed successfully
    Done,
    /// Last operation ended with an error
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_for_single_and_paired() {
        assert_eq!(FormatSelection::Single("22".into()).selector(), "22");
        let paired = FormatSelection::Paired { video: "137".into(), audio: "140".into() };
        assert_eq!(paired.selector(), "137+140");
    }

    #[test]
    fn descriptor_tolerates_odd_numeric_fields() {
        let json = r#"{"format_id":"sb0","height":"n/a","vcodec":"none","acodec":"none","tbr":null,"abr":"x"}"#;
        let d: StreamDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(d.height, None);
        assert_eq!(d.bitrate, None);
        assert_eq!(d.audio_bitrate, None);
        assert!(!d.has_video());
        assert!(!d.has_audio());
    }

    #[test]
    fn absent_codec_counts_as_present() {
        let d: StreamDescriptor = serde_json::from_str(r#"{"format_id":"0","height":360}"#).unwrap();
        assert!(d.has_video());
        assert!(d.has_audio());
    }

    #[test]
    fn zero_height_is_unknown() {
        let d = StreamDescriptor { format_id: "x".into(), height: Some(0), ..Default::default() };
        assert_eq!(d.known_height(), None);
    }

    #[test]
    fn video_info_defaults_title() {
        let info: VideoInfo = serde_json::from_str(r#"{"formats":[]}"#).unwrap();
        assert_eq!(info.title, "Unknown");
        assert!(info.thumbnail.is_none());
    }
}
