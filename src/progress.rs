use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{DownloadProgress, ProgressPhase};

const DOWNLOAD_MARKER: &str = "[download]";
const MERGE_MARKER: &str = "Merging formats";

static PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)%").expect("valid regex"));

/// Reads one line of yt-dlp output.
///
/// Returns `None` for lines that say nothing about progress, including a
/// `[download]` line without a percentage; callers keep their last value.
pub fn parse_progress_from_line(line: &str) -> Option<DownloadProgress> {
    if line.contains(DOWNLOAD_MARKER) {
        if let Some(percent) = first_percent(line) {
            return Some(DownloadProgress {
                percent: Some(percent),
                phase: ProgressPhase::Downloading,
            });
        }
    }
    if line.contains(MERGE_MARKER) {
        return Some(DownloadProgress { percent: None, phase: ProgressPhase::Merging });
    }
    None
}

fn first_percent(line: &str) -> Option<f32> {
    let caps = PERCENT.captures(line)?;
    let v: f32 = caps[1].parse().ok()?;
    Some(v.clamp(0.0, 100.0))
}
