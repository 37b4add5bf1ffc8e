//! Turns the raw yt-dlp format list into a quality menu.

use std::collections::HashMap;

use crate::model::{FormatSelection, QualityOption, StreamDescriptor};

/// Builds one menu entry per distinct height, best first.
///
/// A stream that already has audio competes with the best video-only stream
/// of the same height paired with the best audio-only stream. The combined
/// stream wins only when its bitrate is strictly higher than the paired video
/// stream's, so equal bitrates go to the paired selection.
pub fn resolve(descriptors: &[StreamDescriptor]) -> Vec<QualityOption> {
    let mut combined: HashMap<u32, &StreamDescriptor> = HashMap::new();
    let mut video_only: HashMap<u32, &StreamDescriptor> = HashMap::new();

    for d in descriptors {
        let Some(height) = d.known_height() else { continue };
        match (d.has_video(), d.has_audio()) {
            (true, true) => keep_best(&mut combined, height, d),
            (true, false) => keep_best(&mut video_only, height, d),
            _ => {}
        }
    }

    let best_audio = best_audio(descriptors);
    if best_audio.is_none() && !video_only.is_empty() {
        tracing::debug!(count = video_only.len(), "no audio-only stream, skipping video-only formats");
    }

    let mut merged: HashMap<u32, QualityOption> = HashMap::new();
    for (height, d) in &combined {
        merged.insert(*height, option(*height, FormatSelection::Single(d.format_id.clone())));
    }
    if let Some(audio) = best_audio {
        for (height, video) in &video_only {
            if combined.get(height).is_some_and(|c| bitrate(c) > bitrate(video)) {
                continue;
            }
            let selection = FormatSelection::Paired {
                video: video.format_id.clone(),
                audio: audio.format_id.clone(),
            };
            merged.insert(*height, option(*height, selection));
        }
    }

    let mut options: Vec<QualityOption> = merged.into_values().collect();
    options.sort_by(|a, b| b.height.cmp(&a.height));
    options
}

fn option(height: u32, selection: FormatSelection) -> QualityOption {
    QualityOption { label: format!("{height}p"), height, selection }
}

fn bitrate(d: &StreamDescriptor) -> f64 {
    d.bitrate.unwrap_or(0.0)
}

// Ties keep the first descriptor seen.
fn keep_best<'a>(map: &mut HashMap<u32, &'a StreamDescriptor>, height: u32, d: &'a StreamDescriptor) {
    match map.get(&height) {
        Some(existing) if bitrate(d) <= bitrate(existing) => {}
        _ => {
            map.insert(height, d);
        }
    }
}

fn best_audio(descriptors: &[StreamDescriptor]) -> Option<&StreamDescriptor> {
    let mut best: Option<&StreamDescriptor> = None;
    for d in descriptors.iter().filter(|d| d.has_audio() && !d.has_video()) {
        let abr = d.audio_bitrate.unwrap_or(0.0);
        if best.is_none_or(|b| abr > b.audio_bitrate.unwrap_or(0.0)) {
            best = Some(d);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combined(id: &str, height: u32, tbr: f64) -> StreamDescriptor {
        StreamDescriptor {
            format_id: id.into(),
            height: Some(height),
            video_codec: Some("avc1.64001F".into()),
            audio_codec: Some("mp4a.40.2".into()),
            bitrate: Some(tbr),
            audio_bitrate: None,
        }
    }

    fn video(id: &str, height: u32, tbr: Option<f64>) -> StreamDescriptor {
        StreamDescriptor {
            format_id: id.into(),
            height: Some(height),
            video_codec: Some("vp9".into()),
            audio_codec: Some("none".into()),
            bitrate: tbr,
            audio_bitrate: None,
        }
    }

    fn audio(id: &str, abr: Option<f64>) -> StreamDescriptor {
        StreamDescriptor {
            format_id: id.into(),
            height: None,
            video_codec: Some("none".into()),
            audio_codec: Some("opus".into()),
            bitrate: abr,
            audio_bitrate: abr,
        }
    }

    #[test]
    fn single_combined_stream() {
        let options = resolve(&[combined("22", 720, 2000.0)]);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].label, "720p");
        assert_eq!(options[0].selection, FormatSelection::Single("22".into()));
    }

    #[test]
    fn higher_video_bitrate_beats_combined() {
        let options = resolve(&[
            combined("37", 1080, 5000.0),
            video("137", 1080, Some(8000.0)),
            audio("140", Some(128.0)),
        ]);
        assert_eq!(options.len(), 1);
        assert_eq!(
            options[0].selection,
            FormatSelection::Paired { video: "137".into(), audio: "140".into() }
        );
    }

    #[test]
    fn combined_wins_when_strictly_higher() {
        let options = resolve(&[
            video("137", 1080, Some(3000.0)),
            combined("37", 1080, 5000.0),
            audio("140", Some(128.0)),
        ]);
        assert_eq!(options[0].selection, FormatSelection::Single("37".into()));
    }

    #[test]
    fn equal_bitrate_goes_to_paired() {
        let options = resolve(&[
            combined("37", 1080, 4000.0),
            video("137", 1080, Some(4000.0)),
            audio("140", Some(128.0)),
        ]);
        assert!(matches!(options[0].selection, FormatSelection::Paired { .. }));
    }

    #[test]
    fn video_only_without_audio_is_skipped() {
        let options = resolve(&[video("137", 1080, Some(8000.0)), combined("18", 360, 500.0)]);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].label, "360p");
    }

    #[test]
    fn best_audio_is_shared_by_all_pairs() {
        let options = resolve(&[
            audio("139", Some(48.0)),
            audio("251", Some(160.0)),
            audio("140", None),
            video("137", 1080, Some(4000.0)),
            video("136", 720, Some(2000.0)),
        ]);
        assert_eq!(options.len(), 2);
        for o in &options {
            let FormatSelection::Paired { audio, .. } = &o.selection else {
                panic!("expected paired selection");
            };
            assert_eq!(audio, "251");
        }
    }

    #[test]
    fn keeps_highest_bitrate_per_height() {
        let options = resolve(&[
            video("397", 480, Some(700.0)),
            video("135", 480, Some(1100.0)),
            video("244", 480, None),
            audio("140", Some(128.0)),
        ]);
        assert_eq!(
            options[0].selection,
            FormatSelection::Paired { video: "135".into(), audio: "140".into() }
        );
    }

    #[test]
    fn missing_heights_produce_nothing() {
        let mut no_height = combined("x", 0, 100.0);
        no_height.height = None;
        let options = resolve(&[no_height, combined("y", 0, 100.0), audio("140", Some(128.0))]);
        assert!(options.is_empty());
    }

    #[test]
    fn empty_input_is_empty_menu() {
        assert!(resolve(&[]).is_empty());
    }

    #[test]
    fn sorted_by_descending_height_without_duplicates() {
        let options = resolve(&[
            combined("18", 360, 500.0),
            video("137", 1080, Some(4000.0)),
            combined("22", 720, 2000.0),
            video("136", 720, Some(1500.0)),
            video("313", 2160, Some(16000.0)),
            audio("140", Some(128.0)),
        ]);
        let labels: Vec<_> = options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["2160p", "1080p", "720p", "360p"]);
        assert_eq!(options[2].selection, FormatSelection::Single("22".into()));
    }
}
