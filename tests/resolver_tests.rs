use std::collections::HashSet;

use universal_video_downloader::downloader::parse_video_info;
use universal_video_downloader::formats::resolve;
use universal_video_downloader::model::{FormatSelection, QualityOption, StreamDescriptor};

// Trimmed `yt-dlp -J` output for a typical YouTube video
const YOUTUBE_SAMPLE: &str = r#"{
  "id": "abc123",
  "title": "Big Buck Bunny",
  "thumbnail": "https://i.ytimg.com/vi/abc123/maxresdefault.jpg",
  "formats": [
    {"format_id": "sb0", "format_note": "storyboard", "ext": "mhtml", "vcodec": "none", "acodec": "none", "height": 45},
    {"format_id": "139", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.5", "abr": 48.8, "tbr": 48.8},
    {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2", "abr": 129.5, "tbr": 129.5},
    {"format_id": "251", "ext": "webm", "vcodec": "none", "acodec": "opus", "abr": 135.1, "tbr": 135.1},
    {"format_id": "18", "ext": "mp4", "vcodec": "avc1.42001E", "acodec": "mp4a.40.2", "height": 360, "tbr": 510.2},
    {"format_id": "134", "ext": "mp4", "vcodec": "avc1.4D401E", "acodec": "none", "height": 360, "tbr": 300.0},
    {"format_id": "22", "ext": "mp4", "vcodec": "avc1.64001F", "acodec": "mp4a.40.2", "height": 720, "tbr": 2100.0},
    {"format_id": "136", "ext": "mp4", "vcodec": "avc1.4d401f", "acodec": "none", "height": 720, "tbr": 1900.0},
    {"format_id": "247", "ext": "webm", "vcodec": "vp9", "acodec": "none", "height": 720, "tbr": 1400.0},
    {"format_id": "137", "ext": "mp4", "vcodec": "avc1.640028", "acodec": "none", "height": 1080, "tbr": 4300.0},
    {"format_id": "248", "ext": "webm", "vcodec": "vp9", "acodec": "none", "height": 1080, "tbr": null},
    {"format_id": "313", "ext": "webm", "vcodec": "vp9", "acodec": "none", "height": 2160, "tbr": 17800.0}
  ]
}"#;

fn assert_menu_invariants(options: &[QualityOption]) {
    let labels: HashSet<_> = options.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels.len(), options.len(), "duplicate labels in {options:?}");
    assert!(options.windows(2).all(|w| w[0].height >= w[1].height), "not sorted: {options:?}");
    for o in options {
        assert_eq!(o.label, format!("{}p", o.height));
    }
}

#[test]
fn youtube_sample_menu() {
    let info = parse_video_info(YOUTUBE_SAMPLE.as_bytes()).expect("valid metadata");
    assert_eq!(info.title, "Big Buck Bunny");
    assert!(info.thumbnail.is_some());

    let options = resolve(&info.formats);
    assert_menu_invariants(&options);

    let labels: Vec<_> = options.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, vec!["2160p", "1080p", "720p", "360p"]);

    // Storyboard never becomes an entry even though it has a height
    assert!(options.iter().all(|o| o.height != 45));

    assert_eq!(
        options[0].selection,
        FormatSelection::Paired { video: "313".into(), audio: "251".into() }
    );
    assert_eq!(
        options[1].selection,
        FormatSelection::Paired { video: "137".into(), audio: "251".into() }
    );
    // 2100 > 1900: the progressive stream is kept
    assert_eq!(options[2].selection, FormatSelection::Single("22".into()));
    assert_eq!(options[3].selection, FormatSelection::Single("18".into()));
}

#[test]
fn selectors_for_download() {
    let info = parse_video_info(YOUTUBE_SAMPLE.as_bytes()).unwrap();
    let selectors: Vec<_> = resolve(&info.formats).iter().map(|o| o.selection.selector()).collect();
    assert_eq!(selectors, vec!["313+251", "137+251", "22", "18"]);
}

#[test]
fn audio_only_site_has_no_qualities() {
    let json = r#"{"title":"podcast","formats":[
        {"format_id":"mp3","vcodec":"none","acodec":"mp3","abr":128},
        {"format_id":"opus","vcodec":"none","acodec":"opus","abr":96}
    ]}"#;
    let info = parse_video_info(json.as_bytes()).unwrap();
    assert!(resolve(&info.formats).is_empty());
}

#[test]
fn menu_invariants_hold_for_mixed_inputs() {
    let heights = [144, 240, 360, 480, 720, 1080, 1440, 2160];
    let mut descriptors = Vec::new();
    for (i, h) in heights.iter().cycle().take(40).enumerate() {
        let has_audio = i % 3 == 0;
        descriptors.push(StreamDescriptor {
            format_id: format!("f{i}"),
            height: if i % 7 == 0 { None } else { Some(*h) },
            video_codec: Some("avc1".into()),
            audio_codec: Some(if has_audio { "mp4a".into() } else { "none".into() }),
            bitrate: if i % 5 == 0 { None } else { Some((i * 97 % 1000) as f64) },
            audio_bitrate: None,
        });
        if i % 11 == 0 {
            descriptors.push(StreamDescriptor {
                format_id: format!("a{i}"),
                height: None,
                video_codec: Some("none".into()),
                audio_codec: Some("opus".into()),
                bitrate: None,
                audio_bitrate: Some(i as f64),
            });
        }
    }

    for len in 0..=descriptors.len() {
        assert_menu_invariants(&resolve(&descriptors[..len]));
    }
}
