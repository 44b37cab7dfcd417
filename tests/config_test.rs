//! Integration tests for configuration loading.

use std::fs;
use std::time::Duration;
use stupff::config::{load_config, load_config_or_default, Config};
use stupff_av::ProbeBackend;
use tempfile::tempdir;

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[test]
fn load_full_config() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("stupff.toml");
    fs::write(
        &path,
        r#"
[transcode]
log_level = "warning"
poll_interval_ms = 100
probe_backend = "json"

[transcode.audio]
codec = "libvorbis"
channels = 2

[transcode.video]
codec = "libvpx"
bitrate = 800000
max_height = 720

[thumbnail]
seek_candidates = [60, 0]

[thumbnail.video]
max_width = 320
"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.transcode.log_level, "warning");
    assert_eq!(config.transcode.probe_backend, ProbeBackend::Json);
    assert_eq!(config.transcode.audio.channels, Some(2));
    assert_eq!(config.transcode.video.max_height, Some(720));
    assert_eq!(config.thumbnail.seek_candidates, vec![60, 0]);
    assert_eq!(config.thumbnail.video.max_width, Some(320));
}

#[test]
fn load_missing_file_fails() {
    let err = load_config(std::path::Path::new("/nonexistent/stupff.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn load_rejects_unknown_option() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("stupff.toml");
    fs::write(&path, "[transcode.audio]\nvolume = 3\n").unwrap();

    let err = load_config(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn load_explicit_path_wins() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("custom.toml");
    fs::write(&path, "[transcode]\nlog_level = \"quiet\"\n").unwrap();

    let config = load_config_or_default(Some(&path)).unwrap();
    assert_eq!(config.transcode.log_level, "quiet");
}

// ---------------------------------------------------------------------------
// Transcoder settings
// ---------------------------------------------------------------------------

#[test]
fn settings_use_configured_tools() {
    let temp = tempdir().unwrap();
    let ffmpeg = temp.path().join("ffmpeg");
    let ffprobe = temp.path().join("ffprobe");
    fs::write(&ffmpeg, b"").unwrap();
    fs::write(&ffprobe, b"").unwrap();

    let mut config = Config::default();
    config.tools.ffmpeg_path = Some(ffmpeg.clone());
    config.tools.ffprobe_path = Some(ffprobe.clone());
    config.transcode.poll_interval_ms = 40;
    config.thumbnail.seek_candidates = vec![3];

    let settings = config.transcoder_settings().unwrap();
    assert_eq!(settings.ffmpeg, ffmpeg);
    assert_eq!(settings.ffprobe, ffprobe);
    assert_eq!(settings.log_level, "10");
    assert_eq!(settings.poll_interval, Duration::from_millis(40));
    assert_eq!(settings.thumbnail_seeks, vec![3]);
}

#[test]
fn inspection_tool_resolves_without_ffmpeg() {
    let temp = tempdir().unwrap();
    let ffprobe = temp.path().join("ffprobe");
    fs::write(&ffprobe, b"").unwrap();

    let mut config = Config::default();
    config.tools.ffmpeg_path = Some(temp.path().join("missing-ffmpeg"));
    config.tools.ffprobe_path = Some(ffprobe.clone());

    assert_eq!(config.ffprobe_path().unwrap(), ffprobe);
}
