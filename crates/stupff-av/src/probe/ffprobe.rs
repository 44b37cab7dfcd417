//! FFprobe JSON-based media probing.

use super::types::MediaProbe;
use crate::extract::Bitrate;
use crate::tools::program_name;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::{Command, Stdio};

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
    nb_frames: Option<String>,
}

/// Probe a media file using ffprobe's JSON output.
pub fn probe_with_ffprobe_json(ffprobe: &Path, path: &Path) -> Result<MediaProbe> {
    let tool = program_name(ffprobe);
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found(&tool)
            } else {
                Error::Io(e)
            }
        })?;

    if !output.status.success() {
        return Err(Error::from_exit_code(tool, output.status.code()));
    }

    let json_str = String::from_utf8(output.stdout)
        .map_err(|e| Error::parse_error(&tool, format!("Invalid UTF-8: {}", e)))?;

    let ff_output: FfprobeOutput = serde_json::from_str(&json_str)?;

    parse_ffprobe_output(path, ff_output)
}

fn parse_ffprobe_output(path: &Path, output: FfprobeOutput) -> Result<MediaProbe> {
    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| {
            Error::invalid_input(
                "ffprobe",
                None,
                format!("no video stream found in {}", path.display()),
            )
        })?;

    let format = output.format.as_ref();
    let duration = video
        .duration
        .as_deref()
        .or_else(|| format.and_then(|f| f.duration.as_deref()))
        .and_then(|s| s.parse::<f64>().ok());
    let bitrate = format.and_then(|f| f.bit_rate.as_deref()).map(|s| {
        s.parse::<u64>()
            .map(|bps| Bitrate::Kbps(bps / 1000))
            .unwrap_or(Bitrate::NotAvailable)
    });
    let frame_rate = video
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| video.avg_frame_rate.as_deref().and_then(parse_frame_rate));

    Ok(
        MediaProbe::new(path, video.width.unwrap_or(0), video.height.unwrap_or(0))?
            .with_frame_count(video.nb_frames.as_deref().and_then(|s| s.parse().ok()))
            .with_bitrate(bitrate)
            .with_duration(duration)
            .with_frame_rate(frame_rate),
    )
}

fn parse_frame_rate(rate_str: &str) -> Option<f64> {
    let parts: Vec<&str> = rate_str.split('/').collect();
    if parts.len() == 2 {
        let num: f64 = parts[0].parse().ok()?;
        let den: f64 = parts[1].parse().ok()?;
        if den != 0.0 {
            return Some(num / den);
        }
        return None;
    }
    rate_str.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("24000/1001"), Some(23.976023976023978));
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("invalid"), None);
    }

    #[test]
    fn test_parse_output_grouped_by_stream() {
        let json = r#"{
            "streams": [
                {"codec_type": "audio", "duration": "60.0"},
                {"codec_type": "video", "width": 1280, "height": 720,
                 "r_frame_rate": "30/1", "duration": "10.0"}
            ],
            "format": {"duration": "10.5", "bit_rate": "2500000"}
        }"#;
        let output: FfprobeOutput = serde_json::from_str(json).unwrap();
        let probe = parse_ffprobe_output(Path::new("clip.mp4"), output).unwrap();

        assert_eq!((probe.width, probe.height), (1280, 720));
        assert_eq!(probe.duration_secs, Some(10.0));
        assert_eq!(probe.bitrate, Some(Bitrate::Kbps(2500)));
        assert_eq!(probe.total_frames(), Some(300));
    }

    #[test]
    fn test_reported_frames_used() {
        let json = r#"{"streams": [{"codec_type": "video", "width": 640, "height": 480,
            "r_frame_rate": "25/1", "nb_frames": "1234"}]}"#;
        let output: FfprobeOutput = serde_json::from_str(json).unwrap();
        let probe = parse_ffprobe_output(Path::new("clip.mp4"), output).unwrap();
        assert_eq!(probe.total_frames(), Some(1234));
    }

    #[test]
    fn test_missing_video_stream() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "3.0"}}"#;
        let output: FfprobeOutput = serde_json::from_str(json).unwrap();
        let err = parse_ffprobe_output(Path::new("song.flac"), output).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }
}
