//! Probing by scraping ffprobe's human-readable report.

use super::types::MediaProbe;
use crate::extract::{extract_bitrate, extract_dimensions, extract_duration, extract_fps};
use crate::tools::program_name;
use crate::{Error, Result};
use std::path::Path;
use std::process::{Command, Stdio};

/// Probe a media file by running `<ffprobe> <source>` and parsing its stderr.
pub fn probe_with_ffprobe_text(ffprobe: &Path, path: &Path) -> Result<MediaProbe> {
    let tool = program_name(ffprobe);
    let output = Command::new(ffprobe)
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

    let report = String::from_utf8_lossy(&output.stderr);
    parse_report(path, &report)
}

/// Turn an ffprobe report into a [`MediaProbe`].
pub(crate) fn parse_report(path: &Path, report: &str) -> Result<MediaProbe> {
    let (width, height) = extract_dimensions(report).ok_or_else(|| {
        Error::invalid_input(
            "ffprobe",
            None,
            format!("no video stream found in {}", path.display()),
        )
    })?;

    let probe = MediaProbe::new(path, width, height)?
        .with_bitrate(extract_bitrate(report))
        .with_duration(extract_duration(report).map(|secs| secs as f64))
        .with_frame_rate(extract_fps(report).map(f64::from));

    tracing::debug!(
        "Probed {:?}: {}x{}, {:?} fps, {:?} s, {:?} frames",
        path,
        probe.width,
        probe.height,
        probe.frame_rate,
        probe.duration_secs,
        probe.frame_count
    );

    Ok(probe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Bitrate;

    #[test]
    fn test_parse_report() {
        let report = "\
Input #0, matroska,webm, from 'clip.mkv':
  Duration: 00:01:40.00, start: 0.000000, bitrate: N/A
    Stream #0:0: Video: vp8, yuv420p, 640x360, SAR 1:1 DAR 16:9, 25 fps, 25 tbr, 1k tbn
";
        let probe = parse_report(Path::new("clip.mkv"), report).unwrap();
        assert_eq!((probe.width, probe.height), (640, 360));
        assert_eq!(probe.duration_secs, Some(100.0));
        assert_eq!(probe.frame_rate, Some(25.0));
        assert_eq!(probe.bitrate, Some(Bitrate::NotAvailable));
        assert_eq!(probe.total_frames(), Some(2500));
    }

    #[test]
    fn test_audio_only_is_invalid_input() {
        let report = "\
Input #0, mp3, from 'song.mp3':
  Duration: 00:03:00.00, start: 0.000000, bitrate: 320 kb/s
    Stream #0:0: Audio: mp3, 44100 Hz, stereo, fltp, 320 kb/s
";
        let err = parse_report(Path::new("song.mp3"), report).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidInput);
    }
}
