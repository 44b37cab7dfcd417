//! Extractors for ffmpeg/ffprobe diagnostic text.
//!
//! Every extractor scans one block of text (a full probe report or a single
//! `\r`-terminated progress chunk), uses the first match, and returns `None`
//! when the marker is absent. None of them fail.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Duration:\s*(\d+):(\d{1,2}):(\d{1,2})(?:\.(\d+))?").expect("valid regex")
});
static FPS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*fps").expect("valid regex"));
static FRAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"frame=\s*(\d+)").expect("valid regex"));
static BITRATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"bitrate:\s*(?:(\d+)|(N/A))").expect("valid regex"));
static DIMENSIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s+(\d+)x(\d+)").expect("valid regex"));

/// Bitrate as reported by the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bitrate {
    /// Bitrate in kb/s.
    Kbps(u64),
    /// The tool printed `N/A`.
    NotAvailable,
}

impl Bitrate {
    /// The kb/s value, or `not_available` when the tool reported `N/A`.
    pub fn kbps_or(self, not_available: u64) -> u64 {
        match self {
            Bitrate::Kbps(kbps) => kbps,
            Bitrate::NotAvailable => not_available,
        }
    }

    /// The kb/s value, if one was reported.
    pub fn kbps(self) -> Option<u64> {
        match self {
            Bitrate::Kbps(kbps) => Some(kbps),
            Bitrate::NotAvailable => None,
        }
    }
}

/// Total duration in whole seconds from `Duration: HH:MM:SS[.frac]`.
///
/// The fraction rounds half up.
///
/// ```
/// use stupff_av::extract::extract_duration;
///
/// assert_eq!(extract_duration("Duration:\t 02:17:22, start: 0.0"), Some(8242));
/// assert_eq!(extract_duration("Duration: 02:17:22.5"), Some(8243));
/// ```
pub fn extract_duration(text: &str) -> Option<u64> {
    let caps = DURATION_RE.captures(text)?;
    let hours: u64 = caps[1].parse().ok()?;
    let minutes: u64 = caps[2].parse().ok()?;
    let seconds: u64 = caps[3].parse().ok()?;
    let round_up = caps
        .get(4)
        .and_then(|frac| frac.as_str().chars().next())
        .is_some_and(|tenths| tenths >= '5');

    hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)?
        .checked_add(u64::from(round_up))
}

/// Frame rate from `<number> fps`, truncated to an integer.
pub fn extract_fps(text: &str) -> Option<u32> {
    let caps = FPS_RE.captures(text)?;
    let fps: f64 = caps[1].parse().ok()?;
    Some(fps.trunc() as u32)
}

/// Current frame index from a `frame=<n>` progress marker.
pub fn extract_frame(text: &str) -> Option<u64> {
    let caps = FRAME_RE.captures(text)?;
    caps[1].parse().ok()
}

/// Bitrate from `bitrate: <kb/s>` or `bitrate: N/A`.
///
/// `Some(Bitrate::NotAvailable)` means the tool said it does not know, which is
/// different from `None` (marker not seen yet).
pub fn extract_bitrate(text: &str) -> Option<Bitrate> {
    let caps = BITRATE_RE.captures(text)?;
    match caps.get(1) {
        Some(kbps) => kbps.as_str().parse().ok().map(Bitrate::Kbps),
        None => Some(Bitrate::NotAvailable),
    }
}

/// Width and height from the `, WxH` token of a stream line.
///
/// Lines describing a video stream are searched first so that a codec
/// parameter such as `0x31637661` on another line cannot win.
pub fn extract_dimensions(text: &str) -> Option<(u32, u32)> {
    text.lines()
        .filter(|line| line.contains("Video:"))
        .find_map(parse_dimensions)
        .or_else(|| parse_dimensions(text))
}

fn parse_dimensions(text: &str) -> Option<(u32, u32)> {
    let caps = DIMENSIONS_RE.captures(text)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}
