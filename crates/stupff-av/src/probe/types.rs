//! Probe result types.

use crate::extract::Bitrate;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Format metadata of one media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaProbe {
    /// Path to the media file.
    pub file_path: PathBuf,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Frame rate in FPS.
    pub frame_rate: Option<f64>,
    /// Duration in seconds.
    pub duration_secs: Option<f64>,
    /// Overall bitrate.
    pub bitrate: Option<Bitrate>,
    /// Total number of frames, reported or derived from duration and rate.
    pub frame_count: Option<u64>,
    #[serde(skip)]
    reported_frames: bool,
}

impl MediaProbe {
    /// Create a probe result for a file with the given video dimensions.
    ///
    /// # Errors
    ///
    /// Zero width or height means the file has no usable video stream.
    pub fn new<P: AsRef<Path>>(path: P, width: u32, height: u32) -> Result<Self> {
        let path = path.as_ref();
        if width == 0 || height == 0 {
            return Err(Error::invalid_input(
                "probe",
                None,
                format!("{} has no usable video stream ({}x{})", path.display(), width, height),
            ));
        }

        Ok(Self {
            file_path: path.to_path_buf(),
            width,
            height,
            frame_rate: None,
            duration_secs: None,
            bitrate: None,
            frame_count: None,
            reported_frames: false,
        })
    }

    /// Set the frame rate; non-positive or non-finite rates count as unknown.
    pub fn with_frame_rate(mut self, fps: Option<f64>) -> Self {
        self.frame_rate = fps.filter(|f| f.is_finite() && *f > 0.0);
        self.derive_frame_count();
        self
    }

    /// Set the duration; negative or non-finite durations count as unknown.
    pub fn with_duration(mut self, secs: Option<f64>) -> Self {
        self.duration_secs = secs.filter(|d| d.is_finite() && *d >= 0.0);
        self.derive_frame_count();
        self
    }

    /// Set the bitrate.
    pub fn with_bitrate(mut self, bitrate: Option<Bitrate>) -> Self {
        self.bitrate = bitrate;
        self
    }

    /// Set the frame count reported by the prober.
    ///
    /// A reported count always wins over the derived one.
    pub fn with_frame_count(mut self, frames: Option<u64>) -> Self {
        if frames.is_some() {
            self.frame_count = frames;
            self.reported_frames = true;
        }
        self
    }

    /// Total frames, required before a percentage can be computed.
    pub fn total_frames(&self) -> Option<u64> {
        self.frame_count
    }

    /// Bitrate in kb/s when one is known.
    pub fn bitrate_kbps(&self) -> Option<u64> {
        self.bitrate.and_then(Bitrate::kbps)
    }

    fn derive_frame_count(&mut self) {
        if self.reported_frames {
            return;
        }
        self.frame_count = match (self.duration_secs, self.frame_rate) {
            (Some(duration), Some(fps)) => Some((duration * fps).round() as u64),
            _ => None,
        };
    }
}
