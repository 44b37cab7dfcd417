use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use stupff_av::{AudioOptions, ProbeBackend, VideoOptions, DEFAULT_THUMBNAIL_SEEKS};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub transcode: TranscodeConfig,

    #[serde(default)]
    pub thumbnail: ThumbnailConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TranscodeConfig {
    /// Value passed to ffmpeg's `-v`
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Upper bound of the exit-polling backoff, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub probe_backend: ProbeBackend,

    /// Fit output into the video `max_width`/`max_height` even without CLI bounds
    #[serde(default)]
    pub auto_size: bool,

    #[serde(default)]
    pub audio: AudioOptions,

    #[serde(default)]
    pub video: VideoOptions,
}

fn default_log_level() -> String {
    "10".to_string()
}

fn default_poll_interval_ms() -> u64 {
    250
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            poll_interval_ms: default_poll_interval_ms(),
            probe_backend: ProbeBackend::default(),
            auto_size: false,
            audio: AudioOptions::default(),
            video: VideoOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ThumbnailConfig {
    /// Seek offsets in seconds, tried in order until a frame is written
    #[serde(default = "default_seek_candidates")]
    pub seek_candidates: Vec<u64>,

    #[serde(default)]
    pub video: VideoOptions,
}

fn default_seek_candidates() -> Vec<u64> {
    DEFAULT_THUMBNAIL_SEEKS.to_vec()
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            seek_candidates: default_seek_candidates(),
            video: VideoOptions::default(),
        }
    }
}
