//! # stupff-av
//!
//! Drive ffmpeg and ffprobe as subprocesses.
//!
//! This crate provides functionality for:
//! - Turning typed audio/video option sets into ffmpeg arguments
//! - Probing media files for dimensions, frame rate, duration and bitrate
//! - Fitting an output size into optional bounds without distorting it
//! - Running a conversion while a background thread parses live `frame=`
//!   progress from ffmpeg's stderr
//! - Grabbing thumbnails with seek-offset fallbacks
//!
//! ## Example
//!
//! ```no_run
//! use stupff_av::{AudioOptions, Progress, Transcoder, VideoOptions};
//!
//! let transcoder = Transcoder::discover()?;
//! let job = transcoder.convert(
//!     "talk.ogv".as_ref(),
//!     "talk.mp4".as_ref(),
//!     Some(Box::new(|p: Progress| println!("{:?}% ({:?}s left)", p.percent, p.seconds_remaining))),
//!     AudioOptions::default(),
//!     VideoOptions::default(),
//! )?;
//! println!("wrote {:?}", job.destination());
//! # Ok::<(), stupff_av::Error>(())
//! ```

mod error;
pub mod extract;
pub mod job;
pub mod options;
pub mod probe;
pub mod process;
pub mod progress;
pub mod sizing;
pub mod tools;
pub mod transcoder;

// Re-exports
pub use error::{Error, ErrorKind, Result, INVALID_INPUT_EXIT_CODE};
pub use job::Job;
pub use options::{AudioOptions, Flag, OptionSet, VideoOptions};
pub use probe::{FfprobeProber, MediaProbe, ProbeBackend, Prober};
pub use process::{CancelToken, Liveness, ProcessSupervisor};
pub use progress::{
    estimate_seconds_remaining, percent, Progress, ProgressCallback, ProgressState,
    ProgressTracker,
};
pub use sizing::{fit_dimensions, FittedSize};
pub use tools::{check_tool, check_tools, get_tool_path, require_tool, ToolInfo};
pub use transcoder::{Transcoder, TranscoderSettings, DEFAULT_THUMBNAIL_SEEKS};

/// Probe a media file with ffprobe from `PATH`.
///
/// # Example
///
/// ```no_run
/// let probe = stupff_av::probe("/path/to/video.ogv")?;
/// println!("{}x{}, {:?} frames", probe.width, probe.height, probe.total_frames());
/// # Ok::<(), stupff_av::Error>(())
/// ```
pub fn probe<P: AsRef<std::path::Path>>(path: P) -> Result<MediaProbe> {
    probe_with(path, ProbeBackend::default())
}

/// Probe a media file using a specific backend.
pub fn probe_with<P: AsRef<std::path::Path>>(path: P, backend: ProbeBackend) -> Result<MediaProbe> {
    FfprobeProber::new(tools::FFPROBE, backend).probe(path.as_ref())
}
