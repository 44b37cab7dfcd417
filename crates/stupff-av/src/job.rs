//! A single conversion request and its live state.

use crate::options::{AudioOptions, OptionSet, VideoOptions};
use crate::probe::MediaProbe;
use crate::process::ProcessSupervisor;
use crate::progress::{Progress, ProgressState};
use crate::sizing::fit_dimensions;
use crate::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// One conversion from a probed source to a destination file.
///
/// The command line is derived when the job is built (and again only when the
/// extra arguments are replaced between attempts). Progress fields are written
/// by the tracker thread alone and can be read from anywhere through
/// [`Job::progress`], [`Job::current_frame`] and [`Job::seconds_remaining`].
#[derive(Debug)]
pub struct Job {
    program: PathBuf,
    log_level: String,
    source: MediaProbe,
    destination: PathBuf,
    audio: AudioOptions,
    video: VideoOptions,
    extra_args: Vec<String>,
    total_frames: Option<u64>,
    commandline: Vec<OsString>,
    state: Arc<ProgressState>,
    process: Option<Arc<ProcessSupervisor>>,
}

impl Job {
    /// Build a job for `program` (ffmpeg) from an already probed source.
    ///
    /// With `auto_size`, the output size is fitted into the video options'
    /// `max_width`/`max_height` and written to their `size`.
    ///
    /// # Errors
    ///
    /// - [`Error::DestinationExists`] if `destination` is already present.
    /// - [`Error::Precondition`] if `auto_size` is requested without bounds.
    pub fn new(
        program: impl Into<PathBuf>,
        log_level: impl Into<String>,
        source: MediaProbe,
        destination: impl Into<PathBuf>,
        audio: AudioOptions,
        mut video: VideoOptions,
        auto_size: bool,
    ) -> Result<Self> {
        let destination = destination.into();
        if destination.exists() {
            return Err(Error::DestinationExists { path: destination });
        }

        if auto_size {
            if !video.has_size_bounds() {
                return Err(Error::precondition(
                    "auto sizing requires max_width or max_height",
                ));
            }
            let fitted = fit_dimensions(source.width, source.height, video.max_width, video.max_height);
            tracing::debug!(
                "Fitted {}x{} into {:?}x{:?}: {:?}",
                source.width,
                source.height,
                video.max_width,
                video.max_height,
                fitted
            );
            video.size = Some(fitted.to_size_arg());
        }

        let total_frames = match (source.total_frames(), video.frames) {
            (Some(source_frames), Some(limit)) => Some(source_frames.min(limit)),
            (None, Some(limit)) => Some(limit),
            (source_frames, None) => source_frames,
        };
        if total_frames.is_none() {
            tracing::warn!(
                "Frame count of {:?} is unknown; progress will not be measured",
                source.file_path
            );
        }

        let mut job = Self {
            program: program.into(),
            log_level: log_level.into(),
            source,
            destination,
            audio,
            video,
            extra_args: Vec::new(),
            total_frames,
            commandline: Vec::new(),
            state: Arc::new(ProgressState::new(total_frames)),
            process: None,
        };
        job.commandline = job.build_commandline();
        Ok(job)
    }

    fn build_commandline(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-v".into(), self.log_level.clone().into()];
        args.extend(self.extra_args.iter().map(OsString::from));
        args.push("-i".into());
        args.push(self.source.file_path.clone().into_os_string());
        args.extend(self.audio.commandline().into_iter().map(OsString::from));
        args.extend(self.video.commandline().into_iter().map(OsString::from));
        args.push(self.destination.clone().into_os_string());
        args
    }

    /// Replace the raw arguments placed before `-i` (e.g. a seek offset).
    ///
    /// This starts a new attempt: the process handle and progress are reset.
    ///
    /// # Errors
    ///
    /// [`Error::Precondition`] while the current process is still running.
    pub fn set_extra_args(&mut self, args: Vec<String>) -> Result<()> {
        if self.process.as_ref().is_some_and(|p| !p.is_finished()) {
            return Err(Error::precondition(
                "cannot replace arguments of a running job",
            ));
        }
        self.extra_args = args;
        self.commandline = self.build_commandline();
        self.state = Arc::new(ProgressState::new(self.total_frames));
        self.process = None;
        Ok(())
    }

    /// Launch the process. The caller is responsible for tracking and waiting.
    pub(crate) fn start(&mut self) -> Result<Arc<ProcessSupervisor>> {
        if self.process.is_some() {
            return Err(Error::precondition("job was already started"));
        }

        tracing::debug!("Running {:?} {:?}", self.program, self.commandline);
        let process = Arc::new(ProcessSupervisor::start(&self.program, &self.commandline)?);
        self.state.mark_started();
        self.process = Some(Arc::clone(&process));
        Ok(process)
    }

    /// Program the job runs.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments passed to the program.
    pub fn commandline(&self) -> &[OsString] {
        &self.commandline
    }

    /// Probe result of the source file.
    pub fn source(&self) -> &MediaProbe {
        &self.source
    }

    /// Output path.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Audio options in effect.
    pub fn audio_options(&self) -> &AudioOptions {
        &self.audio
    }

    /// Video options in effect, including a fitted size.
    pub fn video_options(&self) -> &VideoOptions {
        &self.video
    }

    /// Raw arguments placed before `-i`.
    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }

    /// Frames this job is expected to write, when known.
    pub fn total_frames(&self) -> Option<u64> {
        self.total_frames
    }

    /// Shared progress fields of the current attempt.
    pub fn progress_state(&self) -> Arc<ProgressState> {
        Arc::clone(&self.state)
    }

    /// Conversion progress from 0 to 100, `None` when unmeasured.
    pub fn progress(&self) -> Option<u8> {
        self.state.percent()
    }

    /// Last frame the tool reported working on.
    pub fn current_frame(&self) -> u64 {
        self.state.current_frame()
    }

    /// Estimated remaining time in seconds.
    pub fn seconds_remaining(&self) -> Option<u64> {
        self.state.seconds_remaining()
    }

    /// All progress fields at once.
    pub fn snapshot(&self) -> Progress {
        self.state.snapshot()
    }

    /// Supervisor of the current attempt, once started.
    pub fn process(&self) -> Option<&Arc<ProcessSupervisor>> {
        self.process.as_ref()
    }

    /// Whether the process was started.
    pub fn is_started(&self) -> bool {
        self.process.is_some()
    }

    /// Whether the process has terminated.
    pub fn is_finished(&self) -> bool {
        self.process.as_ref().is_some_and(|p| p.is_finished())
    }

    /// Exit code once finished.
    pub fn exit_code(&self) -> Option<i32> {
        self.process.as_ref().and_then(|p| p.exit_code())
    }

    /// Whether the process exited successfully, once finished.
    pub fn was_successful(&self) -> Option<bool> {
        self.process.as_ref().and_then(|p| p.success())
    }

    /// Block until the frame index moves or the process finishes, checking
    /// every `check_interval`. Returns `(progress, seconds_remaining)`.
    pub fn wait_for_progress(&self, check_interval: Duration) -> (Option<u8>, Option<u64>) {
        loop {
            if !self.is_started() || self.is_finished() {
                break;
            }
            let before = self.current_frame();
            std::thread::sleep(check_interval);
            if self.current_frame() != before {
                break;
            }
        }
        (self.progress(), self.seconds_remaining())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(frames: Option<u64>) -> MediaProbe {
        MediaProbe::new("/media/sintel.ogv", 800, 200)
            .unwrap()
            .with_frame_count(frames)
    }

    fn job(audio: AudioOptions, video: VideoOptions, auto_size: bool) -> Result<Job> {
        Job::new("ffmpeg", "10", source(Some(1253)), "/nonexistent/out.mp3", audio, video, auto_size)
    }

    fn args(job: &Job) -> Vec<String> {
        job.commandline()
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_commandline_shape() {
        let audio = AudioOptions {
            codec: Some("libmp3lame".to_string()),
            bitrate: Some(320_000),
            ..Default::default()
        };
        let video = VideoOptions {
            codec: Some("mpeg4".to_string()),
            ..Default::default()
        };
        let job = job(audio, video, false).unwrap();
        assert_eq!(
            args(&job),
            vec![
                "-v", "10", "-i", "/media/sintel.ogv", "-acodec", "libmp3lame", "-ab", "320000",
                "-vcodec", "mpeg4", "/nonexistent/out.mp3"
            ]
        );
        assert!(!job.is_started());
        assert_eq!(job.progress(), Some(0));
    }

    #[test]
    fn test_auto_size() {
        let video = VideoOptions {
            max_width: Some(400),
            max_height: Some(300),
            ..Default::default()
        };
        let job = job(AudioOptions::default(), video, true).unwrap();
        assert_eq!(job.video_options().size.as_deref(), Some("400x100"));
        assert!(args(&job).windows(2).any(|w| w == ["-s", "400x100"]));
    }

    #[test]
    fn test_auto_size_requires_bounds() {
        let err = job(AudioOptions::default(), VideoOptions::default(), true).unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[test]
    fn test_destination_must_not_exist() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.webm");
        std::fs::write(&dest, b"old").unwrap();

        let err = Job::new(
            "ffmpeg",
            "10",
            source(None),
            &dest,
            AudioOptions::default(),
            VideoOptions::default(),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, Error::DestinationExists { .. }));
    }

    #[test]
    fn test_extra_args_before_input() {
        let mut job = job(AudioOptions::default(), VideoOptions::default(), false).unwrap();
        job.set_extra_args(vec!["-ss".to_string(), "10".to_string()]).unwrap();
        assert_eq!(&args(&job)[..5], ["-v", "10", "-ss", "10", "-i"]);
        assert_eq!(job.extra_args(), ["-ss", "10"]);
    }

    #[test]
    fn test_frame_limit_caps_total() {
        let video = VideoOptions {
            frames: Some(1),
            ..Default::default()
        };
        let job = job(AudioOptions::default(), video, false).unwrap();
        assert_eq!(job.total_frames(), Some(1));

        let job = Job::new(
            "ffmpeg",
            "10",
            source(None),
            "/nonexistent/out.png",
            AudioOptions::default(),
            VideoOptions::default(),
            false,
        )
        .unwrap();
        assert_eq!(job.total_frames(), None);
        assert_eq!(job.progress(), None);
    }

    #[test]
    fn test_wait_for_progress_before_start() {
        let job = job(AudioOptions::default(), VideoOptions::default(), false).unwrap();
        assert_eq!(job.wait_for_progress(Duration::from_millis(1)), (Some(0), None));
    }
}
