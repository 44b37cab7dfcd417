//! High-level entry points: create, run, convert and thumbnail jobs.

use crate::job::Job;
use crate::options::{AudioOptions, VideoOptions};
use crate::probe::{FfprobeProber, MediaProbe, ProbeBackend, Prober};
use crate::process::CancelToken;
use crate::progress::{ProgressCallback, ProgressTracker};
use crate::tools::{require_tool, FFMPEG, FFPROBE};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Seek offsets (seconds) tried in order when a thumbnail comes out empty.
pub const DEFAULT_THUMBNAIL_SEEKS: [u64; 4] = [10, 5, 1, 0];

/// Settings shared by every job a [`Transcoder`] creates.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscoderSettings {
    /// ffmpeg executable.
    pub ffmpeg: PathBuf,
    /// ffprobe executable.
    pub ffprobe: PathBuf,
    /// Value passed to `-v`.
    pub log_level: String,
    /// Upper bound of the exit-polling interval.
    pub poll_interval: Duration,
    /// How sources are probed.
    pub probe_backend: ProbeBackend,
    /// Fallback seek offsets for thumbnails.
    pub thumbnail_seeks: Vec<u64>,
}

impl Default for TranscoderSettings {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from(FFMPEG),
            ffprobe: PathBuf::from(FFPROBE),
            log_level: "10".to_string(),
            poll_interval: Duration::from_millis(250),
            probe_backend: ProbeBackend::default(),
            thumbnail_seeks: DEFAULT_THUMBNAIL_SEEKS.to_vec(),
        }
    }
}

/// Creates and runs ffmpeg jobs.
///
/// ```no_run
/// use stupff_av::{AudioOptions, Progress, Transcoder, TranscoderSettings, VideoOptions};
///
/// let transcoder = Transcoder::new(TranscoderSettings::default());
/// let video = VideoOptions {
///     codec: Some("libvpx".to_string()),
///     max_width: Some(640),
///     ..Default::default()
/// };
/// let job = transcoder.convert(
///     "input.ogv".as_ref(),
///     "output.webm".as_ref(),
///     Some(Box::new(|p: Progress| eprintln!("{:?}%", p.percent))),
///     AudioOptions::default(),
///     video,
/// )?;
/// assert!(job.is_finished());
/// # Ok::<(), stupff_av::Error>(())
/// ```
pub struct Transcoder {
    settings: TranscoderSettings,
    prober: Box<dyn Prober>,
}

impl std::fmt::Debug for Transcoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcoder")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Transcoder {
    /// Create a transcoder probing sources with the configured ffprobe.
    pub fn new(settings: TranscoderSettings) -> Self {
        let prober = FfprobeProber::new(settings.ffprobe.clone(), settings.probe_backend);
        Self {
            settings,
            prober: Box::new(prober),
        }
    }

    /// Create a transcoder using ffmpeg and ffprobe found on `PATH`.
    ///
    /// # Errors
    ///
    /// [`Error::ToolNotFound`] if either tool is missing.
    pub fn discover() -> Result<Self> {
        let settings = TranscoderSettings {
            ffmpeg: require_tool(FFMPEG)?,
            ffprobe: require_tool(FFPROBE)?,
            ..Default::default()
        };
        Ok(Self::new(settings))
    }

    /// Replace the prober used by [`create_job`](Self::create_job).
    pub fn with_prober(mut self, prober: impl Prober + 'static) -> Self {
        self.prober = Box::new(prober);
        self
    }

    /// Settings in effect.
    pub fn settings(&self) -> &TranscoderSettings {
        &self.settings
    }

    /// Probe a media file.
    pub fn probe(&self, path: &Path) -> Result<MediaProbe> {
        self.prober.probe(path)
    }

    /// Probe `source` and build a job writing to `destination`.
    ///
    /// No process is started; probing errors abort here.
    pub fn create_job(
        &self,
        source: &Path,
        destination: &Path,
        audio: AudioOptions,
        video: VideoOptions,
        auto_size: bool,
    ) -> Result<Job> {
        let probe = self.prober.probe(source)?;
        Job::new(
            &self.settings.ffmpeg,
            &self.settings.log_level,
            probe,
            destination,
            audio,
            video,
            auto_size,
        )
    }

    /// Start `job`, track its progress and wait for it to exit.
    ///
    /// Returns only after the progress tracker has stopped, so `on_progress`
    /// never fires once this call is over. When `cancel` fires, the process
    /// is killed and [`Error::Cancelled`] is returned.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] when ffmpeg exits with the bad-input code.
    /// - [`Error::ToolFailed`] for any other unsuccessful exit.
    pub fn run(
        &self,
        job: &mut Job,
        on_progress: Option<ProgressCallback>,
        cancel: Option<&CancelToken>,
    ) -> Result<()> {
        let process = job.start()?;
        tracing::info!(
            "Transcoding {:?} -> {:?} (pid {})",
            job.source().file_path,
            job.destination(),
            process.id()
        );

        let tracker = match process.take_diagnostics() {
            Some(stream) => {
                match ProgressTracker::spawn(
                    stream,
                    Arc::clone(&process),
                    job.progress_state(),
                    on_progress,
                ) {
                    Ok(tracker) => Some(tracker),
                    Err(e) => {
                        process.kill()?;
                        return Err(e);
                    }
                }
            }
            None => None,
        };

        let waited = process.wait_polling(self.settings.poll_interval, cancel);
        let callbacks = tracker.map(ProgressTracker::join).unwrap_or(0);
        waited?;

        tracing::debug!(
            "{} exited with {:?} after {} progress update(s)",
            process.name(),
            process.exit_code(),
            callbacks
        );
        process.classify_failure()?;

        tracing::info!("Finished {:?}", job.destination());
        Ok(())
    }

    /// Convert `source` into `destination` and wait for completion.
    ///
    /// Output is fitted into the video options' size bounds when any is set.
    pub fn convert(
        &self,
        source: &Path,
        destination: &Path,
        on_progress: Option<ProgressCallback>,
        audio: AudioOptions,
        video: VideoOptions,
    ) -> Result<Job> {
        let auto_size = video.has_size_bounds();
        let mut job = self.create_job(source, destination, audio, video, auto_size)?;
        self.run(&mut job, on_progress, None)?;
        Ok(job)
    }

    /// Grab one frame of `source` into `destination`.
    ///
    /// Tries `seek` first, then the configured fallback offsets. A new offset
    /// is only tried when ffmpeg succeeded but wrote nothing; a failing exit
    /// is returned right away.
    ///
    /// # Errors
    ///
    /// [`Error::NoOutput`] when every candidate offset produced no file.
    pub fn generate_thumbnail(
        &self,
        source: &Path,
        destination: &Path,
        seek: Option<u64>,
        mut video: VideoOptions,
    ) -> Result<Job> {
        video.frames.get_or_insert(1);
        let audio = AudioOptions {
            disabled: true,
            ..Default::default()
        };
        let auto_size = video.has_size_bounds();
        let mut job = self.create_job(source, destination, audio, video, auto_size)?;

        let candidates = seek_candidates(seek, &self.settings.thumbnail_seeks, job.source().duration_secs);
        let mut attempts = 0;
        for offset in candidates {
            attempts += 1;
            job.set_extra_args(vec!["-ss".to_string(), offset.to_string()])?;
            self.run(&mut job, None, None)?;

            if job.destination().exists() {
                return Ok(job);
            }
            tracing::warn!(
                "No thumbnail written for {:?} at {}s, trying next offset",
                job.source().file_path,
                offset
            );
        }

        Err(Error::NoOutput {
            path: destination.to_path_buf(),
            attempts,
        })
    }
}

/// Ordered, de-duplicated seek offsets for a thumbnail.
///
/// Non-zero offsets at or past a known duration are skipped. An empty result
/// falls back to the start of the file.
fn seek_candidates(seek: Option<u64>, fallbacks: &[u64], duration: Option<f64>) -> Vec<u64> {
    let mut candidates: Vec<u64> = Vec::new();
    for offset in seek.into_iter().chain(fallbacks.iter().copied()) {
        if candidates.contains(&offset) {
            continue;
        }
        if offset > 0 && duration.is_some_and(|d| offset as f64 >= d) {
            continue;
        }
        candidates.push(offset);
    }
    if candidates.is_empty() {
        candidates.push(0);
    }
    candidates
}
