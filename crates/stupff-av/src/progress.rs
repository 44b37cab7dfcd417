//! Live progress tracking for a running transcode.
//!
//! ffmpeg rewrites its status line in place, so progress arrives as chunks
//! terminated by `\r`. A [`ProgressTracker`] thread reads those chunks from the
//! process's stderr, pulls out `frame=` markers and publishes them through a
//! shared [`ProgressState`] and an optional callback.

use crate::extract::extract_frame;
use crate::process::Liveness;
use crate::Result;
use parking_lot::Mutex;
use serde::Serialize;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

// Upper bound on one buffered chunk when ffmpeg writes lines without `\r`.
const MAX_CHUNK_LEN: usize = 64 * 1024;

/// Callback invoked by the tracker thread for every progress update.
pub type ProgressCallback = Box<dyn FnMut(Progress) + Send>;

/// Snapshot of a job's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Last frame ffmpeg reported.
    pub current_frame: u64,
    /// Frames expected in total, when known.
    pub total_frames: Option<u64>,
    /// Percentage 0-100; `None` when the total is unknown.
    pub percent: Option<u8>,
    /// Estimated seconds left; `None` until an estimate is possible.
    pub seconds_remaining: Option<u64>,
}

/// `floor(done * 100 / total)`, clamped to 100. A zero total counts as done.
///
/// ```
/// use stupff_av::percent;
///
/// assert_eq!(percent(2, 4), 50);
/// assert_eq!(percent(1000, 3), 100);
/// ```
pub fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = u128::from(done) * 100 / u128::from(total);
    pct.min(100) as u8
}

/// Seconds left at the average speed observed so far.
///
/// `None` while `elapsed` rounds to zero seconds or no frame has been
/// processed yet.
pub fn estimate_seconds_remaining(total: u64, current: u64, elapsed: Duration) -> Option<u64> {
    let secs = elapsed.as_secs_f64();
    if secs.round() == 0.0 || current == 0 {
        return None;
    }
    let frames_per_second = current as f64 / secs;
    let frames_left = total.saturating_sub(current) as f64;
    Some((frames_left / frames_per_second).floor() as u64)
}

/// Progress fields shared between the tracker (single writer) and readers.
#[derive(Debug)]
pub struct ProgressState {
    total_frames: Option<u64>,
    current_frame: AtomicU64,
    percent: AtomicU8,
    started_at: OnceLock<Instant>,
    // (whole-second tick, frame, estimate) of the last computation
    eta_cache: Mutex<Option<(u64, u64, Option<u64>)>>,
}

impl ProgressState {
    /// Fresh state; `total_frames == None` selects unmeasured mode.
    pub fn new(total_frames: Option<u64>) -> Self {
        Self {
            total_frames: total_frames.filter(|t| *t > 0),
            current_frame: AtomicU64::new(0),
            percent: AtomicU8::new(0),
            started_at: OnceLock::new(),
            eta_cache: Mutex::new(None),
        }
    }

    /// Record the process start time. Later calls are ignored.
    pub fn mark_started(&self) {
        let _ = self.started_at.set(Instant::now());
    }

    /// When the process was started.
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at.get().copied()
    }

    /// Denominator for percentages, if known.
    pub fn total_frames(&self) -> Option<u64> {
        self.total_frames
    }

    /// Whether a percentage can be reported.
    pub fn is_measured(&self) -> bool {
        self.total_frames.is_some()
    }

    /// Highest frame index seen so far.
    pub fn current_frame(&self) -> u64 {
        self.current_frame.load(Ordering::Acquire)
    }

    /// Current percentage, or `None` in unmeasured mode.
    pub fn percent(&self) -> Option<u8> {
        self.total_frames
            .map(|_| self.percent.load(Ordering::Acquire))
    }

    /// Apply a new frame marker. Both fields only ever grow.
    pub fn record(&self, frame: u64) -> Progress {
        let previous = self.current_frame.fetch_max(frame, Ordering::AcqRel);
        let current = previous.max(frame);
        if let Some(total) = self.total_frames {
            self.percent
                .fetch_max(percent(current, total), Ordering::AcqRel);
        }
        self.snapshot()
    }

    /// Estimated seconds left, recomputed when the whole-second tick of
    /// elapsed time or the current frame changes.
    pub fn seconds_remaining(&self) -> Option<u64> {
        let elapsed = self.started_at()?.elapsed();
        self.seconds_remaining_after(elapsed)
    }

    fn seconds_remaining_after(&self, elapsed: Duration) -> Option<u64> {
        let total = self.total_frames?;
        let tick = elapsed.as_secs();
        let current = self.current_frame();

        let mut cache = self.eta_cache.lock();
        if let Some((cached_tick, cached_frame, estimate)) = *cache {
            if cached_tick == tick && cached_frame == current {
                return estimate;
            }
        }
        let estimate = estimate_seconds_remaining(total, current, elapsed);
        *cache = Some((tick, current, estimate));
        estimate
    }

    /// Current values as a [`Progress`].
    pub fn snapshot(&self) -> Progress {
        Progress {
            current_frame: self.current_frame(),
            total_frames: self.total_frames,
            percent: self.percent(),
            seconds_remaining: self.seconds_remaining(),
        }
    }
}

/// Handle to a running progress-tracking thread.
#[derive(Debug)]
pub struct ProgressTracker {
    handle: JoinHandle<usize>,
}

impl ProgressTracker {
    /// Start tracking `stream` on a new thread.
    ///
    /// The thread stops once `liveness` reports the process finished, progress
    /// reaches 100, or the stream ends. Callbacks never fire after the process
    /// has been observed finished.
    pub fn spawn<R, L>(
        stream: R,
        liveness: Arc<L>,
        state: Arc<ProgressState>,
        mut callback: Option<ProgressCallback>,
    ) -> Result<Self>
    where
        R: Read + Send + 'static,
        L: Liveness + ?Sized + 'static,
    {
        let handle = std::thread::Builder::new()
            .name("stupff-progress".to_string())
            .spawn(move || track(stream, liveness.as_ref(), &state, callback.as_mut()))?;
        Ok(Self { handle })
    }

    /// Wait for the thread to stop; returns how many callbacks fired.
    ///
    /// A panic inside the callback is resumed on the joining thread.
    pub fn join(self) -> usize {
        match self.handle.join() {
            Ok(callbacks) => callbacks,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Read up to and including the next `\r`, at most [`MAX_CHUNK_LEN`] bytes.
fn read_chunk<R: BufRead>(reader: &mut R, chunk: &mut Vec<u8>) -> io::Result<usize> {
    chunk.clear();
    reader.take(MAX_CHUNK_LEN as u64).read_until(b'\r', chunk)
}

fn track<R, L>(
    stream: R,
    liveness: &L,
    state: &ProgressState,
    mut callback: Option<&mut ProgressCallback>,
) -> usize
where
    R: Read,
    L: Liveness + ?Sized,
{
    let mut reader = BufReader::new(stream);
    let mut chunk = Vec::new();
    let mut callbacks = 0;

    loop {
        if liveness.is_finished() {
            break;
        }
        if state.percent() == Some(100) {
            // Keep the pipe empty so the process can never block on stderr.
            if let Err(e) = io::copy(&mut reader, &mut io::sink()) {
                tracing::debug!("Stopped draining diagnostics: {}", e);
            }
            break;
        }

        match read_chunk(&mut reader, &mut chunk) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!("Failed to read diagnostics: {}", e);
                break;
            }
        }

        let text = String::from_utf8_lossy(&chunk);
        let Some(frame) = extract_frame(&text) else {
            continue;
        };

        // The process may have exited while the chunk was being read.
        if liveness.is_finished() {
            break;
        }

        let progress = state.record(frame);
        tracing::trace!("frame {} ({:?}%)", progress.current_frame, progress.percent);
        if let Some(cb) = callback.as_deref_mut() {
            cb(progress);
            callbacks += 1;
        }
    }

    callbacks
}
