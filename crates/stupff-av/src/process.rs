//! Supervision of one external tool process.

use crate::tools::program_name;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::path::Path;
use std::process::{Child, ChildStderr, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// First sleep of the exit-polling backoff.
const INITIAL_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Something that can report whether a process has terminated.
pub trait Liveness: Send + Sync {
    /// `true` once the process has exited; never flips back.
    fn is_finished(&self) -> bool;
}

/// Cloneable cancellation flag shared between a caller and a running job.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Owns a running tool process and its diagnostic (stderr) stream.
///
/// The exit status is recorded exactly once, the first time termination is
/// observed.
#[derive(Debug)]
pub struct ProcessSupervisor {
    name: String,
    pid: u32,
    child: Mutex<Child>,
    diagnostics: Mutex<Option<ChildStderr>>,
    status: OnceLock<ExitStatus>,
}

impl ProcessSupervisor {
    /// Spawn `program` with `args`, capturing stderr as a live stream.
    pub fn start<S: AsRef<std::ffi::OsStr>>(program: &Path, args: &[S]) -> Result<Self> {
        let name = program_name(program);
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::tool_not_found(&name)
                } else {
                    Error::Io(e)
                }
            })?;

        let pid = child.id();
        let diagnostics = child.stderr.take();
        tracing::debug!("Started {} (pid {})", name, pid);

        Ok(Self {
            name,
            pid,
            child: Mutex::new(child),
            diagnostics: Mutex::new(diagnostics),
            status: OnceLock::new(),
        })
    }

    /// Display name of the program.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// OS process id.
    pub fn id(&self) -> u32 {
        self.pid
    }

    /// Take the diagnostic stream. Only the first call gets it.
    pub fn take_diagnostics(&self) -> Option<ChildStderr> {
        self.diagnostics.lock().take()
    }

    /// Non-blocking check whether the process has terminated.
    ///
    /// A failed status query is logged and reported as still running.
    pub fn is_finished(&self) -> bool {
        self.poll_exit().unwrap_or_else(|e| {
            tracing::warn!("Failed to poll {} (pid {}): {}", self.name, self.pid, e);
            false
        })
    }

    /// Like [`is_finished`](Self::is_finished), but a failed status query is
    /// returned as [`Error::Io`].
    pub fn poll_exit(&self) -> Result<bool> {
        if self.status.get().is_some() {
            return Ok(true);
        }

        let mut child = self.child.lock();
        match child.try_wait()? {
            Some(status) => {
                let _ = self.status.set(status);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Exit code, available once [`is_finished`](Self::is_finished) returned
    /// `true`. `None` before that, or when the process died from a signal.
    pub fn exit_code(&self) -> Option<i32> {
        self.status.get().and_then(ExitStatus::code)
    }

    /// Whether the process exited successfully, once finished.
    pub fn success(&self) -> Option<bool> {
        self.status.get().map(ExitStatus::success)
    }

    /// Block until the process exits, polling with a growing sleep capped at
    /// `max_interval`.
    ///
    /// When `cancel` fires first, the process is killed and reaped and
    /// [`Error::Cancelled`] is returned.
    pub fn wait_polling(&self, max_interval: Duration, cancel: Option<&CancelToken>) -> Result<()> {
        if poll_until_exit(|| self.poll_exit(), max_interval, cancel)? {
            return Ok(());
        }
        tracing::info!("Cancelling {} (pid {})", self.name, self.pid);
        self.kill()?;
        Err(Error::Cancelled)
    }

    /// Kill the process and reap it.
    pub fn kill(&self) -> Result<()> {
        if self.status.get().is_some() {
            return Ok(());
        }

        let mut child = self.child.lock();
        if let Err(e) = child.kill() {
            // Already exited between the check and the kill.
            if e.kind() != std::io::ErrorKind::InvalidInput {
                return Err(Error::Io(e));
            }
        }
        let status = child.wait()?;
        let _ = self.status.set(status);
        Ok(())
    }

    /// Turn the recorded exit status into a result.
    ///
    /// # Errors
    ///
    /// - [`Error::Precondition`] if the process has not finished yet.
    /// - [`Error::InvalidInput`] for the bad-input exit code.
    /// - [`Error::ToolFailed`] for any other unsuccessful exit.
    pub fn classify_failure(&self) -> Result<()> {
        let status = self.status.get().ok_or_else(|| {
            Error::precondition(format!(
                "exit status of {} (pid {}) requested before it finished",
                self.name, self.pid
            ))
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::from_exit_code(&self.name, status.code()))
        }
    }
}

impl Liveness for ProcessSupervisor {
    fn is_finished(&self) -> bool {
        ProcessSupervisor::is_finished(self)
    }
}

/// Call `poll` with a growing sleep in between until it reports an exit
/// (`Ok(true)`) or `cancel` fires (`Ok(false)`). Poll errors end the wait.
fn poll_until_exit<F>(
    mut poll: F,
    max_interval: Duration,
    cancel: Option<&CancelToken>,
) -> Result<bool>
where
    F: FnMut() -> Result<bool>,
{
    let mut interval = INITIAL_POLL_INTERVAL.min(max_interval);
    while !poll()? {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Ok(false);
        }
        std::thread::sleep(interval);
        interval = (interval * 2).min(max_interval);
    }
    Ok(true)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::io::Read;
    use std::path::PathBuf;

    fn sh(script: &str) -> ProcessSupervisor {
        ProcessSupervisor::start(&PathBuf::from("sh"), &["-c", script]).unwrap()
    }

    #[test]
    fn test_success() {
        let proc = sh("exit 0");
        proc.wait_polling(Duration::from_millis(20), None).unwrap();
        assert!(proc.is_finished());
        assert_eq!(proc.exit_code(), Some(0));
        assert!(proc.classify_failure().is_ok());
    }

    #[test]
    fn test_invalid_input_exit_code() {
        let proc = sh("exit 234");
        proc.wait_polling(Duration::from_millis(20), None).unwrap();
        let err = proc.classify_failure().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.exit_code(), Some(234));
    }

    #[test]
    fn test_other_exit_code() {
        let proc = sh("exit 3");
        proc.wait_polling(Duration::from_millis(20), None).unwrap();
        let err = proc.classify_failure().unwrap_err();
        assert!(matches!(err, Error::ToolFailed { ref tool, code: Some(3), .. } if tool == "sh"));
    }

    #[test]
    fn test_classify_before_finish_is_precondition() {
        let proc = sh("sleep 5");
        let err = proc.classify_failure().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        proc.kill().unwrap();
        assert!(proc.is_finished());
    }

    #[test]
    fn test_diagnostics_stream() {
        let proc = sh("printf 'frame=1\\rframe=2\\r' >&2");
        let mut stderr = proc.take_diagnostics().unwrap();
        assert!(proc.take_diagnostics().is_none());

        let mut text = String::new();
        stderr.read_to_string(&mut text).unwrap();
        assert_eq!(text, "frame=1\rframe=2\r");
        proc.wait_polling(Duration::from_millis(20), None).unwrap();
    }

    #[test]
    fn test_cancel_kills_process() {
        let proc = sh("sleep 30");
        let token = CancelToken::new();
        token.cancel();
        let err = proc
            .wait_polling(Duration::from_millis(20), Some(&token))
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(proc.is_finished());
        assert_eq!(proc.exit_code(), None);
    }

    #[test]
    fn test_missing_program() {
        let err = ProcessSupervisor::start(&PathBuf::from("nonexistent_tool_12345"), &["-v"])
            .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }

    #[test]
    fn test_status_error_ends_wait() {
        let mut calls = 0;
        let err = poll_until_exit(
            || {
                calls += 1;
                if calls < 3 {
                    Ok(false)
                } else {
                    Err(Error::Io(std::io::Error::other("waitpid failed")))
                }
            },
            Duration::from_millis(1),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_poll_until_exit_reports_cancel() {
        let token = CancelToken::new();
        token.cancel();
        let exited = poll_until_exit(|| Ok(false), Duration::from_millis(1), Some(&token)).unwrap();
        assert!(!exited);
    }
}
