//! Media file probing module.
//!
//! Two ffprobe backends produce a [`MediaProbe`]:
//!
//! - **Text** (default): runs `ffprobe <source>` and scrapes the diagnostic
//!   report with the extractors in [`crate::extract`]
//! - **JSON**: asks ffprobe for its structured output and reads the fields of
//!   the first video stream

mod ffprobe;
mod text;
mod types;

pub use ffprobe::probe_with_ffprobe_json;
pub use text::probe_with_ffprobe_text;
pub use types::*;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Backend to use for probing media files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeBackend {
    /// Parse ffprobe's human-readable report.
    #[default]
    Text,
    /// Parse ffprobe's JSON output.
    Json,
}

impl std::str::FromStr for ProbeBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(ProbeBackend::Text),
            "json" => Ok(ProbeBackend::Json),
            _ => Err(format!("unknown probe backend: {}", s)),
        }
    }
}

/// Anything that can turn a media path into a [`MediaProbe`].
pub trait Prober: Send + Sync {
    /// Probe `path`.
    fn probe(&self, path: &Path) -> Result<MediaProbe>;
}

/// [`Prober`] backed by an ffprobe executable.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    program: PathBuf,
    backend: ProbeBackend,
}

impl FfprobeProber {
    /// Create a prober running `program` with the given backend.
    pub fn new(program: impl Into<PathBuf>, backend: ProbeBackend) -> Self {
        Self {
            program: program.into(),
            backend,
        }
    }
}

impl Prober for FfprobeProber {
    fn probe(&self, path: &Path) -> Result<MediaProbe> {
        if !path.exists() {
            return Err(Error::file_not_found(path));
        }

        match self.backend {
            ProbeBackend::Text => probe_with_ffprobe_text(&self.program, path),
            ProbeBackend::Json => probe_with_ffprobe_json(&self.program, path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("text".parse::<ProbeBackend>(), Ok(ProbeBackend::Text));
        assert_eq!("JSON".parse::<ProbeBackend>(), Ok(ProbeBackend::Json));
        assert!("mediainfo".parse::<ProbeBackend>().is_err());
    }

    #[test]
    fn test_missing_file() {
        let prober = FfprobeProber::new("ffprobe", ProbeBackend::Text);
        let err = prober.probe(Path::new("/nonexistent/clip.ogv")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}
