//! Error types for stupff-av.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Exit status ffmpeg and ffprobe use when they cannot make sense of the input.
pub const INVALID_INPUT_EXIT_CODE: i32 = 234;

/// Errors that can occur while probing or transcoding.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// The tool could not read the source, or the source lacks a stream we need.
    #[error("invalid input for {tool}{}: {message}", fmt_code(*code))]
    InvalidInput {
        tool: String,
        code: Option<i32>,
        message: String,
    },

    /// An external tool exited unsuccessfully for any other reason.
    #[error("{tool} failed{}: {message}", fmt_code(*code))]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        message: String,
    },

    /// The caller broke a contract of this API.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// The destination file was already present before the job started.
    #[error("destination already exists: {}", path.display())]
    DestinationExists { path: PathBuf },

    /// The specified file was not found.
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// An option key outside the option set's table.
    #[error("unknown {category} option: {key}")]
    UnknownOption { category: String, key: String },

    /// An option value that does not fit the option's type.
    #[error("invalid value for {category} option {key}: {value:?}")]
    InvalidOptionValue {
        category: String,
        key: String,
        value: String,
    },

    /// Failed to parse tool output.
    #[error("failed to parse {tool} output: {message}")]
    ParseError { tool: String, message: String },

    /// The tool exited cleanly for every attempt but never wrote the file.
    #[error("no output produced at {} after {attempts} attempt(s)", path.display())]
    NoOutput { path: PathBuf, attempts: usize },

    /// The job was cancelled before the process finished.
    #[error("job cancelled")]
    Cancelled,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of an [`Error`], as surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Source unreadable by the tool, or missing an expected stream.
    InvalidInput,
    /// The external process failed for another reason.
    ToolFailure,
    /// Caller or programming error, not recoverable here.
    Precondition,
    /// Everything else (I/O, missing tools, cancellation, ...).
    Other,
}

fn fmt_code(code: Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit code {})", code),
        None => String::new(),
    }
}

impl Error {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create an invalid input error.
    pub fn invalid_input(
        tool: impl Into<String>,
        code: Option<i32>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidInput {
            tool: tool.into(),
            code,
            message: message.into(),
        }
    }

    /// Create a tool execution failed error.
    pub fn tool_failed(
        tool: impl Into<String>,
        code: Option<i32>,
        message: impl Into<String>,
    ) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            code,
            message: message.into(),
        }
    }

    /// Create a precondition error.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Create a parse error.
    pub fn parse_error(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create an unknown option error.
    pub fn unknown_option(category: impl Into<String>, key: impl Into<String>) -> Self {
        Self::UnknownOption {
            category: category.into(),
            key: key.into(),
        }
    }

    /// Map a failing exit status of `tool` to the matching error.
    ///
    /// Exit code [`INVALID_INPUT_EXIT_CODE`] means the input was rejected;
    /// everything else, including death by signal (`None`), is a tool failure.
    pub fn from_exit_code(tool: impl Into<String>, code: Option<i32>) -> Self {
        match code {
            Some(INVALID_INPUT_EXIT_CODE) => {
                Self::invalid_input(tool, code, "unknown or unreadable file format")
            }
            Some(code) => Self::tool_failed(tool, Some(code), "exited unsuccessfully"),
            None => Self::tool_failed(tool, None, "terminated by signal"),
        }
    }

    /// The user-visible category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput { .. } | Error::FileNotFound { .. } => ErrorKind::InvalidInput,
            Error::ToolFailed { .. } | Error::ParseError { .. } | Error::NoOutput { .. } => {
                ErrorKind::ToolFailure
            }
            Error::Precondition(_)
            | Error::DestinationExists { .. }
            | Error::UnknownOption { .. }
            | Error::InvalidOptionValue { .. } => ErrorKind::Precondition,
            Error::ToolNotFound { .. } | Error::Cancelled | Error::Io(_) | Error::Json(_) => {
                ErrorKind::Other
            }
        }
    }

    /// Exit code of the offending process, if this error carries one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::InvalidInput { code, .. } | Error::ToolFailed { code, .. } => *code,
            _ => None,
        }
    }
}
