use thiserror::Error;

/// Application-level errors using thiserror for structured error handling.
///
/// These errors represent domain-specific failures that can occur while
/// driving the wizard and its external tooling. They carry enough context
/// to be displayed verbatim and can be chained with anyhow.

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to read {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize {document}")]
    Serialize {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to create directory {path}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Python interpreter not found at {path}. Set up the measurement module venv first.")]
    InterpreterMissing { path: std::path::PathBuf },

    #[error("Failed to spawn {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} failed: {detail}")]
    ScriptFailed {
        operation: &'static str,
        exit_code: Option<i32>,
        detail: String,
    },

    #[error("{operation} completed but produced no output file at {path}")]
    OutputMissing {
        operation: &'static str,
        path: std::path::PathBuf,
    },

    #[error("{operation} timed out after {seconds} seconds")]
    TimedOut {
        operation: &'static str,
        seconds: u64,
    },

    #[error("No model weights for {key} (expected at {path})")]
    WeightsMissing {
        key: String,
        path: std::path::PathBuf,
    },

    #[error("Camera calibration failed: {message}")]
    Calibration { message: String },

    #[error("Blender executable not found. Set blender_path in the configuration or install Blender on PATH.")]
    BlenderMissing,

    #[error("I/O failure during {operation}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Errors from parsing user-entered field text.
///
/// Raised instead of silently discarding bad input; the previous value of
/// the field is always retained when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("Not a number: {text:?}")]
    NotANumber { text: String },

    #[error("{field} must be greater than zero (got {value})")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must be a whole number of at least {min} (got {text:?})")]
    TooSmall {
        field: &'static str,
        min: u32,
        text: String,
    },
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
