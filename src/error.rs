use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    /// The source file itself is missing or unreadable.
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Probe not available: {0}")]
    ProbeUnavailable(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Decoded size of {pixels} pixels exceeds the limit of {limit}")]
    ResourceExhausted { pixels: u64, limit: u64 },

    /// I/O failure while talking to an external tool or a temp artifact.
    #[error("Tool IO error: {0}")]
    Tool(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Config key {key} is not of type {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("Unknown routine: {0}")]
    UnknownRoutine(String),
}

impl MediaError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MediaError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error describes the input or the environment (and may be
    /// degraded to "no data"), rather than a defect in the calling code.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MediaError::ProbeUnavailable(_)
                | MediaError::MalformedInput(_)
                | MediaError::ResourceExhausted { .. }
                | MediaError::Tool(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
