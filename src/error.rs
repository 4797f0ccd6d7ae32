//! Error types.
//!
//! Library code returns [`CbcError`]. The binary converts it into an [`AppError`]
//! carrying the process exit code:
//!
//! - `2`: configuration or input problems (bad flags, files, network specs)
//! - `3`: data problems (an event outside the waveform model's domain)
//! - `4`: numerical or output failures

use std::path::PathBuf;

/// Errors raised by the simulation library.
#[derive(Debug, thiserror::Error)]
pub enum CbcError {
    /// An event's parameters are outside the waveform model's valid domain.
    #[error("invalid parameters for event {event}: {reason}")]
    InvalidParameters { event: usize, reason: String },

    #[error("unknown waveform model '{0}' (expected one of: newtonian, taylorf2)")]
    UnknownWaveformModel(String),

    #[error("malformed network specification: {0}")]
    MalformedNetworkSpec(String),

    #[error("population error: {0}")]
    Population(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("numerical error: {0}")]
    Numerical(String),
}

impl CbcError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CbcError::UnknownWaveformModel(_)
            | CbcError::MalformedNetworkSpec(_)
            | CbcError::Population(_)
            | CbcError::Config(_) => 2,
            CbcError::InvalidParameters { .. } => 3,
            CbcError::Io { .. } | CbcError::Numerical(_) => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<CbcError> for AppError {
    fn from(err: CbcError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
