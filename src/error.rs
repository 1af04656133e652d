use thiserror::Error;

/// Errors raised by the analysis and refinement engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MotionError {
    /// Non-positive fps / sample rate / bpm, or out-of-range channel settings.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Malformed or unsupported audio. Aborts the whole batch.
    #[error("failed to decode '{source_name}': {message}")]
    Decode {
        source_name: String,
        message: String,
    },

    /// Refined track length differs from the raw track. Internal invariant.
    #[error("refined track has {actual} frames, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("unknown channel '{0}'")]
    UnknownChannel(String),

    #[error("analysis cancelled")]
    Cancelled,
}

impl MotionError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        MotionError::InvalidConfiguration(msg.into())
    }
}
