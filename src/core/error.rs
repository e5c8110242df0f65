//! Structured error handling for the streaming pipeline
//!
//! Provides a single error type for every stage of a synthesis call, from
//! configuration through phonemization, inference and audio output.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias with TtsError
pub type Result<T> = std::result::Result<T, TtsError>;

/// Main error type for the pipeline
#[derive(Error, Debug, Clone)]
pub enum TtsError {
    /// Invalid configuration (bad locale, out-of-range field, broken voice file).
    /// Raised before any synthesis work starts.
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// Failure reported by the external phonemization engine
    #[error("Phonemization error ({engine}): {message}")]
    Phonemization {
        engine: String,
        message: String,
    },

    /// Phoneme missing from the voice vocabulary
    #[error("Unknown phoneme {phoneme:?} at position {position} of clause {clause}")]
    UnknownPhoneme {
        phoneme: String,
        clause: usize,
        position: usize,
    },

    /// Failure while marshalling or running the neural model
    #[error("Synthesis error in {stage}: {message}")]
    Synthesis {
        stage: InferenceStage,
        message: String,
    },

    /// Audio encoding or sink errors
    #[error("Audio processing error ({operation}): {message}")]
    Audio {
        message: String,
        operation: AudioOperation,
    },

    /// I/O errors
    #[error("I/O error: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
    },

    /// Internal/bug errors
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        location: Option<String>,
    },
}

impl TtsError {
    /// Shorthand for a configuration error on a named field
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        TtsError::Configuration {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Shorthand for a synthesis error at the given stage
    pub fn synthesis(stage: InferenceStage, message: impl Into<String>) -> Self {
        TtsError::Synthesis {
            stage,
            message: message.into(),
        }
    }

    /// Shorthand for an internal error raised at a named location
    pub fn internal(location: impl Into<String>, message: impl Into<String>) -> Self {
        TtsError::Internal {
            message: message.into(),
            location: Some(location.into()),
        }
    }

    /// Whether the caller may continue the call after this error.
    ///
    /// Only unknown phonemes are recoverable; everything else aborts.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TtsError::UnknownPhoneme { .. })
    }
}

/// Inference adapter stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceStage {
    /// Building input tensors
    Marshalling,
    /// Placing inputs on an accelerator
    Device,
    /// The runtime forward pass
    ForwardPass,
    /// Reading the waveform back
    Unmarshalling,
}

impl fmt::Display for InferenceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceStage::Marshalling => write!(f, "input marshalling"),
            InferenceStage::Device => write!(f, "device placement"),
            InferenceStage::ForwardPass => write!(f, "forward pass"),
            InferenceStage::Unmarshalling => write!(f, "output unmarshalling"),
        }
    }
}

/// Audio operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioOperation {
    Encoding,
    Saving,
    Writing,
}

impl fmt::Display for AudioOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioOperation::Encoding => write!(f, "encoding"),
            AudioOperation::Saving => write!(f, "saving"),
            AudioOperation::Writing => write!(f, "writing"),
        }
    }
}

/// Convert from anyhow::Error (file loading paths use anyhow context chains)
impl From<anyhow::Error> for TtsError {
    fn from(err: anyhow::Error) -> Self {
        TtsError::Configuration {
            message: format!("{:#}", err),
            field: None,
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for TtsError {
    fn from(err: std::io::Error) -> Self {
        TtsError::Io {
            message: err.to_string(),
            path: None,
        }
    }
}

/// Convert from candle_core::Error
impl From<candle_core::Error> for TtsError {
    fn from(err: candle_core::Error) -> Self {
        TtsError::Synthesis {
            stage: InferenceStage::Marshalling,
            message: format!("Tensor operation failed: {}", err),
        }
    }
}

/// Convert from hound::Error
impl From<hound::Error> for TtsError {
    fn from(err: hound::Error) -> Self {
        TtsError::Audio {
            message: err.to_string(),
            operation: AudioOperation::Saving,
        }
    }
}
