use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the pipeline.
///
/// Extraction failures never bubble out of a batch loop (they become error
/// records, see [`crate::extract`]); everything else propagates so callers
/// can tell skip-and-continue apart from abort.
#[derive(Error, Debug)]
pub enum RtqaError {
    #[error("cannot parse {path:?} as DICOM: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("cannot decode image {path:?}: {message}")]
    ImageDecode { path: PathBuf, message: String },

    #[error("cannot write {path:?}: {message}")]
    Write { path: PathBuf, message: String },

    #[error("invalid conversion parameters: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    InvalidParameters(Vec<ParameterError>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single per-field validation failure for conversion parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ParameterError {
    pub field: &'static str,
    pub message: String,
}

impl ParameterError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RtqaError>;
