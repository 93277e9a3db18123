//! Error types for compositing.

use stack_common::{GridShape, TimeParseError};
use thiserror::Error;

/// Errors that can occur while building stacks or computing composites.
#[derive(Error, Debug)]
pub enum CompositeError {
    /// The stack holds no layers and the configured policy rejects that.
    #[error("observation stack is empty")]
    EmptyInput,

    /// A layer's shape differs from the stack shape.
    #[error("layer {index} has shape {found}, expected {expected}")]
    ShapeMismatch {
        index: usize,
        expected: GridShape,
        found: GridShape,
    },

    /// A parameter required by the requested operation was not supplied.
    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    /// A layer's buffers do not agree with its declared shape.
    #[error("invalid layer: {0}")]
    InvalidLayer(String),

    /// A mask does not fit the grid it is applied to.
    #[error("invalid mask: {0}")]
    InvalidMask(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed stack or composite document.
    #[error("document error: {0}")]
    Document(String),

    /// Malformed time or time interval.
    #[error(transparent)]
    Time(#[from] TimeParseError),
}

impl CompositeError {
    /// Create a MissingParameter error.
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter(name.into())
    }

    /// Create an InvalidLayer error.
    pub fn invalid_layer(msg: impl Into<String>) -> Self {
        Self::InvalidLayer(msg.into())
    }

    /// Create an InvalidMask error.
    pub fn invalid_mask(msg: impl Into<String>) -> Self {
        Self::InvalidMask(msg.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a Document error.
    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document(msg.into())
    }
}

impl From<std::io::Error> for CompositeError {
    fn from(err: std::io::Error) -> Self {
        Self::Document(err.to_string())
    }
}

impl From<serde_json::Error> for CompositeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Document(err.to_string())
    }
}

/// Result type for compositing operations.
pub type Result<T> = std::result::Result<T, CompositeError>;
