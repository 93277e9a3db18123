//! Error types shared by the scene-composite crates.

use thiserror::Error;

use crate::time::TimeParseError;

/// Result type alias using CommonError.
pub type CommonResult<T> = Result<T, CommonError>;

/// Errors raised while interpreting shared vocabulary (times, shapes, periods).
#[derive(Debug, Error)]
pub enum CommonError {
    #[error("Invalid time: {0}")]
    InvalidTime(#[from] TimeParseError),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),
}

impl CommonError {
    /// Create an InvalidParameter error.
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }
}
