//! Errors raised while converting and navigating dynamic values

use std::fmt::Display;

#[derive(Debug, thiserror::Error)]
pub enum TfplugError {
    #[error("{format} encoding failed: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },

    #[error("{format} decoding failed: {message}")]
    Decode {
        format: &'static str,
        message: String,
    },

    #[error("value is not known until apply")]
    UnknownValue,

    #[error("type mismatch at {path}: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("attribute not found: {0}")]
    AttributeNotFound(String),

    #[error("invalid attribute path: {0}")]
    InvalidPath(String),
}

impl TfplugError {
    pub(crate) fn encode(format: &'static str, err: impl Display) -> Self {
        TfplugError::Encode {
            format,
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(format: &'static str, err: impl Display) -> Self {
        TfplugError::Decode {
            format,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TfplugError>;
