// src/error.rs
use thiserror::Error;

/// Reasons a landmark payload is rejected before it reaches the frame buffer.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("malformed landmark JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected {expected} landmarks, got {actual}")]
    PointCount { expected: usize, actual: usize },

    #[error("landmark {index} has a non-finite coordinate")]
    NonFinite { index: usize },
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be a finite, non-negative number (got {value})")]
    InvalidScalar { field: &'static str, value: f64 },

    #[error("joints_per_finger must be between 1 and {max} (got {value})")]
    JointsPerFinger { value: usize, max: usize },

    #[error("tick_hz must be greater than zero")]
    ZeroTickRate,
}
