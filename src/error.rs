//! Error types for the boundaries the simulation talks to
//!
//! None of these escape a simulation tick: callers log and skip.

use thiserror::Error;

use crate::sim::physics::BodyHandle;

/// Failure reported by a physics backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhysicsError {
    #[error("physics body {0:?} does not exist or was already removed")]
    UnknownBody(BodyHandle),
}

/// Failure reported by a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend is unavailable")]
    Unavailable,
    #[error("storage rejected write to `{key}`")]
    WriteRejected { key: String },
    #[error("failed to encode value for `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure loading or validating tuning data
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to parse tuning JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid range for `{field}`: {min} > {max}")]
    InvertedRange { field: &'static str, min: f32, max: f32 },
    #[error("probability `{field}` = {value} is outside [0, 1]")]
    Probability { field: &'static str, value: f32 },
    #[error("`{field}` must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },
}
