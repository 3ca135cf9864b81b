//! Error types surfaced by the environment core.

use strata_utils::WorldId;
use thiserror::Error;

use crate::store::StoreError;

/// Failure of an environment query or a chunk lookup.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    /// The world id has no configuration in the backing store.
    #[error("world {0} not found")]
    WorldNotFound(WorldId),
    /// The backing store failed or is shutting down.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The request was rejected before any computation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl EnvironmentError {
    /// Whether the failure is a transient store condition a caller may retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_transient())
    }
}

/// Malformed input, rejected up front.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The world id is not a valid uuid.
    #[error("invalid world id {0:?}")]
    InvalidWorldId(String),
    /// A coordinate was NaN or infinite.
    #[error("coordinates must be finite numbers")]
    NonFiniteCoordinate,
    /// A viewport whose minimum exceeds its maximum on some axis.
    #[error("invalid viewport on the {axis} axis: min {min} > max {max}")]
    InvalidViewport {
        /// Offending axis name.
        axis: &'static str,
        /// Requested minimum.
        min: i32,
        /// Requested maximum.
        max: i32,
    },
    /// A configuration value outside its allowed range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
