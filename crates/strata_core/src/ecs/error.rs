use thiserror::Error;

use crate::column::ColumnError;
use crate::pool::PoolError;

/// Errors surfaced by the engine.
///
/// Every failure is reported synchronously by the call that detected
/// it; there is no shared error state and nothing is retried. A failure
/// in the middle of a structural transition leaves that entity's
/// storage unspecified and must be treated as fatal for the entity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EcsError {
    #[error("{what} is at its configured maximum of {max}")]
    CapacityExceeded { what: &'static str, max: usize },

    #[error("invalid handle {bits:#x}")]
    InvalidHandle { bits: u64 },

    #[error("no component or system is registered under that name")]
    NotFound,

    #[error("allocation failure while growing engine storage")]
    AllocationFailure,

    #[error("component payload is {actual} bytes but {expected} are registered")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("component size must be nonzero")]
    ZeroSizeComponent,

    #[error("system '{name}' requires no components")]
    EmptyAccess { name: String },
}

// The only container error a correct engine can surface is a growth
// failure; out-of-bounds variants would mean a broken engine invariant.
impl From<PoolError> for EcsError {
    fn from(_: PoolError) -> Self {
        EcsError::AllocationFailure
    }
}

impl From<ColumnError> for EcsError {
    fn from(_: ColumnError) -> Self {
        EcsError::AllocationFailure
    }
}
