//! Crate-level error taxonomy.
//!
//! Module errors (`RentError`, `EventError`, `VerifyError`, ...) carry the
//! precise failure; `CoreError` folds them into the five categories the
//! coordinator surfaces to a triggering actor. None of these mutate state
//! and none are fatal to the process.

use crate::booking::BookingError;
use crate::collab::CollabError;
use crate::event::EventError;
use crate::rent::RentError;
use crate::verify::VerifyError;
use thiserror::Error;

/// Result type for coordinator operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors surfaced to the actor that triggered an operation
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed input (bad schedule text, out-of-range capacity, bad link)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The operation is well-formed but the resource state forbids it
    #[error("{0}")]
    PreconditionFailed(String),

    /// Actor lacks the required authority
    #[error("only privileged members may do this")]
    NotPrivileged,

    /// The addressed pool, event or pending entry does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A render/notify/resolve collaborator could not be reached
    #[error("collaborator unreachable: {0}")]
    CollaboratorUnreachable(String),
}

impl From<RentError> for CoreError {
    fn from(e: RentError) -> Self {
        match e {
            RentError::InvalidSlotIndex(_) => CoreError::InvalidInput(e.to_string()),
            RentError::PoolNotFound(_) => CoreError::NotFound(e.to_string()),
            RentError::SlotUnavailable(_)
            | RentError::NoPendingRequest(_)
            | RentError::PoolExists(_) => CoreError::PreconditionFailed(e.to_string()),
        }
    }
}

impl From<EventError> for CoreError {
    fn from(e: EventError) -> Self {
        match e {
            EventError::NotFound(_) => CoreError::NotFound(e.to_string()),
            EventError::InvalidCapacity(_) | EventError::InvalidSchedule(_) => {
                CoreError::InvalidInput(e.to_string())
            }
            EventError::AlreadyJoined
            | EventError::LobbyFull
            | EventError::AlreadyStarted
            | EventError::NotEligible => CoreError::PreconditionFailed(e.to_string()),
        }
    }
}

impl From<VerifyError> for CoreError {
    fn from(e: VerifyError) -> Self {
        match e {
            VerifyError::NotPending(_) => CoreError::NotFound(e.to_string()),
            VerifyError::InvalidLink => CoreError::InvalidInput(e.to_string()),
            VerifyError::ResolutionFailed(_) => CoreError::CollaboratorUnreachable(e.to_string()),
        }
    }
}

impl From<BookingError> for CoreError {
    fn from(e: BookingError) -> Self {
        CoreError::InvalidInput(e.to_string())
    }
}

impl From<CollabError> for CoreError {
    fn from(e: CollabError) -> Self {
        match e {
            CollabError::Unreachable(_) => CoreError::CollaboratorUnreachable(e.to_string()),
            CollabError::NotFound(_) => CoreError::NotFound(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChannelId;

    #[test]
    fn test_rent_error_mapping() {
        let err: CoreError = RentError::SlotUnavailable(1).into();
        assert!(matches!(err, CoreError::PreconditionFailed(_)));

        let err: CoreError = RentError::PoolNotFound(ChannelId::new("lobby")).into();
        assert!(matches!(err, CoreError::NotFound(_)));

        let err: CoreError = RentError::InvalidSlotIndex(7).into();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn test_event_error_mapping() {
        let err: CoreError = EventError::LobbyFull.into();
        assert!(matches!(err, CoreError::PreconditionFailed(_)));

        let err: CoreError = EventError::InvalidCapacity(9).into();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn test_errors_carry_readable_reasons() {
        let err: CoreError = EventError::LobbyFull.into();
        assert!(err.to_string().to_lowercase().contains("full"));
    }
}
