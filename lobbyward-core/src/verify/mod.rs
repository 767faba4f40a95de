//! Time-boxed identity verification for newly joined members.
//!
//! A joining member gets a deadline to submit a profile link. Submitting a
//! well-formed link commits the single verification attempt: the entry is
//! removed and the deadline cancelled before the (potentially slow) external
//! resolution runs, so a failed resolution never re-arms a deadline.

mod link;
mod tracker;

pub use link::ProfileLink;
pub use tracker::{PendingVerification, VerificationTracker};

use crate::types::UserId;

/// Verification errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// The member has no open verification window
    #[error("no pending verification for {0}")]
    NotPending(UserId),

    /// The submitted text is not a recognizable profile link
    #[error("unrecognized profile link; send a steamcommunity.com/profiles/... or /id/... URL")]
    InvalidLink,

    /// The external resolver rejected or could not reach the profile
    #[error("profile resolution failed: {0}")]
    ResolutionFailed(String),
}
