//! Pending verification entries keyed by member

use crate::types::{Timestamp, UserId};
use std::collections::HashMap;

/// One member's open verification window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVerification {
    pub user: UserId,
    pub deadline: Timestamp,
}

/// All members currently inside their verification window.
///
/// Successful submission and deadline firing race for the same entry; both
/// go through [`take`](VerificationTracker::take), so whichever runs second
/// sees `None` and becomes a no-op.
#[derive(Debug, Default)]
pub struct VerificationTracker {
    pending: HashMap<UserId, PendingVerification>,
}

impl VerificationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or restart) a member's window. A re-join while still pending
    /// replaces the entry; the caller re-arms the deadline task under the
    /// same key, which cancels the previous one.
    pub fn begin(&mut self, user: UserId, deadline: Timestamp) -> PendingVerification {
        let entry = PendingVerification {
            user: user.clone(),
            deadline,
        };
        self.pending.insert(user, entry.clone());
        entry
    }

    /// Remove and return a member's entry, if still present
    pub fn take(&mut self, user: &UserId) -> Option<PendingVerification> {
        self.pending.remove(user)
    }

    pub fn get(&self, user: &UserId) -> Option<&PendingVerification> {
        self.pending.get(user)
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.pending.contains_key(user)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
