//! Rent pool data structures and slot state transitions

use crate::types::{format_remaining, ChannelId, RenderHandle, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of rentable slots per channel
pub const SLOT_COUNT: usize = 3;

/// Rent operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RentError {
    /// Slot is occupied or already has a pending request
    #[error("slot {0} is not available")]
    SlotUnavailable(usize),

    /// Approve/deny without a request to act on
    #[error("slot {0} has no pending request")]
    NoPendingRequest(usize),

    /// Index outside 0..SLOT_COUNT
    #[error("slot index {0} is out of range")]
    InvalidSlotIndex(usize),

    /// Channel already has a pool
    #[error("channel {0} already has a rent pool")]
    PoolExists(ChannelId),

    /// Channel has no pool
    #[error("channel {0} has no rent pool")]
    PoolNotFound(ChannelId),
}

/// A pending rental request awaiting privileged approval.
///
/// Stored in the model next to the slot; approval reads the requester from
/// here rather than from anything the presentation layer rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRequest {
    /// Index of the requested slot
    pub slot: usize,
    /// Member asking to rent it
    pub requester: UserId,
}

/// One rentable slot
#[derive(Debug, Clone, Default)]
pub struct RentSlot {
    occupant: Option<UserId>,
    expires_at: Option<Timestamp>,
    pending: Option<SlotRequest>,
}

impl RentSlot {
    /// Occupied means a live, unexpired occupant. A lapsed expiry reads as
    /// available even before the slot is cleared.
    pub fn is_occupied(&self, now: Timestamp) -> bool {
        match (&self.occupant, self.expires_at) {
            (Some(_), Some(expires)) => !expires.has_passed(now),
            _ => false,
        }
    }

    pub fn occupant(&self) -> Option<&UserId> {
        self.occupant.as_ref()
    }

    pub fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }

    pub fn pending_request(&self) -> Option<&SlotRequest> {
        self.pending.as_ref()
    }

    fn clear(&mut self) {
        self.occupant = None;
        self.expires_at = None;
    }
}

/// Observable status of one slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Requested { by: UserId },
    Occupied { by: UserId, remaining: String },
}

/// Render model for one slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotView {
    pub index: usize,
    pub label: String,
    pub status: SlotStatus,
}

/// Render model for a whole pool, handed to the presentation collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolView {
    pub channel: ChannelId,
    pub slots: Vec<SlotView>,
}

impl PoolView {
    /// View of a pool with every slot available (used before the pool's
    /// first render exists)
    pub fn empty(channel: &ChannelId) -> Self {
        PoolView {
            channel: channel.clone(),
            slots: (0..SLOT_COUNT)
                .map(|index| SlotView {
                    index,
                    label: format!("Slot {}", index + 1),
                    status: SlotStatus::Available,
                })
                .collect(),
        }
    }
}

/// The fixed set of three rental slots belonging to one channel
#[derive(Debug)]
pub struct RentPool {
    channel: ChannelId,
    slots: [RentSlot; SLOT_COUNT],
    render: RenderHandle,
}

impl RentPool {
    /// Create a pool bound to its channel and render target
    pub fn new(channel: ChannelId, render: RenderHandle) -> Self {
        RentPool {
            channel,
            slots: Default::default(),
            render,
        }
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn render(&self) -> &RenderHandle {
        &self.render
    }

    pub fn slot(&self, index: usize) -> Option<&RentSlot> {
        self.slots.get(index)
    }

    /// Move a slot into the Requested state.
    ///
    /// Fails if the slot is occupied (expiry not yet reached) or already
    /// mid-request. A lapsed occupant is cleared on the way in.
    pub fn request(
        &mut self,
        index: usize,
        requester: UserId,
        now: Timestamp,
    ) -> Result<SlotRequest, RentError> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(RentError::InvalidSlotIndex(index))?;

        if slot.is_occupied(now) || slot.pending.is_some() {
            return Err(RentError::SlotUnavailable(index));
        }

        slot.clear();
        let request = SlotRequest {
            slot: index,
            requester,
        };
        slot.pending = Some(request.clone());
        Ok(request)
    }

    /// Approve the pending request on a slot, occupying it until
    /// `now + duration`. Returns the new occupant and the expiry instant.
    pub fn approve(
        &mut self,
        index: usize,
        now: Timestamp,
        duration: Duration,
    ) -> Result<(UserId, Timestamp), RentError> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(RentError::InvalidSlotIndex(index))?;

        let request = slot.pending.take().ok_or(RentError::NoPendingRequest(index))?;
        let expires = now.saturating_add(duration);
        slot.occupant = Some(request.requester.clone());
        slot.expires_at = Some(expires);
        Ok((request.requester, expires))
    }

    /// Deny the pending request on a slot, returning it to Available.
    /// Returns the denied requester.
    pub fn deny(&mut self, index: usize) -> Result<UserId, RentError> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(RentError::InvalidSlotIndex(index))?;

        let request = slot.pending.take().ok_or(RentError::NoPendingRequest(index))?;
        Ok(request.requester)
    }

    /// Clear every slot whose expiry has passed. Idempotent; safe to call at
    /// any cadence. Returns how many slots were cleared.
    pub fn expire_lapsed(&mut self, now: Timestamp) -> usize {
        let mut cleared = 0;
        for slot in &mut self.slots {
            if matches!(slot.expires_at, Some(expires) if expires.has_passed(now)) {
                slot.clear();
                cleared += 1;
            }
        }
        cleared
    }

    /// Observable state of the pool at `now`. Lapsed slots read as
    /// Available even if `expire_lapsed` has not run yet.
    pub fn view(&self, now: Timestamp) -> PoolView {
        PoolView {
            channel: self.channel.clone(),
            slots: self
                .slots
                .iter()
                .enumerate()
                .map(|(index, slot)| {
                    let status = if slot.is_occupied(now) {
                        let remaining = slot
                            .expires_at
                            .expect("occupied slot has expiry")
                            .saturating_since(now);
                        SlotStatus::Occupied {
                            by: slot.occupant.clone().expect("occupied slot has occupant"),
                            remaining: format_remaining(remaining),
                        }
                    } else if let Some(request) = &slot.pending {
                        SlotStatus::Requested {
                            by: request.requester.clone(),
                        }
                    } else {
                        SlotStatus::Available
                    };
                    SlotView {
                        index,
                        label: format!("Slot {}", index + 1),
                        status,
                    }
                })
                .collect(),
        }
    }
}
