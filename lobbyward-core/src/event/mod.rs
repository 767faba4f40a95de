//! Scheduled lobby events with a capped roster.
//!
//! An event enrolls up to `max_slots` participants, then converts into a
//! rent pool in its origin channel when its start instant arrives (or a
//! privileged actor triggers it early). What happens to an empty or already
//! activated event is a configured policy, not an implicit behavior.

mod registry;

pub use registry::EventRegistry;

use crate::types::{ChannelId, EventId, RenderHandle, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Smallest allowed roster cap
pub const MIN_SLOTS: u8 = 1;
/// Largest allowed roster cap
pub const MAX_SLOTS: u8 = 3;

/// What to do when an event reaches its start with an empty roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyLobbyPolicy {
    /// Announce the cancellation and delete the event
    CancelAndAnnounce,
    /// Activate anyway with nobody enrolled
    ActivateEmpty,
}

/// What happens to an event once it has activated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AfterActivationPolicy {
    /// Remove the event; the pool is all that remains
    Delete,
    /// Keep the event registered and joinable until its roster fills
    RetainOpen,
}

/// Event operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("event {0} not found")]
    NotFound(EventId),

    #[error("you already joined this lobby")]
    AlreadyJoined,

    #[error("lobby is full")]
    LobbyFull,

    #[error("only verified members may join")]
    NotEligible,

    #[error("event closed or already started")]
    AlreadyStarted,

    #[error("slot count must be between {MIN_SLOTS} and {MAX_SLOTS}, got {0}")]
    InvalidCapacity(u8),

    #[error("invalid or past time: {0}")]
    InvalidSchedule(String),
}

/// Observable lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPhase {
    /// Enrolling, roster has room
    Open,
    /// Roster reached capacity; joins disabled
    Full,
    /// Cancelled by a privileged actor
    Cancelled,
    /// Converted into a rent pool
    Started,
}

/// Render model for an event, handed to the presentation collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventView {
    pub id: EventId,
    pub name: String,
    pub description: String,
    pub starts_at: Timestamp,
    pub capacity: u8,
    pub participants: Vec<UserId>,
    pub phase: EventPhase,
    /// Whether the join affordance should render enabled
    pub joinable: bool,
}

/// A scheduled gathering with a capped participant roster
#[derive(Debug, Clone)]
pub struct LobbyEvent {
    id: EventId,
    name: String,
    description: String,
    start_at: Timestamp,
    max_slots: u8,
    participants: Vec<UserId>,
    origin_channel: ChannelId,
    render: Option<RenderHandle>,
    /// Set when the event has activated but was retained open to late joins
    started: bool,
}

impl LobbyEvent {
    /// Create an event. The schedule must already be resolved and
    /// lead-time-checked by the caller; capacity is validated here.
    pub fn new(
        id: EventId,
        name: impl Into<String>,
        description: impl Into<String>,
        start_at: Timestamp,
        max_slots: u8,
        origin_channel: ChannelId,
    ) -> Result<Self, EventError> {
        if !(MIN_SLOTS..=MAX_SLOTS).contains(&max_slots) {
            return Err(EventError::InvalidCapacity(max_slots));
        }
        Ok(LobbyEvent {
            id,
            name: name.into(),
            description: description.into(),
            start_at,
            max_slots,
            participants: Vec::new(),
            origin_channel,
            render: None,
            started: false,
        })
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_at(&self) -> Timestamp {
        self.start_at
    }

    pub fn origin_channel(&self) -> &ChannelId {
        &self.origin_channel
    }

    pub fn participants(&self) -> &[UserId] {
        &self.participants
    }

    pub fn render(&self) -> Option<&RenderHandle> {
        self.render.as_ref()
    }

    pub fn set_render(&mut self, handle: RenderHandle) {
        self.render = Some(handle);
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.max_slots as usize
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Mark the event as activated-but-retained
    pub fn mark_started(&mut self) {
        self.started = true;
    }

    /// Validate a join without applying it
    pub fn precheck_join(&self, user: &UserId, now: Timestamp) -> Result<(), EventError> {
        // A retained event stays joinable past its start; an unstarted one
        // closes the moment its instant passes.
        if !self.started && now > self.start_at {
            return Err(EventError::AlreadyStarted);
        }
        if self.participants.contains(user) {
            return Err(EventError::AlreadyJoined);
        }
        if self.is_full() {
            return Err(EventError::LobbyFull);
        }
        Ok(())
    }

    /// Append `user` to the roster. Join order is preserved for display and
    /// carries no priority semantics. Returns the new roster size.
    pub fn join(&mut self, user: UserId, now: Timestamp) -> Result<usize, EventError> {
        self.precheck_join(&user, now)?;
        self.participants.push(user);
        Ok(self.participants.len())
    }

    /// Render model at the event's natural phase (Open or Full)
    pub fn view(&self) -> EventView {
        let phase = if self.started {
            EventPhase::Started
        } else if self.is_full() {
            EventPhase::Full
        } else {
            EventPhase::Open
        };
        self.view_as(phase)
    }

    /// Render model with an explicit phase (Cancelled/Started overlays)
    pub fn view_as(&self, phase: EventPhase) -> EventView {
        EventView {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            starts_at: self.start_at,
            capacity: self.max_slots,
            participants: self.participants.clone(),
            joinable: !self.is_full() && !matches!(phase, EventPhase::Cancelled),
            phase,
        }
    }
}
