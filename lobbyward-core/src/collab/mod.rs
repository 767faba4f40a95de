//! Collaborator traits: the narrow seams through which the core reaches the
//! outside world.
//!
//! Rendering, notification delivery, profile resolution, authority checks
//! and membership actions are all external concerns. The core only ever
//! calls these traits; tests and the CLI plug in in-process implementations.

use crate::event::EventView;
use crate::rent::PoolView;
use crate::types::{ChannelId, RenderHandle, UserId};
use crate::verify::ProfileLink;
use async_trait::async_trait;
use thiserror::Error;

/// Collaborator failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollabError {
    /// The render/notify target is gone or the collaborator cannot be reached
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// The addressed external entity does not exist
    #[error("not found: {0}")]
    NotFound(String),
}

/// Profile data returned by the external identity resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProfile {
    /// Display name to apply to the verified member
    pub display_name: String,
}

/// Renders pool and event state onto whatever surface the platform provides
#[async_trait]
pub trait Presenter: Send + Sync {
    /// Render a pool for the first time, returning the handle used for
    /// subsequent updates
    async fn render_pool(
        &self,
        channel: &ChannelId,
        view: &PoolView,
    ) -> Result<RenderHandle, CollabError>;

    /// Update an existing pool rendering. `Unreachable` means the target
    /// was deleted and will never come back.
    async fn update_pool(&self, handle: &RenderHandle, view: &PoolView)
        -> Result<(), CollabError>;

    /// Render an event for the first time
    async fn render_event(
        &self,
        channel: &ChannelId,
        view: &EventView,
    ) -> Result<RenderHandle, CollabError>;

    /// Update an existing event rendering
    async fn update_event(
        &self,
        handle: &RenderHandle,
        view: &EventView,
    ) -> Result<(), CollabError>;

    /// Post a free-text announcement to a channel
    async fn announce(&self, channel: &ChannelId, text: &str) -> Result<(), CollabError>;
}

/// Delivers a direct message to a member, best-effort
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user: &UserId, text: &str) -> Result<(), CollabError>;
}

/// Resolves a submitted profile link against the third-party identity API
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, link: &ProfileLink) -> Result<ExternalProfile, CollabError>;
}

/// Externally supplied authority predicates over a member's role set
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Whether the actor may perform privileged operations
    async fn is_privileged(&self, user: &UserId) -> bool;

    /// Whether the actor carries the membership tag required for slot
    /// requests and event joins
    async fn has_required_tag(&self, user: &UserId) -> bool;
}

/// Applies membership-level actions decided by the core
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Set a member's display name
    async fn set_display_name(&self, user: &UserId, name: &str) -> Result<(), CollabError>;

    /// Grant the access tag that unlocks the space
    async fn grant_access_tag(&self, user: &UserId) -> Result<(), CollabError>;

    /// Remove the member from the space
    async fn revoke_membership(&self, user: &UserId, reason: &str) -> Result<(), CollabError>;
}
