//! Coordinator: wires external triggers to the registries.
//!
//! Every mutation goes through here. The coordinator validates actor
//! authority and resource preconditions first, commits the state change
//! under the owning registry's lock, and only then talks to the
//! presentation/notification collaborators; render and notify failures
//! never roll back committed state. Deadlines are tasks in the
//! [`TaskScheduler`], keyed by the owning entity, so deleting an entity and
//! cancelling its timer is one step.

use crate::booking::BookingRequest;
use crate::collab::{
    Authorizer, ExternalProfile, IdentityResolver, MemberDirectory, Notifier, Presenter,
};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::event::{
    EmptyLobbyPolicy, EventError, EventPhase, EventRegistry, EventView, AfterActivationPolicy,
    LobbyEvent,
};
use crate::parse;
use crate::rent::{PoolView, RentPool, RentRegistry, SlotRequest};
use crate::sched::{TaskKey, TaskScheduler};
use crate::types::{ChannelId, EventId, Timestamp, UserId};
use crate::verify::{ProfileLink, VerificationTracker, VerifyError};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// The external collaborators the coordinator talks to
#[derive(Clone)]
pub struct Collaborators {
    pub presenter: Arc<dyn Presenter>,
    pub notifier: Arc<dyn Notifier>,
    pub resolver: Arc<dyn IdentityResolver>,
    pub authorizer: Arc<dyn Authorizer>,
    pub directory: Arc<dyn MemberDirectory>,
}

/// Orchestration layer owning the registries, the scheduler and the
/// collaborator handles. Shared as `Arc<Coordinator>`; operations that arm
/// timers take `self: &Arc<Self>` so the scheduled job can hold the
/// coordinator alive.
pub struct Coordinator {
    config: Config,
    rents: RwLock<RentRegistry>,
    events: RwLock<EventRegistry>,
    verifications: RwLock<VerificationTracker>,
    sched: TaskScheduler,
    collab: Collaborators,
}

impl Coordinator {
    pub fn new(config: Config, collab: Collaborators) -> Self {
        Coordinator {
            config,
            rents: RwLock::new(RentRegistry::new()),
            events: RwLock::new(EventRegistry::new()),
            verifications: RwLock::new(VerificationTracker::new()),
            sched: TaskScheduler::new(),
            collab,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.sched
    }

    /// Cancel every outstanding task. All state is volatile; nothing else
    /// needs flushing.
    pub fn shutdown(&self) {
        self.sched.cancel_all();
        info!("coordinator shut down");
    }

    async fn require_privilege(&self, actor: &UserId) -> CoreResult<()> {
        if self.collab.authorizer.is_privileged(actor).await {
            Ok(())
        } else {
            Err(CoreError::NotPrivileged)
        }
    }

    // ------------------------------------------------------------------
    // Rent slot pools
    // ------------------------------------------------------------------

    /// Create a rent pool in a channel. Privileged; fails if the channel
    /// already has one. The initial render is load-bearing: without a
    /// render target the pool would self-delete on its first refresh, so a
    /// failure here surfaces and nothing is registered.
    pub async fn create_rent_system(
        self: &Arc<Self>,
        channel: ChannelId,
        actor: &UserId,
    ) -> CoreResult<()> {
        self.require_privilege(actor).await?;

        if self.rents.read().await.contains(&channel) {
            return Err(CoreError::PreconditionFailed(format!(
                "channel {channel} already has a rent pool"
            )));
        }

        let handle = self
            .collab
            .presenter
            .render_pool(&channel, &PoolView::empty(&channel))
            .await
            .map_err(CoreError::from)?;

        let pool_count = {
            let mut rents = self.rents.write().await;
            rents.create(RentPool::new(channel.clone(), handle))?;
            rents.len()
        };
        crate::metrics::set_active_pools(pool_count);

        self.spawn_refresh(channel.clone());
        info!(channel = %channel, "rent pool created");
        Ok(())
    }

    /// Tear down a channel's rent pool and its refresh task. Privileged.
    pub async fn teardown_rent_system(
        &self,
        channel: &ChannelId,
        actor: &UserId,
    ) -> CoreResult<()> {
        self.require_privilege(actor).await?;

        let pool_count = {
            let mut rents = self.rents.write().await;
            rents.remove(channel)?;
            rents.len()
        };
        self.sched.cancel(&TaskKey::PoolRefresh(channel.clone()));
        crate::metrics::set_active_pools(pool_count);

        info!(channel = %channel, "rent pool torn down");
        Ok(())
    }

    /// Ask to rent a slot. Requires the membership tag; fails while the
    /// slot is occupied or mid-request. Returns the stored request for the
    /// caller to surface to privileged approvers.
    pub async fn request_slot(
        &self,
        channel: &ChannelId,
        index: usize,
        requester: &UserId,
    ) -> CoreResult<SlotRequest> {
        if !self.collab.authorizer.has_required_tag(requester).await {
            return Err(CoreError::PreconditionFailed(
                "only verified members may rent a slot".to_string(),
            ));
        }

        let now = Timestamp::now();
        let (request, view, handle) = {
            let mut rents = self.rents.write().await;
            let pool = rents.get_mut(channel)?;
            let request = pool.request(index, requester.clone(), now)?;
            (request, pool.view(now), pool.render().clone())
        };
        crate::metrics::slot_requested();

        if let Err(e) = self.collab.presenter.update_pool(&handle, &view).await {
            warn!(channel = %channel, error = %e, "pool render update failed after request");
        }
        info!(channel = %channel, slot = index, requester = %requester, "slot requested");
        Ok(request)
    }

    /// Approve a pending slot request, occupying the slot for the
    /// configured rent duration. Privileged.
    pub async fn approve_slot(
        &self,
        channel: &ChannelId,
        index: usize,
        actor: &UserId,
    ) -> CoreResult<UserId> {
        self.require_privilege(actor).await?;

        let now = Timestamp::now();
        let (occupant, expires, view, handle) = {
            let mut rents = self.rents.write().await;
            let pool = rents.get_mut(channel)?;
            let (occupant, expires) = pool.approve(index, now, self.config.rent.rent_duration)?;
            (occupant, expires, pool.view(now), pool.render().clone())
        };
        crate::metrics::slot_approved();

        if let Err(e) = self.collab.presenter.update_pool(&handle, &view).await {
            warn!(channel = %channel, error = %e, "pool render update failed after approval");
        }
        info!(
            channel = %channel,
            slot = index,
            occupant = %occupant,
            expires_at = %expires,
            "slot approved"
        );
        Ok(occupant)
    }

    /// Deny a pending slot request, returning the slot to Available.
    /// Privileged.
    pub async fn deny_slot(
        &self,
        channel: &ChannelId,
        index: usize,
        actor: &UserId,
    ) -> CoreResult<UserId> {
        self.require_privilege(actor).await?;

        let now = Timestamp::now();
        let (denied, view, handle) = {
            let mut rents = self.rents.write().await;
            let pool = rents.get_mut(channel)?;
            let denied = pool.deny(index)?;
            (denied, pool.view(now), pool.render().clone())
        };
        crate::metrics::slot_denied();

        if let Err(e) = self.collab.presenter.update_pool(&handle, &view).await {
            warn!(channel = %channel, error = %e, "pool render update failed after denial");
        }
        info!(channel = %channel, slot = index, denied = %denied, "slot request denied");
        Ok(denied)
    }

    /// Current observable state of a channel's pool
    pub async fn pool_view(&self, channel: &ChannelId) -> CoreResult<PoolView> {
        let rents = self.rents.read().await;
        Ok(rents.get(channel)?.view(Timestamp::now()))
    }

    pub async fn has_pool(&self, channel: &ChannelId) -> bool {
        self.rents.read().await.contains(channel)
    }

    fn spawn_refresh(self: &Arc<Self>, channel: ChannelId) {
        let me = Arc::clone(self);
        let key = TaskKey::PoolRefresh(channel.clone());
        self.sched
            .schedule_repeating(key, self.config.rent.refresh_interval, move || {
                let me = Arc::clone(&me);
                let channel = channel.clone();
                async move { me.refresh_pool(&channel).await }
            });
    }

    /// One refresh tick: clear lapsed slots and re-render. When the render
    /// target is gone the pool is deleted and the task stops itself.
    async fn refresh_pool(&self, channel: &ChannelId) -> ControlFlow<()> {
        let now = Timestamp::now();
        let (view, handle, expired) = {
            let mut rents = self.rents.write().await;
            let Ok(pool) = rents.get_mut(channel) else {
                return ControlFlow::Break(());
            };
            let expired = pool.expire_lapsed(now);
            (pool.view(now), pool.render().clone(), expired)
        };
        if expired > 0 {
            crate::metrics::slots_expired(expired);
            debug!(channel = %channel, expired, "cleared lapsed slots");
        }

        match self.collab.presenter.update_pool(&handle, &view).await {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => {
                warn!(channel = %channel, error = %e, "render target gone; tearing down rent pool");
                let pool_count = {
                    let mut rents = self.rents.write().await;
                    let _ = rents.remove(channel);
                    rents.len()
                };
                crate::metrics::set_active_pools(pool_count);
                ControlFlow::Break(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Lobby events
    // ------------------------------------------------------------------

    /// Create a scheduled lobby event. Privileged. The schedule text runs
    /// through the deadline parser and must resolve at least the configured
    /// lead time into the future.
    pub async fn create_event(
        self: &Arc<Self>,
        channel: ChannelId,
        name: &str,
        description: &str,
        when_text: &str,
        max_slots: u8,
        actor: &UserId,
    ) -> CoreResult<EventId> {
        self.require_privilege(actor).await?;

        let start = parse::parse_deadline_with(
            when_text,
            chrono::Local::now(),
            self.config.events.default_start_hour,
        )
        .ok_or_else(|| CoreError::from(EventError::InvalidSchedule(when_text.to_string())))?;

        let now = Timestamp::now();
        let start_at = Timestamp::from_millis(start.timestamp_millis().max(0) as u64);
        let lead = start_at.saturating_since(now);
        if lead < self.config.events.min_lead_time {
            return Err(EventError::InvalidSchedule(when_text.to_string()).into());
        }

        let (id, view) = {
            let mut events = self.events.write().await;
            let id = events.allocate_id(now);
            let event = LobbyEvent::new(
                id.clone(),
                name,
                description,
                start_at,
                max_slots,
                channel.clone(),
            )?;
            let view = event.view();
            events.insert(event);
            (id, view)
        };
        crate::metrics::event_created();

        // Rendering is best-effort; the event exists either way.
        match self.collab.presenter.render_event(&channel, &view).await {
            Ok(handle) => {
                if let Ok(event) = self.events.write().await.get_mut(&id) {
                    event.set_render(handle);
                }
            }
            Err(e) => warn!(event = %id, error = %e, "event render failed"),
        }

        let me = Arc::clone(self);
        let task_id = id.clone();
        self.sched
            .schedule_once(TaskKey::EventStart(id.clone()), lead, move || async move {
                me.run_activation(&task_id, false).await;
            });

        info!(event = %id, channel = %channel, starts_at = %start_at, "event created");
        Ok(id)
    }

    /// Join an event's roster. Requires the membership tag. The roster
    /// closes exactly when capacity is reached.
    pub async fn join_event(&self, id: &EventId, user: &UserId) -> CoreResult<usize> {
        let now = Timestamp::now();
        {
            let events = self.events.read().await;
            events.get(id)?.precheck_join(user, now)?;
        }
        if !self.collab.authorizer.has_required_tag(user).await {
            return Err(EventError::NotEligible.into());
        }

        let (count, view, handle, channel) = {
            let mut events = self.events.write().await;
            let event = events.get_mut(id)?;
            let count = event.join(user.clone(), now)?;
            (
                count,
                event.view(),
                event.render().cloned(),
                event.origin_channel().clone(),
            )
        };
        crate::metrics::event_joined();

        if let Some(handle) = handle {
            if let Err(e) = self.collab.presenter.update_event(&handle, &view).await {
                warn!(event = %id, error = %e, "event render update failed after join");
            }
        }
        let _ = self
            .collab
            .presenter
            .announce(
                &channel,
                &format!("{} joined! ({}/{})", user, count, view.capacity),
            )
            .await;

        info!(event = %id, user = %user, count, "event join accepted");
        Ok(count)
    }

    /// Cancel an event before it starts. Privileged. The start timer is
    /// cancelled together with the entry; updating the original rendering
    /// is best-effort.
    pub async fn cancel_event(&self, id: &EventId, actor: &UserId) -> CoreResult<()> {
        self.require_privilege(actor).await?;

        let event = {
            self.events
                .write()
                .await
                .take(id)
                .ok_or_else(|| EventError::NotFound(id.clone()))?
        };
        self.sched.cancel(&TaskKey::EventStart(id.clone()));
        crate::metrics::event_cancelled();

        if let Some(handle) = event.render() {
            if let Err(e) = self
                .collab
                .presenter
                .update_event(handle, &event.view_as(EventPhase::Cancelled))
                .await
            {
                debug!(event = %id, error = %e, "cancelled-event render update failed");
            }
        }

        info!(event = %id, "event cancelled");
        Ok(())
    }

    /// Activate an event now instead of waiting for its timer. Privileged;
    /// fails if the event does not exist.
    pub async fn manual_activate(self: &Arc<Self>, id: &EventId, actor: &UserId) -> CoreResult<()> {
        self.require_privilege(actor).await?;
        {
            let events = self.events.read().await;
            events.get(id)?;
        }
        self.sched.cancel(&TaskKey::EventStart(id.clone()));
        self.run_activation(id, true).await;
        Ok(())
    }

    /// Timer-driven activation entry point. A no-op when the event is
    /// already gone: cancellation may race the timer fire.
    pub async fn activate_event(self: &Arc<Self>, id: &EventId) {
        self.run_activation(id, false).await;
    }

    async fn run_activation(self: &Arc<Self>, id: &EventId, manual: bool) {
        let mut event = {
            let Some(event) = self.events.write().await.take(id) else {
                debug!(event = %id, "activation fired for a gone event; ignoring");
                return;
            };
            event
        };
        self.sched.cancel(&TaskKey::EventStart(id.clone()));

        let channel = event.origin_channel().clone();

        if event.participants().is_empty()
            && self.config.events.empty_lobby == EmptyLobbyPolicy::CancelAndAnnounce
        {
            crate::metrics::event_cancelled();
            let _ = self
                .collab
                .presenter
                .announce(
                    &channel,
                    &format!("Event \"{}\" cancelled: nobody joined.", event.name()),
                )
                .await;
            if let Some(handle) = event.render() {
                let _ = self
                    .collab
                    .presenter
                    .update_event(handle, &event.view_as(EventPhase::Cancelled))
                    .await;
            }
            info!(event = %id, "event dropped at start with empty roster");
            return;
        }

        if manual {
            crate::metrics::event_activated_manually();
        } else {
            crate::metrics::event_activated_by_timer();
        }

        event.mark_started();
        if self.config.events.after_activation == AfterActivationPolicy::RetainOpen {
            self.events.write().await.insert(event.clone());
        }

        let roster = event
            .participants()
            .iter()
            .map(|u| u.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let text = if roster.is_empty() {
            format!("Event \"{}\" started with an empty roster.", event.name())
        } else {
            format!(
                "Event \"{}\" started! Participants: {}",
                event.name(),
                roster
            )
        };
        let _ = self.collab.presenter.announce(&channel, &text).await;

        if let Some(handle) = event.render() {
            let _ = self
                .collab
                .presenter
                .update_event(handle, &event.view_as(EventPhase::Started))
                .await;
        }

        if let Err(e) = self.install_pool(channel.clone()).await {
            warn!(event = %id, channel = %channel, error = %e, "pool hand-off failed");
        }

        info!(event = %id, channel = %channel, manual, "event activated");
    }

    /// Install a fresh pool for an activated event, displacing any pool the
    /// channel already had (its refresh task is replaced under the same
    /// key).
    async fn install_pool(self: &Arc<Self>, channel: ChannelId) -> CoreResult<()> {
        let handle = self
            .collab
            .presenter
            .render_pool(&channel, &PoolView::empty(&channel))
            .await
            .map_err(CoreError::from)?;

        let (displaced, pool_count) = {
            let mut rents = self.rents.write().await;
            let displaced = rents.replace(RentPool::new(channel.clone(), handle));
            (displaced.is_some(), rents.len())
        };
        if displaced {
            debug!(channel = %channel, "displaced existing rent pool");
        }
        crate::metrics::set_active_pools(pool_count);

        self.spawn_refresh(channel);
        Ok(())
    }

    /// Current observable state of an event
    pub async fn event_view(&self, id: &EventId) -> CoreResult<EventView> {
        let events = self.events.read().await;
        Ok(events.get(id)?.view())
    }

    pub async fn has_event(&self, id: &EventId) -> bool {
        self.events.read().await.contains(id)
    }

    // ------------------------------------------------------------------
    // Identity verification
    // ------------------------------------------------------------------

    /// A new member joined: open their verification window and arm its
    /// deadline.
    pub async fn member_joined(self: &Arc<Self>, user: UserId) {
        let window = self.config.verification.window;
        let deadline = Timestamp::now().saturating_add(window);

        let pending_count = {
            let mut verifications = self.verifications.write().await;
            verifications.begin(user.clone(), deadline);
            verifications.len()
        };
        crate::metrics::set_pending_verifications(pending_count);

        let me = Arc::clone(self);
        let task_user = user.clone();
        self.sched.schedule_once(
            TaskKey::VerifyDeadline(user.clone()),
            window,
            move || async move {
                me.verification_deadline(&task_user).await;
            },
        );

        if let Err(e) = self
            .collab
            .notifier
            .notify(
                &user,
                &format!(
                    "Welcome! Send your profile link within {} or you will be removed.",
                    describe_window(window)
                ),
            )
            .await
        {
            debug!(user = %user, error = %e, "welcome notification failed");
        }
        info!(user = %user, deadline = %deadline, "verification window opened");
    }

    /// Deadline fired: remove the member unless a submission got there
    /// first, in which case the entry is gone and this is a no-op.
    async fn verification_deadline(&self, user: &UserId) {
        let entry = { self.verifications.write().await.take(user) };
        if entry.is_none() {
            debug!(user = %user, "verification deadline fired after resolution; ignoring");
            return;
        }
        let pending_count = self.verifications.read().await.len();
        crate::metrics::set_pending_verifications(pending_count);
        crate::metrics::verification_expired();

        if let Err(e) = self
            .collab
            .directory
            .revoke_membership(user, "verification window expired")
            .await
        {
            warn!(user = %user, error = %e, "failed to remove unverified member");
        }
        info!(user = %user, "member removed after missing verification window");
    }

    /// A pending member submitted text. A well-formed link commits the
    /// single attempt (the entry and its deadline go away before the slow
    /// resolution step) while malformed text leaves the window untouched
    /// so the member can retry.
    pub async fn submit_verification(
        &self,
        user: &UserId,
        text: &str,
    ) -> CoreResult<ExternalProfile> {
        {
            let verifications = self.verifications.read().await;
            if !verifications.contains(user) {
                return Err(VerifyError::NotPending(user.clone()).into());
            }
        }

        let Some(link) = ProfileLink::parse(text) else {
            let _ = self
                .collab
                .notifier
                .notify(user, "Wrong format! Send a steamcommunity.com profile link.")
                .await;
            return Err(VerifyError::InvalidLink.into());
        };

        // Commit the attempt before resolution can suspend us.
        {
            let mut verifications = self.verifications.write().await;
            if verifications.take(user).is_none() {
                return Err(VerifyError::NotPending(user.clone()).into());
            }
        }
        self.sched.cancel(&TaskKey::VerifyDeadline(user.clone()));
        let pending_count = self.verifications.read().await.len();
        crate::metrics::set_pending_verifications(pending_count);

        match self.collab.resolver.resolve(&link).await {
            Ok(profile) => {
                if let Err(e) = self
                    .collab
                    .directory
                    .set_display_name(user, &profile.display_name)
                    .await
                {
                    warn!(user = %user, error = %e, "failed to set display name");
                }
                if let Err(e) = self.collab.directory.grant_access_tag(user).await {
                    warn!(user = %user, error = %e, "failed to grant access tag");
                }
                let _ = self
                    .collab
                    .notifier
                    .notify(
                        user,
                        &format!("Verification successful! Welcome {}!", profile.display_name),
                    )
                    .await;
                crate::metrics::verification_resolved();
                info!(user = %user, link = %link, "verification resolved");
                Ok(profile)
            }
            Err(e) => {
                crate::metrics::verification_failed();
                let _ = self
                    .collab
                    .notifier
                    .notify(user, "Invalid link or private profile.")
                    .await;
                warn!(user = %user, link = %link, error = %e, "verification resolution failed");
                Err(VerifyError::ResolutionFailed(e.to_string()).into())
            }
        }
    }

    pub async fn is_pending_verification(&self, user: &UserId) -> bool {
        self.verifications.read().await.contains(user)
    }

    // ------------------------------------------------------------------
    // Reservation requests
    // ------------------------------------------------------------------

    /// Fan a reservation request out to the configured reviewers. Returns
    /// how many reviewers were reached; unreachable reviewers are logged
    /// and skipped.
    pub async fn submit_booking(
        &self,
        user: &UserId,
        display_name: &str,
        date: &str,
        time: &str,
    ) -> CoreResult<usize> {
        let request = BookingRequest::new(user.clone(), display_name, date, time)?;
        let summary = request.summary();

        let mut delivered = 0;
        for reviewer in &self.config.booking.reviewers {
            match self.collab.notifier.notify(reviewer, &summary).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(reviewer = %reviewer, error = %e, "reservation fan-out failed")
                }
            }
        }
        crate::metrics::booking_submitted();

        let _ = self
            .collab
            .notifier
            .notify(user, "Reservation request sent!")
            .await;

        info!(user = %user, delivered, "reservation request fanned out");
        Ok(delivered)
    }
}

fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("{} minutes", secs / 60)
    } else {
        format!("{} seconds", secs.max(1))
    }
}
