//! In-memory collaborators and test configuration

use crate::collab::{
    Authorizer, CollabError, ExternalProfile, IdentityResolver, MemberDirectory, Notifier,
    Presenter,
};
use crate::config::Config;
use crate::coordinator::Collaborators;
use crate::event::EventView;
use crate::rent::PoolView;
use crate::types::{ChannelId, RenderHandle, UserId};
use crate::verify::ProfileLink;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A config with test-friendly durations: fast refresh, short rents.
/// Event and verification deadlines keep realistic values; tests drive
/// those with paused time.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.rent.rent_duration = Duration::from_millis(300);
    config.rent.refresh_interval = Duration::from_millis(20);
    config
}

/// Bundle of in-memory collaborators with handles kept for assertions
pub struct TestCollaborators {
    pub presenter: Arc<MemoryPresenter>,
    pub notifier: Arc<RecordingNotifier>,
    pub resolver: Arc<StubResolver>,
    pub authorizer: Arc<StaticAuthorizer>,
    pub directory: Arc<RecordingDirectory>,
}

impl TestCollaborators {
    /// Fixtures with a privileged "boss" and tagged members alice/bob/carol
    pub fn new() -> Self {
        let authorizer = StaticAuthorizer::new();
        authorizer.make_privileged(UserId::new("boss"));
        for name in ["alice", "bob", "carol", "boss"] {
            authorizer.grant_tag(UserId::new(name));
        }
        TestCollaborators {
            presenter: Arc::new(MemoryPresenter::new()),
            notifier: Arc::new(RecordingNotifier::new()),
            resolver: Arc::new(StubResolver::new()),
            authorizer: Arc::new(authorizer),
            directory: Arc::new(RecordingDirectory::new()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            presenter: self.presenter.clone(),
            notifier: self.notifier.clone(),
            resolver: self.resolver.clone(),
            authorizer: self.authorizer.clone(),
            directory: self.directory.clone(),
        }
    }
}

impl Default for TestCollaborators {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct PresenterInner {
    next_handle: u64,
    pools: HashMap<RenderHandle, PoolView>,
    events: HashMap<RenderHandle, EventView>,
    announcements: Vec<(ChannelId, String)>,
}

/// Presenter that renders into memory. Can be flipped unreachable to
/// simulate the platform deleting the render target.
#[derive(Default)]
pub struct MemoryPresenter {
    inner: Mutex<PresenterInner>,
    unreachable: AtomicBool,
}

impl MemoryPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every render call fail with `Unreachable` from now on
    pub fn set_unreachable(&self, flag: bool) {
        self.unreachable.store(flag, Ordering::SeqCst);
    }

    /// Simulate deletion of one rendered surface
    pub fn delete_render(&self, handle: &RenderHandle) {
        let mut inner = self.inner.lock().unwrap();
        inner.pools.remove(handle);
        inner.events.remove(handle);
    }

    pub fn announcements(&self) -> Vec<(ChannelId, String)> {
        self.inner.lock().unwrap().announcements.clone()
    }

    pub fn pool_view(&self, handle: &RenderHandle) -> Option<PoolView> {
        self.inner.lock().unwrap().pools.get(handle).cloned()
    }

    /// All currently rendered pool views
    pub fn pool_views(&self) -> Vec<PoolView> {
        self.inner.lock().unwrap().pools.values().cloned().collect()
    }

    /// All currently rendered event views
    pub fn event_views(&self) -> Vec<EventView> {
        self.inner.lock().unwrap().events.values().cloned().collect()
    }

    fn check_reachable(&self) -> Result<(), CollabError> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(CollabError::Unreachable("presenter offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn fresh_handle(inner: &mut PresenterInner) -> RenderHandle {
        inner.next_handle += 1;
        RenderHandle::new(format!("render-{}", inner.next_handle))
    }
}

#[async_trait]
impl Presenter for MemoryPresenter {
    async fn render_pool(
        &self,
        _channel: &ChannelId,
        view: &PoolView,
    ) -> Result<RenderHandle, CollabError> {
        self.check_reachable()?;
        let mut inner = self.inner.lock().unwrap();
        let handle = Self::fresh_handle(&mut inner);
        inner.pools.insert(handle.clone(), view.clone());
        Ok(handle)
    }

    async fn update_pool(
        &self,
        handle: &RenderHandle,
        view: &PoolView,
    ) -> Result<(), CollabError> {
        self.check_reachable()?;
        let mut inner = self.inner.lock().unwrap();
        match inner.pools.get_mut(handle) {
            Some(slot) => {
                *slot = view.clone();
                Ok(())
            }
            None => Err(CollabError::Unreachable(format!(
                "render {handle} was deleted"
            ))),
        }
    }

    async fn render_event(
        &self,
        _channel: &ChannelId,
        view: &EventView,
    ) -> Result<RenderHandle, CollabError> {
        self.check_reachable()?;
        let mut inner = self.inner.lock().unwrap();
        let handle = Self::fresh_handle(&mut inner);
        inner.events.insert(handle.clone(), view.clone());
        Ok(handle)
    }

    async fn update_event(
        &self,
        handle: &RenderHandle,
        view: &EventView,
    ) -> Result<(), CollabError> {
        self.check_reachable()?;
        let mut inner = self.inner.lock().unwrap();
        match inner.events.get_mut(handle) {
            Some(slot) => {
                *slot = view.clone();
                Ok(())
            }
            None => Err(CollabError::Unreachable(format!(
                "render {handle} was deleted"
            ))),
        }
    }

    async fn announce(&self, channel: &ChannelId, text: &str) -> Result<(), CollabError> {
        self.check_reachable()?;
        self.inner
            .lock()
            .unwrap()
            .announcements
            .push((channel.clone(), text.to_string()));
        Ok(())
    }
}

/// Notifier that records every message and can fail for chosen recipients
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(UserId, String)>>,
    failing: Mutex<HashSet<UserId>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages delivered so far
    pub fn sent(&self) -> Vec<(UserId, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Messages delivered to one recipient
    pub fn sent_to(&self, user: &UserId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == user)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Make deliveries to `user` fail from now on
    pub fn fail_for(&self, user: UserId) {
        self.failing.lock().unwrap().insert(user);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user: &UserId, text: &str) -> Result<(), CollabError> {
        if self.failing.lock().unwrap().contains(user) {
            return Err(CollabError::Unreachable(format!("{user} blocks DMs")));
        }
        self.sent
            .lock()
            .unwrap()
            .push((user.clone(), text.to_string()));
        Ok(())
    }
}

/// Resolver backed by a fixed table of known profiles
#[derive(Default)]
pub struct StubResolver {
    profiles: Mutex<HashMap<String, String>>,
}

impl StubResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolvable profile: `key` is the id64 or vanity name
    pub fn add_profile(&self, key: impl Into<String>, display_name: impl Into<String>) {
        self.profiles
            .lock()
            .unwrap()
            .insert(key.into(), display_name.into());
    }
}

#[async_trait]
impl IdentityResolver for StubResolver {
    async fn resolve(&self, link: &ProfileLink) -> Result<ExternalProfile, CollabError> {
        self.profiles
            .lock()
            .unwrap()
            .get(link.key())
            .map(|name| ExternalProfile {
                display_name: name.clone(),
            })
            .ok_or_else(|| CollabError::NotFound(format!("no such profile: {link}")))
    }
}

/// Authorizer over fixed role sets
#[derive(Default)]
pub struct StaticAuthorizer {
    privileged: Mutex<HashSet<UserId>>,
    tagged: Mutex<HashSet<UserId>>,
}

impl StaticAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn make_privileged(&self, user: UserId) {
        self.privileged.lock().unwrap().insert(user);
    }

    pub fn grant_tag(&self, user: UserId) {
        self.tagged.lock().unwrap().insert(user);
    }
}

#[async_trait]
impl Authorizer for StaticAuthorizer {
    async fn is_privileged(&self, user: &UserId) -> bool {
        self.privileged.lock().unwrap().contains(user)
    }

    async fn has_required_tag(&self, user: &UserId) -> bool {
        self.tagged.lock().unwrap().contains(user)
    }
}

/// Directory that records membership actions instead of applying them
#[derive(Default)]
pub struct RecordingDirectory {
    display_names: Mutex<Vec<(UserId, String)>>,
    granted: Mutex<Vec<UserId>>,
    revoked: Mutex<Vec<(UserId, String)>>,
}

impl RecordingDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display_names(&self) -> Vec<(UserId, String)> {
        self.display_names.lock().unwrap().clone()
    }

    pub fn granted(&self) -> Vec<UserId> {
        self.granted.lock().unwrap().clone()
    }

    pub fn revoked(&self) -> Vec<(UserId, String)> {
        self.revoked.lock().unwrap().clone()
    }
}

#[async_trait]
impl MemberDirectory for RecordingDirectory {
    async fn set_display_name(&self, user: &UserId, name: &str) -> Result<(), CollabError> {
        self.display_names
            .lock()
            .unwrap()
            .push((user.clone(), name.to_string()));
        Ok(())
    }

    async fn grant_access_tag(&self, user: &UserId) -> Result<(), CollabError> {
        self.granted.lock().unwrap().push(user.clone());
        Ok(())
    }

    async fn revoke_membership(&self, user: &UserId, reason: &str) -> Result<(), CollabError> {
        self.revoked
            .lock()
            .unwrap()
            .push((user.clone(), reason.to_string()));
        Ok(())
    }
}
