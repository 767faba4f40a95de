//! Registry of rent pools keyed by channel

use super::pool::{RentError, RentPool};
use crate::types::ChannelId;
use std::collections::HashMap;

/// All live rent pools, keyed by the channel that hosts them.
///
/// Owned exclusively by the coordinator; pools never outlive their registry
/// entry and cross-references to them are plain channel ids.
#[derive(Debug, Default)]
pub struct RentRegistry {
    pools: HashMap<ChannelId, RentPool>,
}

impl RentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pool. Fails if the channel already has one.
    pub fn create(&mut self, pool: RentPool) -> Result<(), RentError> {
        let channel = pool.channel().clone();
        if self.pools.contains_key(&channel) {
            return Err(RentError::PoolExists(channel));
        }
        self.pools.insert(channel, pool);
        Ok(())
    }

    /// Register a pool, displacing any existing pool for the channel.
    /// Returns the displaced pool so its refresh task can be cancelled.
    pub fn replace(&mut self, pool: RentPool) -> Option<RentPool> {
        self.pools.insert(pool.channel().clone(), pool)
    }

    pub fn get(&self, channel: &ChannelId) -> Result<&RentPool, RentError> {
        self.pools
            .get(channel)
            .ok_or_else(|| RentError::PoolNotFound(channel.clone()))
    }

    pub fn get_mut(&mut self, channel: &ChannelId) -> Result<&mut RentPool, RentError> {
        self.pools
            .get_mut(channel)
            .ok_or_else(|| RentError::PoolNotFound(channel.clone()))
    }

    /// Remove a channel's pool
    pub fn remove(&mut self, channel: &ChannelId) -> Result<RentPool, RentError> {
        self.pools
            .remove(channel)
            .ok_or_else(|| RentError::PoolNotFound(channel.clone()))
    }

    pub fn contains(&self, channel: &ChannelId) -> bool {
        self.pools.contains_key(channel)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RenderHandle;

    fn pool(channel: &str) -> RentPool {
        RentPool::new(ChannelId::new(channel), RenderHandle::new("render"))
    }

    #[test]
    fn test_create_and_get() {
        let mut registry = RentRegistry::new();
        registry.create(pool("lobby")).unwrap();

        assert!(registry.contains(&ChannelId::new("lobby")));
        assert!(registry.get(&ChannelId::new("lobby")).is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_create_fails() {
        let mut registry = RentRegistry::new();
        registry.create(pool("lobby")).unwrap();

        let err = registry.create(pool("lobby")).unwrap_err();
        assert_eq!(err, RentError::PoolExists(ChannelId::new("lobby")));
    }

    #[test]
    fn test_replace_returns_displaced_pool() {
        let mut registry = RentRegistry::new();
        registry.create(pool("lobby")).unwrap();

        let displaced = registry.replace(pool("lobby"));
        assert!(displaced.is_some());
        assert_eq!(registry.len(), 1);

        assert!(registry.replace(pool("other")).is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove_missing_pool_fails() {
        let mut registry = RentRegistry::new();
        let err = registry.remove(&ChannelId::new("nowhere")).unwrap_err();
        assert_eq!(err, RentError::PoolNotFound(ChannelId::new("nowhere")));
    }

    #[test]
    fn test_pools_are_channel_local() {
        let mut registry = RentRegistry::new();
        registry.create(pool("a")).unwrap();
        registry.create(pool("b")).unwrap();

        let now = crate::types::Timestamp::from_millis(0);
        registry
            .get_mut(&ChannelId::new("a"))
            .unwrap()
            .request(0, crate::types::UserId::new("alice"), now)
            .unwrap();

        // The same slot in another channel's pool is untouched.
        let other = registry.get(&ChannelId::new("b")).unwrap();
        assert!(other.slot(0).unwrap().pending_request().is_none());
    }
}
