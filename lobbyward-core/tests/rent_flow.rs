//! End-to-end rent pool flows against in-memory collaborators.
//!
//! These run on real time with the fast test config (300ms rents, 20ms
//! refresh), so expiry and refresh-driven teardown are observable within a
//! test's lifetime.

use lobbyward_core::coordinator::Coordinator;
use lobbyward_core::error::CoreError;
use lobbyward_core::rent::{SlotStatus, SLOT_COUNT};
use lobbyward_core::sched::TaskKey;
use lobbyward_core::test_utils::{test_config, wait_for, TestCollaborators, DEFAULT_TEST_TIMEOUT};
use lobbyward_core::types::{ChannelId, UserId};
use std::sync::Arc;

fn setup() -> (Arc<Coordinator>, TestCollaborators) {
    let fixtures = TestCollaborators::new();
    let coordinator = Arc::new(Coordinator::new(test_config(), fixtures.collaborators()));
    (coordinator, fixtures)
}

fn boss() -> UserId {
    UserId::new("boss")
}

#[tokio::test]
async fn full_request_approve_expiry_cycle() {
    let (coordinator, _fixtures) = setup();
    let channel = ChannelId::new("lobby");
    let alice = UserId::new("alice");

    coordinator
        .create_rent_system(channel.clone(), &boss())
        .await
        .unwrap();

    let request = coordinator.request_slot(&channel, 0, &alice).await.unwrap();
    assert_eq!(request.slot, 0);
    assert_eq!(request.requester, alice);

    let view = coordinator.pool_view(&channel).await.unwrap();
    assert_eq!(view.slots[0].status, SlotStatus::Requested { by: alice.clone() });

    let occupant = coordinator.approve_slot(&channel, 0, &boss()).await.unwrap();
    assert_eq!(occupant, alice);

    let view = coordinator.pool_view(&channel).await.unwrap();
    assert!(matches!(view.slots[0].status, SlotStatus::Occupied { .. }));

    // The 300ms test rent lapses; the refresh task clears the slot.
    let probe = Arc::clone(&coordinator);
    let probe_channel = channel.clone();
    wait_for(DEFAULT_TEST_TIMEOUT, move || {
        let coordinator = Arc::clone(&probe);
        let channel = probe_channel.clone();
        async move {
            let view = coordinator.pool_view(&channel).await.unwrap();
            view.slots[0].status == SlotStatus::Available
        }
    })
    .await;

    // Slot is rentable again after expiry.
    coordinator
        .request_slot(&channel, 0, &UserId::new("bob"))
        .await
        .unwrap();
}

#[tokio::test]
async fn request_on_pending_slot_rejected() {
    let (coordinator, _fixtures) = setup();
    let channel = ChannelId::new("lobby");
    coordinator
        .create_rent_system(channel.clone(), &boss())
        .await
        .unwrap();

    coordinator
        .request_slot(&channel, 1, &UserId::new("alice"))
        .await
        .unwrap();

    let err = coordinator
        .request_slot(&channel, 1, &UserId::new("bob"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::PreconditionFailed(_)));
}

#[tokio::test]
async fn approve_and_deny_require_privilege() {
    let (coordinator, _fixtures) = setup();
    let channel = ChannelId::new("lobby");
    coordinator
        .create_rent_system(channel.clone(), &boss())
        .await
        .unwrap();
    coordinator
        .request_slot(&channel, 0, &UserId::new("alice"))
        .await
        .unwrap();

    let err = coordinator
        .approve_slot(&channel, 0, &UserId::new("alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotPrivileged));

    let err = coordinator
        .deny_slot(&channel, 0, &UserId::new("alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotPrivileged));

    // State untouched by the rejected attempts
    let view = coordinator.pool_view(&channel).await.unwrap();
    assert!(matches!(view.slots[0].status, SlotStatus::Requested { .. }));
}

#[tokio::test]
async fn deny_reopens_slot() {
    let (coordinator, _fixtures) = setup();
    let channel = ChannelId::new("lobby");
    coordinator
        .create_rent_system(channel.clone(), &boss())
        .await
        .unwrap();
    coordinator
        .request_slot(&channel, 2, &UserId::new("alice"))
        .await
        .unwrap();

    let denied = coordinator.deny_slot(&channel, 2, &boss()).await.unwrap();
    assert_eq!(denied, UserId::new("alice"));

    let view = coordinator.pool_view(&channel).await.unwrap();
    assert_eq!(view.slots[2].status, SlotStatus::Available);
}

#[tokio::test]
async fn duplicate_pool_creation_rejected() {
    let (coordinator, _fixtures) = setup();
    let channel = ChannelId::new("lobby");
    coordinator
        .create_rent_system(channel.clone(), &boss())
        .await
        .unwrap();

    let err = coordinator
        .create_rent_system(channel.clone(), &boss())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::PreconditionFailed(_)));
}

#[tokio::test]
async fn teardown_removes_pool_and_refresh_task() {
    let (coordinator, _fixtures) = setup();
    let channel = ChannelId::new("lobby");
    coordinator
        .create_rent_system(channel.clone(), &boss())
        .await
        .unwrap();
    assert!(coordinator
        .scheduler()
        .is_scheduled(&TaskKey::PoolRefresh(channel.clone())));

    coordinator
        .teardown_rent_system(&channel, &boss())
        .await
        .unwrap();

    assert!(!coordinator.has_pool(&channel).await);
    assert!(!coordinator
        .scheduler()
        .is_scheduled(&TaskKey::PoolRefresh(channel.clone())));

    let err = coordinator
        .teardown_rent_system(&channel, &boss())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn pool_self_destructs_when_render_target_gone() {
    let (coordinator, fixtures) = setup();
    let channel = ChannelId::new("lobby");
    coordinator
        .create_rent_system(channel.clone(), &boss())
        .await
        .unwrap();

    fixtures.presenter.set_unreachable(true);

    // The refresh task hits Unreachable, deletes the pool and stops itself.
    let probe = Arc::clone(&coordinator);
    let probe_channel = channel.clone();
    wait_for(DEFAULT_TEST_TIMEOUT, move || {
        let coordinator = Arc::clone(&probe);
        let channel = probe_channel.clone();
        async move { !coordinator.has_pool(&channel).await }
    })
    .await;

    let probe = Arc::clone(&coordinator);
    let key = TaskKey::PoolRefresh(channel.clone());
    wait_for(DEFAULT_TEST_TIMEOUT, move || {
        let coordinator = Arc::clone(&probe);
        let key = key.clone();
        async move { !coordinator.scheduler().is_scheduled(&key) }
    })
    .await;
}

#[tokio::test]
async fn pools_do_not_cross_contaminate() {
    let (coordinator, _fixtures) = setup();
    let first = ChannelId::new("lobby-1");
    let second = ChannelId::new("lobby-2");
    let alice = UserId::new("alice");

    coordinator
        .create_rent_system(first.clone(), &boss())
        .await
        .unwrap();
    coordinator
        .create_rent_system(second.clone(), &boss())
        .await
        .unwrap();

    coordinator.request_slot(&first, 0, &alice).await.unwrap();
    coordinator.approve_slot(&first, 0, &boss()).await.unwrap();

    // Same member, same slot index, different pool: allowed.
    coordinator.request_slot(&second, 0, &alice).await.unwrap();

    let view = coordinator.pool_view(&second).await.unwrap();
    assert_eq!(view.slots.len(), SLOT_COUNT);
    assert!(matches!(view.slots[0].status, SlotStatus::Requested { .. }));
    for slot in &view.slots[1..] {
        assert_eq!(slot.status, SlotStatus::Available);
    }
}

#[tokio::test]
async fn missing_pool_is_not_found() {
    let (coordinator, _fixtures) = setup();
    let err = coordinator
        .request_slot(&ChannelId::new("nowhere"), 0, &UserId::new("alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}
