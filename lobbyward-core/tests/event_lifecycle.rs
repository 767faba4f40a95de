//! Event lifecycle: creation, enrollment, cancellation and both activation
//! paths, including the configured empty-roster and retention policies.
//!
//! Activation timers run under paused tokio time so hour-scale schedules
//! resolve instantly.

use lobbyward_core::coordinator::Coordinator;
use lobbyward_core::error::CoreError;
use lobbyward_core::event::{AfterActivationPolicy, EmptyLobbyPolicy, EventPhase};
use lobbyward_core::test_utils::{test_config, TestCollaborators};
use lobbyward_core::types::{ChannelId, UserId};
use std::sync::Arc;
use std::time::Duration;

fn setup() -> (Arc<Coordinator>, TestCollaborators) {
    let fixtures = TestCollaborators::new();
    let coordinator = Arc::new(Coordinator::new(test_config(), fixtures.collaborators()));
    (coordinator, fixtures)
}

fn boss() -> UserId {
    UserId::new("boss")
}

fn channel() -> ChannelId {
    ChannelId::new("lobby")
}

#[tokio::test]
async fn create_requires_privilege() {
    let (coordinator, _fixtures) = setup();
    let err = coordinator
        .create_event(
            channel(),
            "friday run",
            "weekly",
            "in 2 hours",
            2,
            &UserId::new("alice"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotPrivileged));
}

#[tokio::test]
async fn unparseable_schedule_rejected() {
    let (coordinator, _fixtures) = setup();
    for text in ["whenever", "", "in three hours"] {
        let err = coordinator
            .create_event(channel(), "run", "desc", text, 2, &boss())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)), "accepted {text:?}");
    }
}

#[tokio::test]
async fn insufficient_lead_time_rejected() {
    let (coordinator, _fixtures) = setup();
    // Resolves fine but lands inside the 60s minimum lead.
    let err = coordinator
        .create_event(channel(), "run", "desc", "in 0 minutes", 2, &boss())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidInput(_)));
}

#[tokio::test]
async fn out_of_range_capacity_rejected() {
    let (coordinator, _fixtures) = setup();
    for slots in [0u8, 4] {
        let err = coordinator
            .create_event(channel(), "run", "desc", "in 2 hours", slots, &boss())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }
}

#[tokio::test]
async fn roster_closes_exactly_at_capacity() {
    let (coordinator, _fixtures) = setup();
    let id = coordinator
        .create_event(channel(), "duo night", "desc", "in 2 hours", 2, &boss())
        .await
        .unwrap();

    assert_eq!(coordinator.join_event(&id, &UserId::new("alice")).await.unwrap(), 1);
    let view = coordinator.event_view(&id).await.unwrap();
    assert_eq!(view.phase, EventPhase::Open);
    assert!(view.joinable);

    // The lobby closes at the second join, not before.
    assert_eq!(coordinator.join_event(&id, &UserId::new("bob")).await.unwrap(), 2);
    let view = coordinator.event_view(&id).await.unwrap();
    assert_eq!(view.phase, EventPhase::Full);
    assert!(!view.joinable);

    let err = coordinator
        .join_event(&id, &UserId::new("carol"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::PreconditionFailed(_)));
    assert!(err.to_string().to_lowercase().contains("full"));

    let view = coordinator.event_view(&id).await.unwrap();
    assert_eq!(view.participants.len(), 2);
}

#[tokio::test]
async fn duplicate_join_rejected() {
    let (coordinator, _fixtures) = setup();
    let id = coordinator
        .create_event(channel(), "run", "desc", "in 2 hours", 3, &boss())
        .await
        .unwrap();

    coordinator.join_event(&id, &UserId::new("alice")).await.unwrap();
    let err = coordinator
        .join_event(&id, &UserId::new("alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::PreconditionFailed(_)));

    let view = coordinator.event_view(&id).await.unwrap();
    assert_eq!(view.participants.len(), 1);
}

#[tokio::test]
async fn untagged_member_cannot_join() {
    let (coordinator, _fixtures) = setup();
    let id = coordinator
        .create_event(channel(), "run", "desc", "in 2 hours", 3, &boss())
        .await
        .unwrap();

    let err = coordinator
        .join_event(&id, &UserId::new("stranger"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::PreconditionFailed(_)));
    assert!(coordinator.event_view(&id).await.unwrap().participants.is_empty());
}

#[tokio::test]
async fn join_on_unknown_event_is_not_found() {
    let (coordinator, _fixtures) = setup();
    let err = coordinator
        .join_event(&lobbyward_core::types::EventId::new("404"), &UserId::new("alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn timer_activation_hands_off_to_pool() {
    let (coordinator, fixtures) = setup();
    let id = coordinator
        .create_event(channel(), "duo night", "desc", "in 2 hours", 2, &boss())
        .await
        .unwrap();
    coordinator.join_event(&id, &UserId::new("alice")).await.unwrap();
    coordinator.join_event(&id, &UserId::new("bob")).await.unwrap();

    tokio::time::sleep(Duration::from_secs(2 * 3600 + 5)).await;

    assert!(coordinator.has_pool(&channel()).await);
    // Default policy deletes the event after hand-off.
    assert!(!coordinator.has_event(&id).await);

    let announcements = fixtures.presenter.announcements();
    let started = announcements
        .iter()
        .find(|(_, text)| text.contains("started"))
        .expect("activation announcement");
    assert!(started.1.contains("alice") && started.1.contains("bob"));
}

#[tokio::test(start_paused = true)]
async fn cancelled_event_timer_fire_is_noop() {
    let (coordinator, fixtures) = setup();
    let id = coordinator
        .create_event(channel(), "doomed", "desc", "in 2 hours", 2, &boss())
        .await
        .unwrap();
    coordinator.join_event(&id, &UserId::new("alice")).await.unwrap();

    coordinator.cancel_event(&id, &boss()).await.unwrap();
    assert!(!coordinator.has_event(&id).await);

    let cancelled_views: Vec<_> = fixtures
        .presenter
        .event_views()
        .into_iter()
        .filter(|v| v.phase == EventPhase::Cancelled)
        .collect();
    assert_eq!(cancelled_views.len(), 1);

    // Run well past the original start; nothing must activate.
    tokio::time::sleep(Duration::from_secs(3 * 3600)).await;
    assert!(!coordinator.has_pool(&channel()).await);
    assert!(fixtures
        .presenter
        .announcements()
        .iter()
        .all(|(_, text)| !text.contains("started")));
}

#[tokio::test]
async fn cancel_requires_privilege_and_existence() {
    let (coordinator, _fixtures) = setup();
    let id = coordinator
        .create_event(channel(), "run", "desc", "in 2 hours", 2, &boss())
        .await
        .unwrap();

    let err = coordinator
        .cancel_event(&id, &UserId::new("alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotPrivileged));

    coordinator.cancel_event(&id, &boss()).await.unwrap();
    let err = coordinator.cancel_event(&id, &boss()).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn manual_activation_skips_the_wait() {
    let (coordinator, fixtures) = setup();
    let id = coordinator
        .create_event(channel(), "impatient", "desc", "in 2 hours", 2, &boss())
        .await
        .unwrap();
    coordinator.join_event(&id, &UserId::new("alice")).await.unwrap();

    coordinator.manual_activate(&id, &boss()).await.unwrap();

    assert!(coordinator.has_pool(&channel()).await);
    assert!(!coordinator.has_event(&id).await);
    assert!(fixtures
        .presenter
        .announcements()
        .iter()
        .any(|(_, text)| text.contains("started") && text.contains("alice")));

    // The event is gone; a second manual trigger reports that.
    let err = coordinator.manual_activate(&id, &boss()).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn empty_roster_cancels_by_default() {
    let (coordinator, fixtures) = setup();
    let id = coordinator
        .create_event(channel(), "ghost town", "desc", "in 2 hours", 3, &boss())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(2 * 3600 + 5)).await;

    assert!(!coordinator.has_event(&id).await);
    assert!(!coordinator.has_pool(&channel()).await);
    assert!(fixtures
        .presenter
        .announcements()
        .iter()
        .any(|(_, text)| text.contains("cancelled") && text.contains("nobody joined")));
}

#[tokio::test(start_paused = true)]
async fn empty_roster_activates_when_configured() {
    let fixtures = TestCollaborators::new();
    let mut config = test_config();
    config.events.empty_lobby = EmptyLobbyPolicy::ActivateEmpty;
    let coordinator = Arc::new(Coordinator::new(config, fixtures.collaborators()));

    coordinator
        .create_event(channel(), "ghost town", "desc", "in 2 hours", 3, &boss())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(2 * 3600 + 5)).await;

    assert!(coordinator.has_pool(&channel()).await);
    assert!(fixtures
        .presenter
        .announcements()
        .iter()
        .any(|(_, text)| text.contains("empty roster")));
}

#[tokio::test]
async fn retained_event_stays_open_for_late_joins() {
    let fixtures = TestCollaborators::new();
    let mut config = test_config();
    config.events.after_activation = AfterActivationPolicy::RetainOpen;
    let coordinator = Arc::new(Coordinator::new(config, fixtures.collaborators()));

    let id = coordinator
        .create_event(channel(), "open house", "desc", "in 2 hours", 2, &boss())
        .await
        .unwrap();
    coordinator.join_event(&id, &UserId::new("alice")).await.unwrap();

    coordinator.manual_activate(&id, &boss()).await.unwrap();

    // Pool handed off, event retained and still joinable.
    assert!(coordinator.has_pool(&channel()).await);
    assert!(coordinator.has_event(&id).await);

    assert_eq!(coordinator.join_event(&id, &UserId::new("bob")).await.unwrap(), 2);
    let err = coordinator
        .join_event(&id, &UserId::new("carol"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::PreconditionFailed(_)));
}

#[tokio::test]
async fn activation_replaces_existing_pool() {
    let (coordinator, _fixtures) = setup();
    coordinator
        .create_rent_system(channel(), &boss())
        .await
        .unwrap();
    coordinator
        .request_slot(&channel(), 0, &UserId::new("alice"))
        .await
        .unwrap();

    let id = coordinator
        .create_event(channel(), "takeover", "desc", "in 2 hours", 2, &boss())
        .await
        .unwrap();
    coordinator.join_event(&id, &UserId::new("bob")).await.unwrap();
    coordinator.manual_activate(&id, &boss()).await.unwrap();

    // Fresh pool: the old pending request is gone.
    let view = coordinator.pool_view(&channel()).await.unwrap();
    assert!(view
        .slots
        .iter()
        .all(|s| s.status == lobbyward_core::rent::SlotStatus::Available));
}
