//! Join/leave membership unit scenarios.
//!
//! These exercise [`MembershipManager`] against the in-memory ports. They
//! live here rather than inside `core/src` because they depend on
//! `pickup-testing`, which in turn depends on `pickup-core`; compiling
//! them into the library's own unit-test target would pull in a second
//! copy of `pickup-core` and make the shared types mismatch.

#![allow(clippy::unwrap_used)]

use chrono::Duration;
use pickup_core::store::EventRepository;
use pickup_core::{
    CoreError, CurrencyCode, Event, EventId, EventStatus, GeoPoint, InMemoryEventRepository,
    InMemoryUserDirectory, Intensity, MembershipManager, Money, NotificationKind, SportId, UserId,
    Version,
};
use pickup_testing::{CapturingNotifier, FixedClock, test_time};
use std::sync::Arc;

struct Fixture {
    repository: Arc<InMemoryEventRepository>,
    users: Arc<InMemoryUserDirectory>,
    notifier: Arc<CapturingNotifier>,
    manager: MembershipManager,
}

fn fixture() -> Fixture {
    let clock = Arc::new(FixedClock::new(test_time()));
    let repository = Arc::new(InMemoryEventRepository::new());
    let users = Arc::new(InMemoryUserDirectory::new(Arc::clone(&clock) as _));
    let notifier = Arc::new(CapturingNotifier::new());
    let manager = MembershipManager::new(
        Arc::clone(&repository) as _,
        Arc::clone(&users) as _,
        Arc::clone(&notifier) as _,
        clock as _,
    );
    Fixture {
        repository,
        users,
        notifier,
        manager,
    }
}

async fn seed_user(fixture: &Fixture, name: &str) -> UserId {
    fixture
        .users
        .register(name, &format!("{name}@example.com"))
        .await
        .unwrap()
        .id
}

async fn seed_event(fixture: &Fixture, host: UserId, max_players: u32) -> EventId {
    let now = test_time();
    let event = Event {
        id: EventId::new(),
        name: "Thursday futsal".to_string(),
        description: String::new(),
        location: GeoPoint::new(2.35, 48.85),
        sport: SportId::new(),
        start_at: now + Duration::hours(2),
        end_at: now + Duration::hours(3),
        intensity: Intensity::Medium,
        max_players,
        fee: Money::from_cents(500),
        currency: CurrencyCode::new("EUR").unwrap(),
        status: EventStatus::Waiting,
        host,
        players: vec![host],
        created_at: now,
        updated_at: now,
    };
    let id = event.id;
    fixture.repository.insert(event).await.unwrap();
    id
}

#[tokio::test]
async fn join_appends_player_and_notifies_existing_ones() {
    let fx = fixture();
    let host = seed_user(&fx, "host").await;
    let joiner = seed_user(&fx, "joiner").await;
    let event_id = seed_event(&fx, host, 4).await;

    let record = fx.manager.join(joiner, event_id).await.unwrap();
    assert_eq!(record.name, "joiner");

    let stored = fx.repository.get(event_id).await.unwrap().unwrap();
    assert_eq!(stored.event.players, vec![host, joiner]);
    assert_eq!(stored.event.status, EventStatus::Waiting);
    assert_eq!(stored.version, Version::new(2));

    let sent = fx.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].user_id, host);
    assert_eq!(sent[0].kind, NotificationKind::JoinEvent);
    assert_eq!(sent[0].context_url, format!("/api/events/{event_id}"));
}

#[tokio::test]
async fn filling_join_flips_waiting_to_full_and_notifies_everyone() {
    let fx = fixture();
    let host = seed_user(&fx, "host").await;
    let joiner = seed_user(&fx, "joiner").await;
    let event_id = seed_event(&fx, host, 2).await;

    fx.manager.join(joiner, event_id).await.unwrap();

    let stored = fx.repository.get(event_id).await.unwrap().unwrap();
    assert_eq!(stored.event.status, EventStatus::Full);

    let sent = fx.notifier.sent();
    // One join notice to the host, then a full notice to both players.
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0].kind, NotificationKind::JoinEvent);
    assert!(
        sent[1..]
            .iter()
            .all(|n| n.kind == NotificationKind::EventFull)
    );
    let full_recipients: Vec<UserId> = sent[1..].iter().map(|n| n.user_id).collect();
    assert_eq!(full_recipients, vec![host, joiner]);
}

#[tokio::test]
async fn join_unknown_user_is_not_found_and_leaves_event_untouched() {
    let fx = fixture();
    let host = seed_user(&fx, "host").await;
    let event_id = seed_event(&fx, host, 2).await;

    let err = fx.manager.join(UserId::new(), event_id).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { entity: "user", .. }));

    let stored = fx.repository.get(event_id).await.unwrap().unwrap();
    assert_eq!(stored.version, Version::FIRST);
}

#[tokio::test]
async fn join_unknown_event_is_not_found() {
    let fx = fixture();
    let joiner = seed_user(&fx, "joiner").await;
    let err = fx.manager.join(joiner, EventId::new()).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { entity: "event", .. }));
}

#[tokio::test]
async fn join_full_event_conflicts_without_mutating_players() {
    let fx = fixture();
    let host = seed_user(&fx, "host").await;
    let second = seed_user(&fx, "second").await;
    let third = seed_user(&fx, "third").await;
    let event_id = seed_event(&fx, host, 2).await;

    fx.manager.join(second, event_id).await.unwrap();
    let err = fx.manager.join(third, event_id).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));

    let stored = fx.repository.get(event_id).await.unwrap().unwrap();
    assert_eq!(stored.event.players, vec![host, second]);
}

#[tokio::test]
async fn join_conflicts_in_every_non_waiting_status() {
    let fx = fixture();
    let host = seed_user(&fx, "host").await;
    let joiner = seed_user(&fx, "joiner").await;

    for status in [
        EventStatus::Confirmed,
        EventStatus::Canceled,
        EventStatus::Disputing,
        EventStatus::Finished,
    ] {
        let event_id = seed_event(&fx, host, 4).await;
        let current = fx.repository.get(event_id).await.unwrap().unwrap();
        let mut event = current.event;
        event.status = status;
        fx.repository
            .update(event_id, current.version, event)
            .await
            .unwrap();

        let err = fx.manager.join(joiner, event_id).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)), "status {status}");
    }
}

#[tokio::test]
async fn duplicate_join_conflicts() {
    let fx = fixture();
    let host = seed_user(&fx, "host").await;
    let event_id = seed_event(&fx, host, 4).await;

    let err = fx.manager.join(host, event_id).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
}

#[tokio::test]
async fn leave_removes_exactly_one_player() {
    let fx = fixture();
    let host = seed_user(&fx, "host").await;
    let joiner = seed_user(&fx, "joiner").await;
    let event_id = seed_event(&fx, host, 4).await;
    fx.manager.join(joiner, event_id).await.unwrap();

    fx.manager.leave(joiner, event_id).await.unwrap();

    let stored = fx.repository.get(event_id).await.unwrap().unwrap();
    assert_eq!(stored.event.players, vec![host]);

    // Second leave finds no membership left.
    let err = fx.manager.leave(joiner, event_id).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::NotFound {
            entity: "player",
            ..
        }
    ));
}

#[tokio::test]
async fn leave_reopens_a_full_event() {
    let fx = fixture();
    let host = seed_user(&fx, "host").await;
    let joiner = seed_user(&fx, "joiner").await;
    let event_id = seed_event(&fx, host, 2).await;
    fx.manager.join(joiner, event_id).await.unwrap();

    fx.manager.leave(joiner, event_id).await.unwrap();

    let stored = fx.repository.get(event_id).await.unwrap().unwrap();
    assert_eq!(stored.event.status, EventStatus::Waiting);
    assert_eq!(stored.event.players, vec![host]);
}

#[tokio::test]
async fn leave_conflicts_outside_the_capacity_phase() {
    let fx = fixture();
    let host = seed_user(&fx, "host").await;
    let joiner = seed_user(&fx, "joiner").await;
    let event_id = seed_event(&fx, host, 4).await;
    fx.manager.join(joiner, event_id).await.unwrap();

    let current = fx.repository.get(event_id).await.unwrap().unwrap();
    let mut event = current.event;
    event.status = EventStatus::Confirmed;
    fx.repository
        .update(event_id, current.version, event)
        .await
        .unwrap();

    let err = fx.manager.leave(joiner, event_id).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
}

#[tokio::test]
async fn host_may_leave_their_own_event() {
    let fx = fixture();
    let host = seed_user(&fx, "host").await;
    let joiner = seed_user(&fx, "joiner").await;
    let event_id = seed_event(&fx, host, 4).await;
    fx.manager.join(joiner, event_id).await.unwrap();

    fx.manager.leave(host, event_id).await.unwrap();

    let stored = fx.repository.get(event_id).await.unwrap().unwrap();
    assert_eq!(stored.event.players, vec![joiner]);
    // Ownership is unchanged: the event is hostless-but-owned.
    assert_eq!(stored.event.host, host);
}

#[tokio::test]
async fn list_players_returns_full_records() {
    let fx = fixture();
    let host = seed_user(&fx, "host").await;
    let joiner = seed_user(&fx, "joiner").await;
    let event_id = seed_event(&fx, host, 4).await;
    fx.manager.join(joiner, event_id).await.unwrap();

    let players = fx.manager.list_players(event_id).await.unwrap();
    let names: Vec<&str> = players.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["host", "joiner"]);

    let err = fx.manager.list_players(EventId::new()).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { entity: "event", .. }));
}
