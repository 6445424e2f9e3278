//! Subscription Resolution Tests
//!
//! - `latest` subscriptions are read-your-own-write after a commit
//! - `pinned` subscriptions are invariant under later publishes
//! - tombstoned collections resolve to Unavailable without failing the batch
//! - name collisions resolve by subscription creation order, earliest wins

use scriptorium::config::WorkshopConfig;
use scriptorium::model::{
    Collectable, CollectableKind, GuildId, PinMode, SubscriberId, UserId, Visibility,
};
use scriptorium::Workshop;

fn aliases(names: &[&str]) -> Vec<Collectable> {
    names
        .iter()
        .map(|n| Collectable::alias(*n, format!("echo {n}")))
        .collect()
}

// =============================================================================
// Latest vs pinned
// =============================================================================

/// A `latest` subscription reflects each committed publish at resolve time.
#[tokio::test]
async fn test_latest_tracks_republish() {
    let (workshop, _) = Workshop::in_memory(WorkshopConfig::default());
    let owner = UserId(1);
    let me = SubscriberId::User(UserId(1));
    let c = workshop
        .create_collection(owner, "spells".into(), "d".into(), None)
        .unwrap();

    let v1 = workshop
        .publish(owner, c.id, aliases(&["fireball"]), None)
        .await
        .unwrap();
    workshop
        .subscribe(owner, me, c.id, PinMode::Latest)
        .unwrap();

    let resolved = workshop.resolve(me).unwrap();
    assert_eq!(resolved.effective(c.id).unwrap().id(), v1.id());

    let v2 = workshop
        .publish(owner, c.id, aliases(&["fireball", "icestorm"]), None)
        .await
        .unwrap();
    let resolved = workshop.resolve(me).unwrap();
    assert_eq!(resolved.effective(c.id).unwrap().id(), v2.id());
}

/// A pinned subscription ignores later publishes.
#[tokio::test]
async fn test_pinned_is_invariant_under_republish() {
    let (workshop, _) = Workshop::in_memory(WorkshopConfig::default());
    let owner = UserId(1);
    let me = SubscriberId::User(UserId(1));
    let c = workshop
        .create_collection(owner, "spells".into(), "d".into(), None)
        .unwrap();

    let v1 = workshop
        .publish(owner, c.id, aliases(&["fireball"]), None)
        .await
        .unwrap();
    workshop
        .subscribe(owner, me, c.id, PinMode::Pinned(v1.id()))
        .unwrap();

    for _ in 0..3 {
        workshop
            .publish(owner, c.id, aliases(&["fireball", "icestorm"]), None)
            .await
            .unwrap();
    }

    let resolved = workshop.resolve(me).unwrap();
    let effective = resolved.effective(c.id).unwrap();
    assert_eq!(effective.id(), v1.id());
    assert_eq!(effective.number(), 1);
}

// =============================================================================
// Tombstones
// =============================================================================

/// Tombstoning keeps pinned versions on disk; the subscription resolves to
/// Unavailable and the rest of the batch still resolves.
#[tokio::test]
async fn test_tombstone_yields_unavailable_not_error() {
    let (workshop, _) = Workshop::in_memory(WorkshopConfig::default());
    let owner = UserId(1);
    let me = SubscriberId::User(UserId(1));

    let doomed = workshop
        .create_collection(owner, "doomed".into(), "d".into(), None)
        .unwrap();
    let v1 = workshop
        .publish(owner, doomed.id, aliases(&["fireball"]), None)
        .await
        .unwrap();
    workshop
        .subscribe(owner, me, doomed.id, PinMode::Pinned(v1.id()))
        .unwrap();

    let healthy = workshop
        .create_collection(owner, "healthy".into(), "d".into(), None)
        .unwrap();
    workshop
        .publish(owner, healthy.id, aliases(&["bless"]), None)
        .await
        .unwrap();
    workshop
        .subscribe(owner, me, healthy.id, PinMode::Latest)
        .unwrap();

    workshop.tombstone(owner, doomed.id).unwrap();

    let resolved = workshop.resolve(me).unwrap();
    assert_eq!(resolved.entries().len(), 2);
    assert!(resolved.effective(doomed.id).is_none());
    assert!(resolved.effective(healthy.id).is_some());

    // The pinned snapshot itself was not deleted by the tombstone.
    assert_eq!(resolved.entries()[0].subscription().collection_id, doomed.id);
    assert!(resolved.entries()[0].version().is_none());
}

// =============================================================================
// Name-collision precedence
// =============================================================================

/// Subscriber takes A at t=1 and B at t=2; both define `heal`.
/// Resolution must select A's `heal`.
#[tokio::test]
async fn test_earliest_subscription_wins_name_collision() {
    let (workshop, _) = Workshop::in_memory(WorkshopConfig::default());
    let owner = UserId(1);
    let me = SubscriberId::User(UserId(1));

    let a = workshop
        .create_collection(owner, "a".into(), "d".into(), None)
        .unwrap();
    workshop
        .publish(
            owner,
            a.id,
            vec![Collectable::alias("heal", "echo from-a")],
            None,
        )
        .await
        .unwrap();

    let b = workshop
        .create_collection(owner, "b".into(), "d".into(), None)
        .unwrap();
    workshop
        .publish(
            owner,
            b.id,
            vec![Collectable::alias("heal", "echo from-b")],
            None,
        )
        .await
        .unwrap();

    workshop.subscribe(owner, me, a.id, PinMode::Latest).unwrap();
    workshop.subscribe(owner, me, b.id, PinMode::Latest).unwrap();

    let resolved = workshop.resolve(me).unwrap();
    let heal = resolved.lookup(CollectableKind::Alias, "heal").unwrap();
    assert_eq!(heal.code, "echo from-a");

    // Re-subscribing to A pinned must not demote its precedence.
    let v1 = resolved.effective(a.id).unwrap().id();
    workshop
        .subscribe(owner, me, a.id, PinMode::Pinned(v1))
        .unwrap();
    let resolved = workshop.resolve(me).unwrap();
    let heal = resolved.lookup(CollectableKind::Alias, "heal").unwrap();
    assert_eq!(heal.code, "echo from-a");
}

// =============================================================================
// End-to-end permission scenario
// =============================================================================

/// Owner publishes v1 with `fireball`; a viewer's publish attempt is
/// rejected; owner publishes v2 adding `icestorm`; a latest subscriber sees
/// both aliases while a pinned@v1 subscriber still sees only `fireball`.
#[tokio::test]
async fn test_viewer_cannot_publish_but_latest_sees_updates() {
    let (workshop, _) = Workshop::in_memory(WorkshopConfig::default());
    let owner = UserId(1);
    let viewer = UserId(2);
    let c = workshop
        .create_collection(owner, "spells".into(), "d".into(), None)
        .unwrap();
    workshop
        .add_collaborator(
            owner,
            c.id,
            viewer,
            scriptorium::model::CollaboratorRole::Viewer,
        )
        .unwrap();

    let v1 = workshop
        .publish(owner, c.id, aliases(&["fireball"]), None)
        .await
        .unwrap();

    let err = workshop
        .publish(viewer, c.id, aliases(&["sneaky"]), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_AUTHORIZED");

    let latest_sub = SubscriberId::User(UserId(10));
    let pinned_sub = SubscriberId::Guild(GuildId(20));
    workshop
        .set_visibility(owner, c.id, Visibility::Public)
        .unwrap();
    workshop
        .subscribe(UserId(10), latest_sub, c.id, PinMode::Latest)
        .unwrap();
    workshop
        .subscribe(UserId(10), pinned_sub, c.id, PinMode::Pinned(v1.id()))
        .unwrap();

    workshop
        .publish(owner, c.id, aliases(&["fireball", "icestorm"]), None)
        .await
        .unwrap();

    let latest = workshop.resolve(latest_sub).unwrap();
    let names: Vec<&str> = latest
        .active(CollectableKind::Alias)
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["fireball", "icestorm"]);

    let pinned = workshop.resolve(pinned_sub).unwrap();
    let names: Vec<&str> = pinned
        .active(CollectableKind::Alias)
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["fireball"]);
}
