//! Publish Serialization Tests
//!
//! Publishing is serialized per collection:
//! - version numbers are gap-free and start at 1
//! - racing publishes on one collection never duplicate or drop a number
//! - unrelated collections publish in parallel
//! - a committed publish is immediately visible on the store path

use std::sync::Arc;

use scriptorium::config::WorkshopConfig;
use scriptorium::model::{Collectable, UserId};
use scriptorium::Workshop;

fn spells(n: u32) -> Vec<Collectable> {
    vec![Collectable::alias(format!("spell{n}"), "!roll 1d20")]
}

// =============================================================================
// Sequential numbering
// =============================================================================

/// Publishing N times sequentially yields versions numbered 1..N.
#[tokio::test]
async fn test_sequential_publishes_number_from_one() {
    let (workshop, _) = Workshop::in_memory(WorkshopConfig::default());
    let owner = UserId(1);
    let c = workshop
        .create_collection(owner, "spells".into(), "d".into(), None)
        .unwrap();

    for expected in 1..=5u64 {
        let version = workshop
            .publish(owner, c.id, spells(expected as u32), None)
            .await
            .unwrap();
        assert_eq!(version.number(), expected);
    }

    let stored = workshop.get_collection(owner, c.id).unwrap();
    assert_eq!(stored.current_version_number, 5);
}

/// Version history is returned in ascending number order with no gaps.
#[tokio::test]
async fn test_history_has_no_gaps_or_repeats() {
    let (workshop, _) = Workshop::in_memory(WorkshopConfig::default());
    let owner = UserId(1);
    let c = workshop
        .create_collection(owner, "spells".into(), "d".into(), None)
        .unwrap();

    for n in 1..=4u32 {
        workshop.publish(owner, c.id, spells(n), None).await.unwrap();
    }

    let history = workshop.list_versions(owner, c.id).unwrap();
    let numbers: Vec<u64> = history.iter().map(|v| v.number()).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
}

// =============================================================================
// Concurrent publishes
// =============================================================================

/// Racing publishes on one collection serialize: every attempt commits and
/// the resulting numbers are exactly 1..N.
#[tokio::test]
async fn test_concurrent_publishes_serialize_per_collection() {
    let (workshop, _) = Workshop::in_memory(WorkshopConfig::default());
    let workshop = Arc::new(workshop);
    let owner = UserId(1);
    let c = workshop
        .create_collection(owner, "spells".into(), "d".into(), None)
        .unwrap();

    let mut handles = Vec::new();
    for n in 0..16u32 {
        let workshop = workshop.clone();
        let id = c.id;
        handles.push(tokio::spawn(async move {
            workshop
                .publish(owner, id, spells(n), None)
                .await
                .unwrap()
                .number()
        }));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap());
    }
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=16).collect::<Vec<u64>>());
}

/// Publishes on different collections do not serialize against each other;
/// each collection independently numbers from 1.
#[tokio::test]
async fn test_distinct_collections_publish_in_parallel() {
    let (workshop, _) = Workshop::in_memory(WorkshopConfig::default());
    let workshop = Arc::new(workshop);
    let owner = UserId(1);

    let mut handles = Vec::new();
    for i in 0..4 {
        let c = workshop
            .create_collection(owner, format!("c{i}"), "d".into(), None)
            .unwrap();
        for n in 0..3u32 {
            let workshop = workshop.clone();
            let id = c.id;
            handles.push(tokio::spawn(async move {
                (id, workshop.publish(owner, id, spells(n), None).await.unwrap().number())
            }));
        }
    }

    let mut per_collection: std::collections::HashMap<_, Vec<u64>> =
        std::collections::HashMap::new();
    for handle in handles {
        let (id, number) = handle.await.unwrap();
        per_collection.entry(id).or_default().push(number);
    }
    for numbers in per_collection.values_mut() {
        numbers.sort_unstable();
        assert_eq!(*numbers, vec![1, 2, 3]);
    }
}

// =============================================================================
// Read-your-own-write
// =============================================================================

/// A publisher sees the new version on the store path immediately, even
/// though the search projection is asynchronous.
#[tokio::test]
async fn test_committed_publish_is_immediately_readable() {
    let (workshop, _) = Workshop::in_memory(WorkshopConfig::default());
    let owner = UserId(1);
    let c = workshop
        .create_collection(owner, "spells".into(), "d".into(), None)
        .unwrap();

    let version = workshop
        .publish(owner, c.id, spells(1), Some("v1".into()))
        .await
        .unwrap();

    let stored = workshop.get_collection(owner, c.id).unwrap();
    assert_eq!(stored.current_version, Some(version.id()));

    let fetched = workshop.get_version(owner, version.id()).unwrap();
    assert_eq!(fetched.changelog(), Some("v1"));
}

/// A rejected publish leaves no trace: no version record, no pointer move.
#[tokio::test]
async fn test_failed_publish_leaves_no_partial_state() {
    let (workshop, _) = Workshop::in_memory(WorkshopConfig::default());
    let owner = UserId(1);
    let c = workshop
        .create_collection(owner, "spells".into(), "d".into(), None)
        .unwrap();

    let duplicate = vec![
        Collectable::alias("heal", "echo a"),
        Collectable::alias("heal", "echo b"),
    ];
    let err = workshop.publish(owner, c.id, duplicate, None).await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    assert!(workshop.list_versions(owner, c.id).unwrap().is_empty());
    assert_eq!(
        workshop.get_collection(owner, c.id).unwrap().current_version_number,
        0
    );
}
