//! Version Manager
//!
//! Creates immutable version snapshots with gap-free monotonic numbers and
//! arbitrates concurrent publish attempts.
//!
//! ## Concurrency
//! Publish is the only cross-request mutual exclusion in the core. It is
//! serialized per collection id by a short-lived async mutex; unrelated
//! collections publish fully in parallel. The collection's version pointer
//! advances through a compare-and-swap keyed on the number the publish read
//! under the lock, so readers observe the new version and the pointer update
//! together, never a half-written publish. The outbox append happens before
//! the lock is released: once a publish has returned, the index event exists.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

use crate::errors::{WorkshopError, WorkshopResult};
use crate::model::{validate_alias_set, Collectable, CollectionId, UserId, Version};
use crate::observability::{Event, Logger, MetricsRegistry};
use crate::outbox::{IndexEvent, Outbox};
use crate::perms::{require, Capability};
use crate::store::{CollectionRepo, VersionRepo};

/// The version manager component
pub struct VersionManager {
    collections: Arc<dyn CollectionRepo>,
    versions: Arc<dyn VersionRepo>,
    outbox: Outbox,
    metrics: Arc<MetricsRegistry>,
    /// Alias names reserved by the bot's built-in commands
    builtin_commands: HashSet<String>,
    /// Per-collection publish locks, created on first use
    locks: Mutex<HashMap<CollectionId, Arc<AsyncMutex<()>>>>,
}

impl VersionManager {
    /// Create a version manager over the given repositories
    pub fn new(
        collections: Arc<dyn CollectionRepo>,
        versions: Arc<dyn VersionRepo>,
        outbox: Outbox,
        metrics: Arc<MetricsRegistry>,
        builtin_commands: HashSet<String>,
    ) -> Self {
        Self {
            collections,
            versions,
            outbox,
            metrics,
            builtin_commands,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Publishes a new immutable version of `collection_id`.
    ///
    /// Fails with `Validation` on a malformed alias set, `NotFound` if the
    /// collection is missing or was tombstoned between check and commit, and
    /// `NotAuthorized` if the capability check performed by the caller was
    /// bypassed (it is re-evaluated here against the locked snapshot).
    pub async fn publish(
        &self,
        collection_id: CollectionId,
        collectables: Vec<Collectable>,
        changelog: Option<String>,
        by: UserId,
    ) -> WorkshopResult<Version> {
        // Validation happens before the lock; a rejected publish has no effect.
        if let Err(err) = validate_alias_set(&collectables, &self.builtin_commands) {
            self.metrics.incr_publishes_rejected();
            Logger::warn(
                Event::PublishRejected.as_str(),
                &[
                    ("by", &by.to_string()),
                    ("collection", &collection_id.to_string()),
                    ("reason", &err.to_string()),
                ],
            );
            return Err(err);
        }

        let lock = self.lock_for(collection_id)?;
        let _guard = lock.lock().await;

        // Re-read under the lock: the collection may have been tombstoned
        // since the caller's permission check.
        let mut collection = self
            .collections
            .find(collection_id)?
            .ok_or_else(|| WorkshopError::not_found("collection"))?;
        if collection.tombstoned {
            return Err(WorkshopError::not_found("collection"));
        }

        // The facade already authorized; re-check against the locked snapshot.
        require(by, &collection, Capability::Publish).map_err(|err| {
            self.metrics.incr_publishes_rejected();
            Logger::warn(
                Event::PublishRejected.as_str(),
                &[
                    ("by", &by.to_string()),
                    ("collection", &collection_id.to_string()),
                    ("reason", "capability check failed"),
                ],
            );
            err
        })?;

        let expected = collection.current_version_number;
        let next = expected + 1;
        let version = Version::new(collection_id, next, by, collectables, changelog);
        self.versions.insert(&version)?;

        let advanced = self.collections.compare_and_set_current_version(
            collection_id,
            expected,
            version.id(),
            next,
        )?;
        if !advanced {
            // The pointer moved while we held the lock: the lock was bypassed
            // (e.g. another process). The snapshot stays orphaned rather than
            // corrupting the sequence.
            return Err(WorkshopError::conflict(
                "concurrent publish advanced the version pointer",
            ));
        }

        // Mirror the CAS into the local snapshot for the outbox event.
        collection.current_version = Some(version.id());
        collection.current_version_number = next;
        collection.touch();

        let seq = self
            .outbox
            .record(IndexEvent::from_collection(&collection, Some(version.id())))?;
        self.metrics.incr_outbox_appends();
        self.metrics.incr_versions_published();
        Logger::info(
            Event::PublishCommit.as_str(),
            &[
                ("by", &by.to_string()),
                ("collection", &collection_id.to_string()),
                ("outbox_seq", &seq.to_string()),
                ("version", &next.to_string()),
            ],
        );

        Ok(version)
    }

    /// Returns the publish lock for a collection, creating it on first use
    fn lock_for(&self, collection_id: CollectionId) -> WorkshopResult<Arc<AsyncMutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| WorkshopError::store("publish lock registry poisoned"))?;
        Ok(locks
            .entry(collection_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MetricsRegistry;
    use crate::store::{CollectionStore, MemoryRepo};

    fn setup() -> (CollectionStore, VersionManager, Arc<MemoryRepo>) {
        let repo = Arc::new(MemoryRepo::new());
        let metrics = Arc::new(MetricsRegistry::new());
        let outbox = Outbox::new(repo.clone());
        let store = CollectionStore::new(
            repo.clone(),
            repo.clone(),
            outbox.clone(),
            metrics.clone(),
        );
        let manager = VersionManager::new(
            repo.clone(),
            repo.clone(),
            outbox,
            metrics,
            HashSet::new(),
        );
        (store, manager, repo)
    }

    fn spells() -> Vec<Collectable> {
        vec![Collectable::alias("fireball", "!roll 8d6")]
    }

    #[tokio::test]
    async fn test_publish_assigns_sequential_numbers() {
        let (store, manager, _) = setup();
        let c = store
            .create_collection(UserId(1), "n".into(), "d".into(), None)
            .unwrap();

        for expected in 1..=3u64 {
            let v = manager
                .publish(c.id, spells(), None, UserId(1))
                .await
                .unwrap();
            assert_eq!(v.number(), expected);
        }

        let stored = store.get_collection(c.id).unwrap();
        assert_eq!(stored.current_version_number, 3);
    }

    #[tokio::test]
    async fn test_publish_is_read_your_own_write() {
        let (store, manager, _) = setup();
        let c = store
            .create_collection(UserId(1), "n".into(), "d".into(), None)
            .unwrap();
        let v = manager
            .publish(c.id, spells(), None, UserId(1))
            .await
            .unwrap();

        let stored = store.get_collection(c.id).unwrap();
        assert_eq!(stored.current_version, Some(v.id()));
    }

    #[tokio::test]
    async fn test_malformed_set_rejected_before_any_state() {
        let (store, manager, repo) = setup();
        let c = store
            .create_collection(UserId(1), "n".into(), "d".into(), None)
            .unwrap();
        let backlog = crate::outbox::OutboxRepo::pending_count(&*repo).unwrap();

        let err = manager
            .publish(c.id, vec![], None, UserId(1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        // No version, no pointer move, no outbox event.
        let stored = store.get_collection(c.id).unwrap();
        assert_eq!(stored.current_version_number, 0);
        assert_eq!(
            crate::outbox::OutboxRepo::pending_count(&*repo).unwrap(),
            backlog
        );
    }

    #[tokio::test]
    async fn test_viewer_publish_is_rejected_defensively() {
        let (store, manager, _) = setup();
        let c = store
            .create_collection(UserId(1), "n".into(), "d".into(), None)
            .unwrap();
        store
            .add_collaborator(c.id, UserId(2), crate::model::CollaboratorRole::Viewer, UserId(1))
            .unwrap();

        let err = manager
            .publish(c.id, spells(), None, UserId(2))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_AUTHORIZED");
    }

    #[tokio::test]
    async fn test_tombstoned_between_check_and_commit_is_not_found() {
        let (store, manager, _) = setup();
        let c = store
            .create_collection(UserId(1), "n".into(), "d".into(), None)
            .unwrap();
        store.tombstone(c.id, UserId(1)).unwrap();

        let err = manager
            .publish(c.id, spells(), None, UserId(1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_editor_collaborator_may_publish() {
        let (store, manager, _) = setup();
        let c = store
            .create_collection(UserId(1), "n".into(), "d".into(), None)
            .unwrap();
        store
            .add_collaborator(c.id, UserId(2), crate::model::CollaboratorRole::Editor, UserId(1))
            .unwrap();

        let v = manager
            .publish(c.id, spells(), Some("by editor".into()), UserId(2))
            .await
            .unwrap();
        assert_eq!(v.created_by(), UserId(2));
        assert_eq!(v.changelog(), Some("by editor"));
    }
}
