//! In-memory repository
//!
//! Backs tests and single-process deployments. One struct implements every
//! repository capability so a whole core can be wired from a single
//! `Arc<MemoryRepo>`.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::{WorkshopError, WorkshopResult};
use crate::model::{
    Collection, CollectionId, Subscription, SubscriberId, UserId, Version, VersionId,
};
use crate::outbox::{IndexEvent, OutboxRepo};

use super::repo::{CollectionRepo, SubscriptionRepo, VersionRepo};

#[derive(Default)]
struct OutboxState {
    next_seq: u64,
    events: Vec<IndexEvent>,
    dispatched: u64, // all seq <= dispatched are done
}

/// In-memory implementation of all repository traits
#[derive(Default)]
pub struct MemoryRepo {
    collections: RwLock<HashMap<CollectionId, Collection>>,
    versions: RwLock<HashMap<VersionId, Version>>,
    subscriptions: RwLock<HashMap<SubscriberId, Vec<Subscription>>>,
    outbox: RwLock<OutboxState>,
}

impl MemoryRepo {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }
}

// A poisoned lock means a writer panicked mid-update; treat as store failure.
fn poisoned() -> WorkshopError {
    WorkshopError::store("repository lock poisoned")
}

impl CollectionRepo for MemoryRepo {
    fn insert(&self, collection: &Collection) -> WorkshopResult<()> {
        let mut map = self.collections.write().map_err(|_| poisoned())?;
        if map.contains_key(&collection.id) {
            return Err(WorkshopError::conflict("collection id already exists"));
        }
        map.insert(collection.id, collection.clone());
        Ok(())
    }

    fn find(&self, id: CollectionId) -> WorkshopResult<Option<Collection>> {
        let map = self.collections.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    fn save(&self, collection: &Collection) -> WorkshopResult<()> {
        let mut map = self.collections.write().map_err(|_| poisoned())?;
        match map.get_mut(&collection.id) {
            Some(existing) => {
                // The version pointer only moves via the CAS below.
                let mut updated = collection.clone();
                updated.current_version = existing.current_version;
                updated.current_version_number = existing.current_version_number;
                *existing = updated;
                Ok(())
            }
            None => Err(WorkshopError::not_found("collection")),
        }
    }

    fn compare_and_set_current_version(
        &self,
        id: CollectionId,
        expected_number: u64,
        new_version: VersionId,
        new_number: u64,
    ) -> WorkshopResult<bool> {
        let mut map = self.collections.write().map_err(|_| poisoned())?;
        let collection = map
            .get_mut(&id)
            .ok_or_else(|| WorkshopError::not_found("collection"))?;
        if collection.current_version_number != expected_number {
            return Ok(false);
        }
        collection.current_version = Some(new_version);
        collection.current_version_number = new_number;
        collection.touch();
        Ok(true)
    }

    fn find_by_owner(&self, owner: UserId) -> WorkshopResult<Vec<Collection>> {
        let map = self.collections.read().map_err(|_| poisoned())?;
        Ok(map.values().filter(|c| c.owner == owner).cloned().collect())
    }

    fn list_all(&self) -> WorkshopResult<Vec<Collection>> {
        let map = self.collections.read().map_err(|_| poisoned())?;
        Ok(map.values().cloned().collect())
    }
}

impl VersionRepo for MemoryRepo {
    fn insert(&self, version: &Version) -> WorkshopResult<()> {
        let mut map = self.versions.write().map_err(|_| poisoned())?;
        if map.contains_key(&version.id()) {
            return Err(WorkshopError::conflict("version id already exists"));
        }
        map.insert(version.id(), version.clone());
        Ok(())
    }

    fn find(&self, id: VersionId) -> WorkshopResult<Option<Version>> {
        let map = self.versions.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    fn find_by_collection(&self, id: CollectionId) -> WorkshopResult<Vec<Version>> {
        let map = self.versions.read().map_err(|_| poisoned())?;
        let mut versions: Vec<Version> = map
            .values()
            .filter(|v| v.collection_id() == id)
            .cloned()
            .collect();
        versions.sort_by_key(Version::number);
        Ok(versions)
    }

    fn highest_number(&self, id: CollectionId) -> WorkshopResult<u64> {
        let map = self.versions.read().map_err(|_| poisoned())?;
        Ok(map
            .values()
            .filter(|v| v.collection_id() == id)
            .map(Version::number)
            .max()
            .unwrap_or(0))
    }
}

impl SubscriptionRepo for MemoryRepo {
    fn upsert(&self, subscription: Subscription) -> WorkshopResult<(Subscription, bool)> {
        let mut map = self.subscriptions.write().map_err(|_| poisoned())?;
        let subs = map.entry(subscription.subscriber).or_default();

        if let Some(existing) = subs
            .iter_mut()
            .find(|s| s.collection_id == subscription.collection_id)
        {
            // Mode updates keep the original precedence position.
            existing.mode = subscription.mode;
            return Ok((existing.clone(), false));
        }

        let mut stored = subscription;
        stored.position = subs.iter().map(|s| s.position).max().unwrap_or(0) + 1;
        subs.push(stored.clone());
        Ok((stored, true))
    }

    fn find(
        &self,
        subscriber: SubscriberId,
        collection_id: CollectionId,
    ) -> WorkshopResult<Option<Subscription>> {
        let map = self.subscriptions.read().map_err(|_| poisoned())?;
        Ok(map
            .get(&subscriber)
            .and_then(|subs| subs.iter().find(|s| s.collection_id == collection_id))
            .cloned())
    }

    fn find_by_subscriber(&self, subscriber: SubscriberId) -> WorkshopResult<Vec<Subscription>> {
        let map = self.subscriptions.read().map_err(|_| poisoned())?;
        let mut subs = map.get(&subscriber).cloned().unwrap_or_default();
        subs.sort_by_key(|s| s.position);
        Ok(subs)
    }

    fn delete(
        &self,
        subscriber: SubscriberId,
        collection_id: CollectionId,
    ) -> WorkshopResult<bool> {
        let mut map = self.subscriptions.write().map_err(|_| poisoned())?;
        let Some(subs) = map.get_mut(&subscriber) else {
            return Ok(false);
        };
        let before = subs.len();
        subs.retain(|s| s.collection_id != collection_id);
        Ok(subs.len() != before)
    }
}

impl OutboxRepo for MemoryRepo {
    fn append(&self, mut event: IndexEvent) -> WorkshopResult<u64> {
        let mut state = self.outbox.write().map_err(|_| poisoned())?;
        state.next_seq += 1;
        event.seq = state.next_seq;
        state.events.push(event);
        Ok(state.next_seq)
    }

    fn pending(&self, limit: usize) -> WorkshopResult<Vec<IndexEvent>> {
        let state = self.outbox.read().map_err(|_| poisoned())?;
        Ok(state
            .events
            .iter()
            .filter(|e| e.seq > state.dispatched)
            .take(limit)
            .cloned()
            .collect())
    }

    fn mark_dispatched(&self, seq: u64) -> WorkshopResult<()> {
        let mut state = self.outbox.write().map_err(|_| poisoned())?;
        if seq > state.dispatched {
            state.dispatched = seq;
        }
        Ok(())
    }

    fn pending_count(&self) -> WorkshopResult<usize> {
        let state = self.outbox.read().map_err(|_| poisoned())?;
        Ok(state
            .events
            .iter()
            .filter(|e| e.seq > state.dispatched)
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PinMode;

    #[test]
    fn test_save_never_moves_version_pointer() {
        let repo = MemoryRepo::new();
        let c = Collection::new(UserId(1), "n".into(), "d".into(), None);
        CollectionRepo::insert(&repo, &c).unwrap();

        let vid = VersionId::new();
        assert!(repo
            .compare_and_set_current_version(c.id, 0, vid, 1)
            .unwrap());

        // A stale in-memory copy saved back must not clobber the pointer.
        let mut stale = c.clone();
        stale.description = "updated".to_string();
        repo.save(&stale).unwrap();

        let stored = CollectionRepo::find(&repo, c.id).unwrap().unwrap();
        assert_eq!(stored.description, "updated");
        assert_eq!(stored.current_version, Some(vid));
        assert_eq!(stored.current_version_number, 1);
    }

    #[test]
    fn test_cas_rejects_stale_expectation() {
        let repo = MemoryRepo::new();
        let c = Collection::new(UserId(1), "n".into(), "d".into(), None);
        CollectionRepo::insert(&repo, &c).unwrap();

        assert!(repo
            .compare_and_set_current_version(c.id, 0, VersionId::new(), 1)
            .unwrap());
        assert!(!repo
            .compare_and_set_current_version(c.id, 0, VersionId::new(), 1)
            .unwrap());
    }

    #[test]
    fn test_upsert_assigns_then_keeps_position() {
        let repo = MemoryRepo::new();
        let subscriber = SubscriberId::User(UserId(9));
        let a = CollectionId::new();
        let b = CollectionId::new();

        let (first, created) = repo
            .upsert(Subscription::new(subscriber, a, PinMode::Latest))
            .unwrap();
        assert!(created);
        assert_eq!(first.position, 1);

        let (second, created) = repo
            .upsert(Subscription::new(subscriber, b, PinMode::Latest))
            .unwrap();
        assert!(created);
        assert_eq!(second.position, 2);

        // Re-subscribing to `a` pinned keeps position 1.
        let vid = VersionId::new();
        let (again, created) = repo
            .upsert(Subscription::new(subscriber, a, PinMode::Pinned(vid)))
            .unwrap();
        assert!(!created);
        assert_eq!(again.position, 1);
        assert_eq!(again.mode, PinMode::Pinned(vid));
    }

    #[test]
    fn test_outbox_sequence_and_dispatch() {
        let repo = MemoryRepo::new();
        let c = Collection::new(UserId(1), "n".into(), "d".into(), None);

        let s1 = repo.append(IndexEvent::from_collection(&c, None)).unwrap();
        let s2 = repo.append(IndexEvent::from_collection(&c, None)).unwrap();
        assert_eq!((s1, s2), (1, 2));
        assert_eq!(OutboxRepo::pending_count(&repo).unwrap(), 2);

        repo.mark_dispatched(1).unwrap();
        let pending = OutboxRepo::pending(&repo, 10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].seq, 2);

        // Re-marking is a no-op.
        repo.mark_dispatched(1).unwrap();
        assert_eq!(OutboxRepo::pending_count(&repo).unwrap(), 1);
    }
}
