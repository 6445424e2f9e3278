//! Durable outbox of index events
//!
//! The collection store and version manager never talk to the search backend
//! directly. Every committed mutation appends an event here, in the same
//! primary store as the data, before the operation acknowledges. A detached
//! worker (`search::SearchIndexer`) drains pending events into the index.
//!
//! ## Invariants
//! - append happens before the mutating operation returns
//! - delivery is at-least-once; the indexer's apply is idempotent, so
//!   replaying a suffix after a crash converges
//! - events are dispatched in append (sequence) order

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::WorkshopResult;
use crate::model::{Collection, CollectionId, UserId, VersionId, Visibility};

/// A committed collection-state change awaiting index projection.
///
/// Carries the searchable metadata as of commit time so the indexer can
/// project without a read-back; `version_id` is set for publish events and
/// `None` for metadata/visibility/tombstone changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEvent {
    /// Outbox sequence number, assigned on append (1-based)
    pub seq: u64,

    /// The collection this event projects
    pub collection_id: CollectionId,

    /// The newly published version, for publish events
    pub version_id: Option<VersionId>,

    /// Visibility at commit time
    pub visibility: Visibility,

    /// Tombstone flag at commit time
    pub tombstoned: bool,

    /// Searchable metadata at commit time
    pub name: String,
    /// Description at commit time
    pub description: String,
    /// Tags at commit time
    pub tags: Vec<String>,
    /// Owner identity
    pub owner: UserId,
    /// Current version number at commit time
    pub version_number: u64,
    /// Approximate subscriber count at commit time
    pub num_subscribers: i64,

    /// Commit time
    pub emitted_at: DateTime<Utc>,
}

impl IndexEvent {
    /// Builds an event from a collection's post-commit state
    pub fn from_collection(collection: &Collection, version_id: Option<VersionId>) -> Self {
        Self {
            seq: 0,
            collection_id: collection.id,
            version_id,
            visibility: collection.visibility,
            tombstoned: collection.tombstoned,
            name: collection.name.clone(),
            description: collection.description.clone(),
            tags: collection.tags.clone(),
            owner: collection.owner,
            version_number: collection.current_version_number,
            num_subscribers: collection.num_subscribers,
            emitted_at: Utc::now(),
        }
    }

    /// Whether the projection for this event is an upsert (vs. a delete)
    pub fn is_upsert(&self) -> bool {
        self.visibility == Visibility::Public && !self.tombstoned
    }
}

/// Storage capability for the outbox, provided by the primary store
pub trait OutboxRepo: Send + Sync {
    /// Appends an event, assigning and returning its sequence number
    fn append(&self, event: IndexEvent) -> WorkshopResult<u64>;

    /// Returns up to `limit` undispatched events in sequence order
    fn pending(&self, limit: usize) -> WorkshopResult<Vec<IndexEvent>>;

    /// Marks an event dispatched; repeated marks are a no-op
    fn mark_dispatched(&self, seq: u64) -> WorkshopResult<()>;

    /// Number of undispatched events
    fn pending_count(&self) -> WorkshopResult<usize>;
}

/// Handle the write path uses to record events
#[derive(Clone)]
pub struct Outbox {
    repo: Arc<dyn OutboxRepo>,
}

impl Outbox {
    /// Create an outbox over the given repository
    pub fn new(repo: Arc<dyn OutboxRepo>) -> Self {
        Self { repo }
    }

    /// Records a post-commit event for later index projection
    pub fn record(&self, event: IndexEvent) -> WorkshopResult<u64> {
        self.repo.append(event)
    }

    /// Returns up to `limit` undispatched events in sequence order
    pub fn pending(&self, limit: usize) -> WorkshopResult<Vec<IndexEvent>> {
        self.repo.pending(limit)
    }

    /// Marks an event dispatched
    pub fn mark_dispatched(&self, seq: u64) -> WorkshopResult<()> {
        self.repo.mark_dispatched(seq)
    }

    /// Number of undispatched events
    pub fn backlog(&self) -> WorkshopResult<usize> {
        self.repo.pending_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Collection;

    #[test]
    fn test_upsert_gate() {
        let mut c = Collection::new(UserId(1), "n".into(), "d".into(), None);
        let ev = IndexEvent::from_collection(&c, None);
        assert!(!ev.is_upsert()); // private

        c.visibility = Visibility::Public;
        assert!(IndexEvent::from_collection(&c, None).is_upsert());

        c.tombstoned = true;
        assert!(!IndexEvent::from_collection(&c, None).is_upsert());

        c.tombstoned = false;
        c.visibility = Visibility::Unlisted;
        assert!(!IndexEvent::from_collection(&c, None).is_upsert());
    }
}
