//! Repository capability traits
//!
//! Abstract the primary document store: per-document atomic save, a dedicated
//! compare-and-swap on the version pointer, and indexed lookup by collection
//! id and by subscriber id. Drivers implement these; the core never sees a
//! connection.

use crate::errors::WorkshopResult;
use crate::model::{
    Collection, CollectionId, Subscription, SubscriberId, UserId, Version, VersionId,
};

/// Collection document operations
pub trait CollectionRepo: Send + Sync {
    /// Inserts a new collection document
    fn insert(&self, collection: &Collection) -> WorkshopResult<()>;

    /// Looks up a collection by id (tombstoned records included)
    fn find(&self, id: CollectionId) -> WorkshopResult<Option<Collection>>;

    /// Replaces an existing collection document atomically.
    ///
    /// Must not be used to advance the version pointer; that goes through
    /// `compare_and_set_current_version` so readers never observe a
    /// half-written publish.
    fn save(&self, collection: &Collection) -> WorkshopResult<()>;

    /// Atomically advances the current-version pointer.
    ///
    /// Succeeds (returns `true`) only if the stored
    /// `current_version_number` still equals `expected_number`; on success
    /// both the pointer and the number become visible together.
    fn compare_and_set_current_version(
        &self,
        id: CollectionId,
        expected_number: u64,
        new_version: VersionId,
        new_number: u64,
    ) -> WorkshopResult<bool>;

    /// All collections owned by `owner`
    fn find_by_owner(&self, owner: UserId) -> WorkshopResult<Vec<Collection>>;

    /// Every collection document; used by full reindex
    fn list_all(&self) -> WorkshopResult<Vec<Collection>>;
}

/// Version document operations
pub trait VersionRepo: Send + Sync {
    /// Inserts an immutable version snapshot
    fn insert(&self, version: &Version) -> WorkshopResult<()>;

    /// Looks up a version by id
    fn find(&self, id: VersionId) -> WorkshopResult<Option<Version>>;

    /// All versions of a collection in ascending number order
    fn find_by_collection(&self, id: CollectionId) -> WorkshopResult<Vec<Version>>;

    /// Highest version number recorded for a collection (0 if none)
    fn highest_number(&self, id: CollectionId) -> WorkshopResult<u64>;
}

/// Subscription document operations
pub trait SubscriptionRepo: Send + Sync {
    /// Inserts or updates a subscription keyed by (subscriber, collection).
    ///
    /// On first insert a per-subscriber creation-order position is assigned;
    /// updates keep the existing position. Returns the stored record and
    /// whether it was newly created.
    fn upsert(&self, subscription: Subscription) -> WorkshopResult<(Subscription, bool)>;

    /// Looks up one subscription
    fn find(
        &self,
        subscriber: SubscriberId,
        collection_id: CollectionId,
    ) -> WorkshopResult<Option<Subscription>>;

    /// All of a subscriber's subscriptions in position (creation) order
    fn find_by_subscriber(&self, subscriber: SubscriberId) -> WorkshopResult<Vec<Subscription>>;

    /// Removes a subscription; returns whether one existed
    fn delete(
        &self,
        subscriber: SubscriberId,
        collection_id: CollectionId,
    ) -> WorkshopResult<bool>;
}
