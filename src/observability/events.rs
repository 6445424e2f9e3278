//! Observable events
//!
//! Every log line names one of these. Events are explicit and typed so the
//! set of things the core can report is enumerable.

use std::fmt;

/// Observable events in the publishing core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Collection lifecycle
    /// Collection created
    CollectionCreated,
    /// Collection metadata updated
    MetadataUpdated,
    /// Visibility changed
    VisibilityChanged,
    /// Collaborator added
    CollaboratorAdded,
    /// Collaborator removed
    CollaboratorRemoved,
    /// Tag added
    TagAdded,
    /// Tag removed
    TagRemoved,
    /// Collection tombstoned
    CollectionTombstoned,

    // Publish path
    /// Publish validation rejected the alias set
    PublishRejected,
    /// Version committed and pointer advanced
    PublishCommit,

    // Outbox / indexer
    /// Event appended to the outbox
    OutboxAppend,
    /// Index document upserted
    IndexUpsert,
    /// Index document deleted
    IndexDelete,
    /// Index apply failed, will retry
    IndexRetry,
    /// Index apply abandoned for this pass (backlog kept)
    IndexBackoff,
    /// Full reindex started
    ReindexStart,
    /// Full reindex complete
    ReindexComplete,
    /// Search served in degraded mode (backend unreachable)
    SearchDegraded,

    // Subscriptions
    /// Subscription created
    SubscriptionCreated,
    /// Subscription mode updated
    SubscriptionUpdated,
    /// Subscription removed
    SubscriptionRemoved,
}

impl Event {
    /// Returns the event name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::CollectionCreated => "COLLECTION_CREATED",
            Event::MetadataUpdated => "METADATA_UPDATED",
            Event::VisibilityChanged => "VISIBILITY_CHANGED",
            Event::CollaboratorAdded => "COLLABORATOR_ADDED",
            Event::CollaboratorRemoved => "COLLABORATOR_REMOVED",
            Event::TagAdded => "TAG_ADDED",
            Event::TagRemoved => "TAG_REMOVED",
            Event::CollectionTombstoned => "COLLECTION_TOMBSTONED",
            Event::PublishRejected => "PUBLISH_REJECTED",
            Event::PublishCommit => "PUBLISH_COMMIT",
            Event::OutboxAppend => "OUTBOX_APPEND",
            Event::IndexUpsert => "INDEX_UPSERT",
            Event::IndexDelete => "INDEX_DELETE",
            Event::IndexRetry => "INDEX_RETRY",
            Event::IndexBackoff => "INDEX_BACKOFF",
            Event::ReindexStart => "REINDEX_START",
            Event::ReindexComplete => "REINDEX_COMPLETE",
            Event::SearchDegraded => "SEARCH_DEGRADED",
            Event::SubscriptionCreated => "SUBSCRIPTION_CREATED",
            Event::SubscriptionUpdated => "SUBSCRIPTION_UPDATED",
            Event::SubscriptionRemoved => "SUBSCRIPTION_REMOVED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
