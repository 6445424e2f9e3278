//! Subscriptions
//!
//! A subscription binds a subscriber (a user, or a guild for server-wide
//! installs) to a collection, either tracking the latest published version or
//! pinned to a fixed one. The per-subscriber `position` is the precedence key
//! for alias-name collisions: earliest subscription wins, and re-subscribing
//! keeps the original position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CollectionId, GuildId, UserId, VersionId};

/// Who installed the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SubscriberId {
    /// A single user's personal install
    User(UserId),
    /// A server-wide install
    Guild(GuildId),
}

/// How the subscription tracks the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "version", rename_all = "snake_case")]
pub enum PinMode {
    /// Always resolve to the collection's current version
    Latest,
    /// Resolve to this fixed version regardless of later publishes
    Pinned(VersionId),
}

/// A subscriber's binding to a collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// The subscribing identity
    pub subscriber: SubscriberId,

    /// The collection subscribed to
    pub collection_id: CollectionId,

    /// Pin mode
    #[serde(flatten)]
    pub mode: PinMode,

    /// Per-subscriber creation-order position; precedence key, stable across
    /// re-subscribes
    pub position: u64,

    /// Subscription time
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Create a new subscription record (position assigned by the repository)
    pub fn new(subscriber: SubscriberId, collection_id: CollectionId, mode: PinMode) -> Self {
        Self {
            subscriber,
            collection_id,
            mode,
            position: 0,
            created_at: Utc::now(),
        }
    }

    /// Returns the pinned version id, if pinned
    pub fn pinned_version(&self) -> Option<VersionId> {
        match self.mode {
            PinMode::Pinned(v) => Some(v),
            PinMode::Latest => None,
        }
    }
}
