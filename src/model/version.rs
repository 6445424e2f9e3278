//! Version - immutable publish snapshot
//!
//! A version is the complete alias/snippet contents of a collection at a
//! publish instant. Once created it never changes; corrections require a new
//! version. Sequence numbers are monotonic from 1 per collection, assigned
//! under the publish lock.
//!
//! All fields are private to enforce immutability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::alias::{Collectable, CollectableKind};
use super::ids::{CollectionId, UserId, VersionId};

/// A single immutable published version of a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// Unique identifier
    id: VersionId,
    /// Owning collection
    collection_id: CollectionId,
    /// Per-collection sequence number, starting at 1
    number: u64,
    /// Identity that published this version
    created_by: UserId,
    /// Publish time
    created_at: DateTime<Utc>,
    /// Full ordered alias/snippet set at publish time
    collectables: Vec<Collectable>,
    /// Optional changelog text
    changelog: Option<String>,
}

impl Version {
    /// Creates a new version snapshot.
    ///
    /// Callers (the version manager) are responsible for number assignment;
    /// after construction the snapshot cannot be modified.
    pub fn new(
        collection_id: CollectionId,
        number: u64,
        created_by: UserId,
        collectables: Vec<Collectable>,
        changelog: Option<String>,
    ) -> Self {
        Self {
            id: VersionId::new(),
            collection_id,
            number,
            created_by,
            created_at: Utc::now(),
            collectables,
            changelog,
        }
    }

    /// Returns the version id
    #[inline]
    pub fn id(&self) -> VersionId {
        self.id
    }

    /// Returns the owning collection id
    #[inline]
    pub fn collection_id(&self) -> CollectionId {
        self.collection_id
    }

    /// Returns the per-collection sequence number
    #[inline]
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Returns the publishing identity
    #[inline]
    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    /// Returns the publish time
    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the full ordered collectable set
    #[inline]
    pub fn collectables(&self) -> &[Collectable] {
        &self.collectables
    }

    /// Returns the changelog text, if any
    #[inline]
    pub fn changelog(&self) -> Option<&str> {
        self.changelog.as_deref()
    }

    /// Iterates collectables of one kind in snapshot order
    pub fn of_kind(&self, kind: CollectableKind) -> impl Iterator<Item = &Collectable> {
        self.collectables.iter().filter(move |c| c.kind == kind)
    }

    /// Looks up a collectable by kind and name
    pub fn find(&self, kind: CollectableKind, name: &str) -> Option<&Collectable> {
        self.collectables
            .iter()
            .find(|c| c.kind == kind && c.name == name)
    }
}
