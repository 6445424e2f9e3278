//! Collection records
//!
//! A collection is a named, ownable group of aliases/snippets distributed as
//! a unit. Its published contents live in immutable `Version` snapshots; the
//! record here carries identity, discovery metadata, the current-version
//! pointer, and the collaborator roster.
//!
//! ## Invariants
//! - exactly one owner; the owner is never listed as a collaborator
//! - collaborator identities are distinct
//! - `current_version_number` is 0 until the first publish, then advances by
//!   exactly 1 per publish together with `current_version`
//! - deletion is a tombstone, never physical removal

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CollectionId, UserId, VersionId};

/// Who may discover a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Owner and collaborators only
    Private,
    /// Readable by anyone with the link; excluded from search
    Unlisted,
    /// Readable by anyone; searchable
    Public,
}

/// Role assigned to a collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaboratorRole {
    /// May edit and publish
    Editor,
    /// Read-only access, including while private
    Viewer,
}

/// A collaborator entry on a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    /// Collaborator identity
    pub user: UserId,
    /// Assigned role
    pub role: CollaboratorRole,
}

/// Metadata fields updatable in one call
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataUpdate {
    /// New display name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New image URL (`Some(None)` clears it)
    pub image: Option<Option<String>>,
}

/// A collection record as held in the primary store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    /// Unique identifier
    pub id: CollectionId,

    /// Owning identity
    pub owner: UserId,

    /// Display name
    pub name: String,

    /// Description shown in discovery
    pub description: String,

    /// Optional image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Discovery tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Current visibility state
    pub visibility: Visibility,

    /// Pointer to the currently published version, if any
    pub current_version: Option<VersionId>,

    /// Sequence number of the current version (0 = never published).
    /// This is the CAS field publishes advance.
    pub current_version_number: u64,

    /// Collaborators with assigned roles
    #[serde(default)]
    pub collaborators: Vec<Collaborator>,

    /// Soft-delete marker; tombstoned collections keep their versions
    #[serde(default)]
    pub tombstoned: bool,

    /// Approximate user subscriber count
    #[serde(default)]
    pub num_subscribers: i64,

    /// Approximate guild subscriber count
    #[serde(default)]
    pub num_guild_subscribers: i64,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last edit time
    pub last_edited: DateTime<Utc>,
}

impl Collection {
    /// Create a new private collection owned by `owner`
    pub fn new(owner: UserId, name: String, description: String, image: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: CollectionId::new(),
            owner,
            name,
            description,
            image,
            tags: Vec::new(),
            visibility: Visibility::Private,
            current_version: None,
            current_version_number: 0,
            collaborators: Vec::new(),
            tombstoned: false,
            num_subscribers: 0,
            num_guild_subscribers: 0,
            created_at: now,
            last_edited: now,
        }
    }

    /// Returns true if `user` owns this collection
    pub fn is_owner(&self, user: UserId) -> bool {
        self.owner == user
    }

    /// Returns the collaborator role of `user`, if any
    pub fn collaborator_role(&self, user: UserId) -> Option<CollaboratorRole> {
        self.collaborators
            .iter()
            .find(|c| c.user == user)
            .map(|c| c.role)
    }

    /// Returns true if this collection has ever published
    pub fn has_published(&self) -> bool {
        self.current_version.is_some()
    }

    /// Marks the record edited now
    pub fn touch(&mut self) {
        self.last_edited = Utc::now();
    }
}
