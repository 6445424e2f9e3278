//! Permission Authority
//!
//! Capability model, not role inheritance: a caller identity resolves to a
//! capability set for a given collection snapshot. Evaluation is a pure
//! function of (identity, snapshot) with no hidden state, so every rule is
//! unit-testable without request plumbing.
//!
//! - owner: all capabilities (only `Manage` survives a tombstone)
//! - editor collaborator: read + write + publish
//! - viewer collaborator: read
//! - anyone: read on `public` and `unlisted` collections (link-knowledge is
//!   not modeled as a capability)

use serde::{Deserialize, Serialize};

use crate::errors::{WorkshopError, WorkshopResult};
use crate::model::{CollaboratorRole, Collection, UserId, Visibility};

/// A single capability over a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// See the collection and its versions
    Read,
    /// Edit metadata and tags
    Write,
    /// Commit new versions
    Publish,
    /// Visibility, collaborators, tombstone
    Manage,
}

/// The set of capabilities an identity holds over one collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    read: bool,
    write: bool,
    publish: bool,
    manage: bool,
}

impl CapabilitySet {
    /// The empty set
    pub fn none() -> Self {
        Self::default()
    }

    /// Every capability (the owner's set)
    pub fn all() -> Self {
        Self {
            read: true,
            write: true,
            publish: true,
            manage: true,
        }
    }

    /// Read only
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    /// The editor set: read + write + publish
    pub fn editor() -> Self {
        Self {
            read: true,
            write: true,
            publish: true,
            manage: false,
        }
    }

    /// Returns true if the set contains `capability`
    pub fn contains(&self, capability: Capability) -> bool {
        match capability {
            Capability::Read => self.read,
            Capability::Write => self.write,
            Capability::Publish => self.publish,
            Capability::Manage => self.manage,
        }
    }

    /// Returns true if the set is empty
    pub fn is_none(&self) -> bool {
        !(self.read || self.write || self.publish || self.manage)
    }
}

/// Computes the capability set `identity` holds over `collection`.
///
/// Pure function; the snapshot is the only input besides the identity.
pub fn capabilities_for(identity: UserId, collection: &Collection) -> CapabilitySet {
    if collection.tombstoned {
        // The owner keeps Manage to administer the tombstone; nobody reads.
        return if collection.is_owner(identity) {
            CapabilitySet {
                manage: true,
                ..CapabilitySet::none()
            }
        } else {
            CapabilitySet::none()
        };
    }

    if collection.is_owner(identity) {
        return CapabilitySet::all();
    }

    if let Some(role) = collection.collaborator_role(identity) {
        return match role {
            CollaboratorRole::Editor => CapabilitySet::editor(),
            CollaboratorRole::Viewer => CapabilitySet::read_only(),
        };
    }

    match collection.visibility {
        Visibility::Public | Visibility::Unlisted => CapabilitySet::read_only(),
        Visibility::Private => CapabilitySet::none(),
    }
}

/// Requires `capability`, mapping the failure so private collections never
/// leak their existence: a caller without `Read` on a private collection
/// gets `NotFound`, not `NotAuthorized`.
pub fn require(
    identity: UserId,
    collection: &Collection,
    capability: Capability,
) -> WorkshopResult<()> {
    let caps = capabilities_for(identity, collection);
    if caps.contains(capability) {
        return Ok(());
    }
    if !caps.contains(Capability::Read) {
        return Err(WorkshopError::not_found("collection"));
    }
    Err(WorkshopError::NotAuthorized)
}
