//! Collection Store
//!
//! Owns durable records for collections, versions, and subscriptions through
//! the repository capabilities, and enforces structural invariants. Callers
//! are expected to have passed the permission authority already (the
//! `workshop` facade does this); `by` identifies the actor for logging only.
//!
//! Every successful mutation records an outbox event so the search index
//! reconverges with the store.
//!
//! ## Structural invariants (violations are `Conflict`)
//! - the owner is never added as a collaborator
//! - collaborator identities are distinct
//! - tombstoned collections reject further mutation
//! - going `public` requires a non-empty name/description and at least one
//!   published version

mod memory;
mod repo;

use std::sync::Arc;

pub use memory::MemoryRepo;
pub use repo::{CollectionRepo, SubscriptionRepo, VersionRepo};

use crate::errors::{WorkshopError, WorkshopResult};
use crate::model::{
    Collaborator, CollaboratorRole, Collection, CollectionId, MetadataUpdate, UserId, Version,
    VersionId, Visibility,
};
use crate::observability::{Event, Logger, MetricsRegistry};
use crate::outbox::{IndexEvent, Outbox};

/// The collection store component
#[derive(Clone)]
pub struct CollectionStore {
    collections: Arc<dyn CollectionRepo>,
    versions: Arc<dyn VersionRepo>,
    outbox: Outbox,
    metrics: Arc<MetricsRegistry>,
}

impl CollectionStore {
    /// Create a store over the given repositories
    pub fn new(
        collections: Arc<dyn CollectionRepo>,
        versions: Arc<dyn VersionRepo>,
        outbox: Outbox,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            collections,
            versions,
            outbox,
            metrics,
        }
    }

    /// Creates a new private collection owned by `owner`
    pub fn create_collection(
        &self,
        owner: UserId,
        name: String,
        description: String,
        image: Option<String>,
    ) -> WorkshopResult<Collection> {
        if name.trim().is_empty() {
            return Err(WorkshopError::validation("name", "name is required"));
        }
        if description.trim().is_empty() {
            return Err(WorkshopError::validation(
                "description",
                "description is required",
            ));
        }

        let collection = Collection::new(owner, name, description, image);
        self.collections.insert(&collection)?;
        self.record_index_event(&collection, None)?;
        self.metrics.incr_collections_created();
        Logger::info(
            Event::CollectionCreated.as_str(),
            &[
                ("collection", &collection.id.to_string()),
                ("owner", &owner.to_string()),
            ],
        );
        Ok(collection)
    }

    /// Looks up a collection, tombstoned records included.
    ///
    /// Visibility filtering is the facade's concern; the resolver needs
    /// tombstoned records to report `Unavailable`.
    pub fn get_collection(&self, id: CollectionId) -> WorkshopResult<Collection> {
        self.collections
            .find(id)?
            .ok_or_else(|| WorkshopError::not_found("collection"))
    }

    /// Looks up a version snapshot
    pub fn get_version(&self, id: VersionId) -> WorkshopResult<Version> {
        self.versions
            .find(id)?
            .ok_or_else(|| WorkshopError::not_found("version"))
    }

    /// All versions of a collection in ascending number order
    pub fn list_versions(&self, id: CollectionId) -> WorkshopResult<Vec<Version>> {
        // Surfaces NotFound for unknown collections rather than an empty list.
        self.get_collection(id)?;
        self.versions.find_by_collection(id)
    }

    /// Updates display metadata
    pub fn update_metadata(
        &self,
        id: CollectionId,
        fields: MetadataUpdate,
        by: UserId,
    ) -> WorkshopResult<Collection> {
        let mut collection = self.load_live(id)?;

        if let Some(name) = fields.name {
            if name.trim().is_empty() {
                return Err(WorkshopError::validation("name", "name is required"));
            }
            collection.name = name;
        }
        if let Some(description) = fields.description {
            if description.trim().is_empty() {
                return Err(WorkshopError::validation(
                    "description",
                    "description is required",
                ));
            }
            collection.description = description;
        }
        if let Some(image) = fields.image {
            collection.image = image;
        }
        collection.touch();

        self.collections.save(&collection)?;
        self.record_index_event(&collection, None)?;
        Logger::info(
            Event::MetadataUpdated.as_str(),
            &[
                ("by", &by.to_string()),
                ("collection", &collection.id.to_string()),
            ],
        );
        Ok(collection)
    }

    /// Changes visibility state
    pub fn set_visibility(
        &self,
        id: CollectionId,
        state: Visibility,
        by: UserId,
    ) -> WorkshopResult<Collection> {
        let mut collection = self.load_live(id)?;

        if collection.visibility == state {
            return Ok(collection);
        }
        if state == Visibility::Public && !collection.has_published() {
            return Err(WorkshopError::conflict(
                "a collection must have a published version before going public",
            ));
        }

        collection.visibility = state;
        collection.touch();
        self.collections.save(&collection)?;
        self.record_index_event(&collection, None)?;
        Logger::info(
            Event::VisibilityChanged.as_str(),
            &[
                ("by", &by.to_string()),
                ("collection", &collection.id.to_string()),
                ("visibility", visibility_str(state)),
            ],
        );
        Ok(collection)
    }

    /// Adds a collaborator with a role
    pub fn add_collaborator(
        &self,
        id: CollectionId,
        user: UserId,
        role: CollaboratorRole,
        by: UserId,
    ) -> WorkshopResult<Collection> {
        let mut collection = self.load_live(id)?;

        if collection.is_owner(user) {
            return Err(WorkshopError::conflict(
                "the owner cannot also be a collaborator",
            ));
        }
        if collection.collaborator_role(user).is_some() {
            return Err(WorkshopError::conflict("already a collaborator"));
        }

        collection.collaborators.push(Collaborator { user, role });
        collection.touch();
        self.collections.save(&collection)?;
        Logger::info(
            Event::CollaboratorAdded.as_str(),
            &[
                ("by", &by.to_string()),
                ("collaborator", &user.to_string()),
                ("collection", &collection.id.to_string()),
            ],
        );
        Ok(collection)
    }

    /// Removes a collaborator
    pub fn remove_collaborator(
        &self,
        id: CollectionId,
        user: UserId,
        by: UserId,
    ) -> WorkshopResult<Collection> {
        let mut collection = self.load_live(id)?;

        let before = collection.collaborators.len();
        collection.collaborators.retain(|c| c.user != user);
        if collection.collaborators.len() == before {
            return Err(WorkshopError::not_found("collaborator"));
        }

        collection.touch();
        self.collections.save(&collection)?;
        Logger::info(
            Event::CollaboratorRemoved.as_str(),
            &[
                ("by", &by.to_string()),
                ("collaborator", &user.to_string()),
                ("collection", &collection.id.to_string()),
            ],
        );
        Ok(collection)
    }

    /// Adds a discovery tag; a duplicate is a no-op
    pub fn add_tag(&self, id: CollectionId, tag: String, by: UserId) -> WorkshopResult<Collection> {
        let mut collection = self.load_live(id)?;

        if tag.is_empty() || tag.chars().any(char::is_whitespace) || tag.len() > 32 {
            return Err(WorkshopError::validation(
                "tag",
                format!("`{tag}` is not a valid tag"),
            ));
        }
        if collection.tags.contains(&tag) {
            return Ok(collection);
        }

        collection.tags.push(tag.clone());
        collection.touch();
        self.collections.save(&collection)?;
        self.record_index_event(&collection, None)?;
        Logger::info(
            Event::TagAdded.as_str(),
            &[
                ("by", &by.to_string()),
                ("collection", &collection.id.to_string()),
                ("tag", &tag),
            ],
        );
        Ok(collection)
    }

    /// Removes a discovery tag; an absent tag is a no-op
    pub fn remove_tag(
        &self,
        id: CollectionId,
        tag: &str,
        by: UserId,
    ) -> WorkshopResult<Collection> {
        let mut collection = self.load_live(id)?;

        let before = collection.tags.len();
        collection.tags.retain(|t| t != tag);
        if collection.tags.len() == before {
            return Ok(collection);
        }

        collection.touch();
        self.collections.save(&collection)?;
        self.record_index_event(&collection, None)?;
        Logger::info(
            Event::TagRemoved.as_str(),
            &[
                ("by", &by.to_string()),
                ("collection", &collection.id.to_string()),
                ("tag", tag),
            ],
        );
        Ok(collection)
    }

    /// Soft-deletes a collection.
    ///
    /// Visibility drops to private and the tombstone flag is set; version
    /// snapshots are kept so pinned subscriptions stay intact.
    pub fn tombstone(&self, id: CollectionId, by: UserId) -> WorkshopResult<Collection> {
        let mut collection = self.load_live(id)?;

        collection.tombstoned = true;
        collection.visibility = Visibility::Private;
        collection.touch();
        self.collections.save(&collection)?;
        self.record_index_event(&collection, None)?;
        Logger::info(
            Event::CollectionTombstoned.as_str(),
            &[
                ("by", &by.to_string()),
                ("collection", &collection.id.to_string()),
            ],
        );
        Ok(collection)
    }

    /// Adjusts the approximate subscriber counters (resolver callback)
    pub(crate) fn adjust_subscriber_count(
        &self,
        id: CollectionId,
        users: i64,
        guilds: i64,
    ) -> WorkshopResult<()> {
        let mut collection = self.get_collection(id)?;
        collection.num_subscribers = (collection.num_subscribers + users).max(0);
        collection.num_guild_subscribers = (collection.num_guild_subscribers + guilds).max(0);
        self.collections.save(&collection)
    }

    /// Every collection document; used by full reindex
    pub fn list_all(&self) -> WorkshopResult<Vec<Collection>> {
        self.collections.list_all()
    }

    /// Collections owned by `owner`
    pub fn list_owned(&self, owner: UserId) -> WorkshopResult<Vec<Collection>> {
        self.collections.find_by_owner(owner)
    }

    /// Loads a collection and rejects tombstoned records with `NotFound`
    fn load_live(&self, id: CollectionId) -> WorkshopResult<Collection> {
        let collection = self.get_collection(id)?;
        if collection.tombstoned {
            return Err(WorkshopError::not_found("collection"));
        }
        Ok(collection)
    }

    fn record_index_event(
        &self,
        collection: &Collection,
        version_id: Option<VersionId>,
    ) -> WorkshopResult<()> {
        let seq = self
            .outbox
            .record(IndexEvent::from_collection(collection, version_id))?;
        self.metrics.incr_outbox_appends();
        Logger::trace(
            Event::OutboxAppend.as_str(),
            &[
                ("collection", &collection.id.to_string()),
                ("seq", &seq.to_string()),
            ],
        );
        Ok(())
    }
}

fn visibility_str(v: Visibility) -> &'static str {
    match v {
        Visibility::Private => "private",
        Visibility::Unlisted => "unlisted",
        Visibility::Public => "public",
    }
}
