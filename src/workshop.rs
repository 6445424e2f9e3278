//! Workshop facade
//!
//! The plain-function surface an HTTP layer calls. Every operation takes a
//! verified caller identity from the auth context, runs the permission
//! authority against the current collection snapshot, then executes the
//! component operation. Results and errors are structured, never
//! HTTP-specific.
//!
//! Capability requirements:
//! - `Read`: get collection, list/get versions
//! - `Write`: metadata, tags
//! - `Publish`: publish
//! - `Manage`: visibility, collaborators, tombstone

use std::sync::Arc;

use crate::config::WorkshopConfig;
use crate::errors::WorkshopResult;
use crate::model::{
    Collaborator, CollaboratorRole, Collection, CollectionId, Collectable, MetadataUpdate,
    PinMode, SubscriberId, Subscription, UserId, Version, VersionId, Visibility,
};
use crate::observability::MetricsRegistry;
use crate::outbox::Outbox;
use crate::perms::{capabilities_for, require, Capability, CapabilitySet};
use crate::publish::VersionManager;
use crate::search::{
    MemorySearchBackend, SearchBackend, SearchIndexer, SearchQuery, SearchResults,
};
use crate::store::{CollectionRepo, CollectionStore, MemoryRepo, SubscriptionRepo, VersionRepo};
use crate::subs::{ResolvedSet, SubscriptionResolver};

/// The assembled publishing core
pub struct Workshop {
    store: CollectionStore,
    publisher: VersionManager,
    indexer: Arc<SearchIndexer>,
    resolver: SubscriptionResolver,
    metrics: Arc<MetricsRegistry>,
}

impl Workshop {
    /// Wires the core over the given repositories and search backend
    pub fn new(
        collections: Arc<dyn CollectionRepo>,
        versions: Arc<dyn VersionRepo>,
        subscriptions: Arc<dyn SubscriptionRepo>,
        outbox_repo: Arc<dyn crate::outbox::OutboxRepo>,
        search_backend: Arc<dyn SearchBackend>,
        config: WorkshopConfig,
    ) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());
        let outbox = Outbox::new(outbox_repo);
        let store = CollectionStore::new(
            collections.clone(),
            versions.clone(),
            outbox.clone(),
            metrics.clone(),
        );
        let publisher = VersionManager::new(
            collections,
            versions,
            outbox.clone(),
            metrics.clone(),
            config.builtin_commands.clone(),
        );
        let indexer = Arc::new(SearchIndexer::new(
            search_backend,
            store.clone(),
            outbox,
            metrics.clone(),
            config.indexer.clone(),
        ));
        let resolver = SubscriptionResolver::new(store.clone(), subscriptions, metrics.clone());
        Self {
            store,
            publisher,
            indexer,
            resolver,
            metrics,
        }
    }

    /// Fully in-memory core for tests and local development
    pub fn in_memory(config: WorkshopConfig) -> (Self, Arc<MemorySearchBackend>) {
        let repo = Arc::new(MemoryRepo::new());
        let backend = Arc::new(MemorySearchBackend::new());
        let workshop = Self::new(
            repo.clone(),
            repo.clone(),
            repo.clone(),
            repo,
            backend.clone(),
            config,
        );
        (workshop, backend)
    }

    // ----- collections -----

    /// Creates a new private collection owned by the caller
    pub fn create_collection(
        &self,
        caller: UserId,
        name: String,
        description: String,
        image: Option<String>,
    ) -> WorkshopResult<Collection> {
        self.store.create_collection(caller, name, description, image)
    }

    /// Fetches a collection the caller may read
    pub fn get_collection(&self, caller: UserId, id: CollectionId) -> WorkshopResult<Collection> {
        let collection = self.store.get_collection(id)?;
        require(caller, &collection, Capability::Read)?;
        Ok(collection)
    }

    /// The caller's capability set over a collection (for UI affordances).
    ///
    /// An empty set reports `NotFound` so a private collection's existence is
    /// as hidden here as on every other read path.
    pub fn capabilities(&self, caller: UserId, id: CollectionId) -> WorkshopResult<CapabilitySet> {
        let collection = self.store.get_collection(id)?;
        let caps = capabilities_for(caller, &collection);
        if caps.is_none() {
            return Err(crate::errors::WorkshopError::not_found("collection"));
        }
        Ok(caps)
    }

    /// Updates display metadata
    pub fn update_metadata(
        &self,
        caller: UserId,
        id: CollectionId,
        fields: MetadataUpdate,
    ) -> WorkshopResult<Collection> {
        self.authorize(caller, id, Capability::Write)?;
        self.store.update_metadata(id, fields, caller)
    }

    /// Changes visibility
    pub fn set_visibility(
        &self,
        caller: UserId,
        id: CollectionId,
        state: Visibility,
    ) -> WorkshopResult<Collection> {
        self.authorize(caller, id, Capability::Manage)?;
        self.store.set_visibility(id, state, caller)
    }

    /// Adds a collaborator
    pub fn add_collaborator(
        &self,
        caller: UserId,
        id: CollectionId,
        user: UserId,
        role: CollaboratorRole,
    ) -> WorkshopResult<Collection> {
        self.authorize(caller, id, Capability::Manage)?;
        self.store.add_collaborator(id, user, role, caller)
    }

    /// Removes a collaborator
    pub fn remove_collaborator(
        &self,
        caller: UserId,
        id: CollectionId,
        user: UserId,
    ) -> WorkshopResult<Collection> {
        self.authorize(caller, id, Capability::Manage)?;
        self.store.remove_collaborator(id, user, caller)
    }

    /// Adds a discovery tag
    pub fn add_tag(
        &self,
        caller: UserId,
        id: CollectionId,
        tag: String,
    ) -> WorkshopResult<Collection> {
        self.authorize(caller, id, Capability::Write)?;
        self.store.add_tag(id, tag, caller)
    }

    /// Removes a discovery tag
    pub fn remove_tag(
        &self,
        caller: UserId,
        id: CollectionId,
        tag: &str,
    ) -> WorkshopResult<Collection> {
        self.authorize(caller, id, Capability::Write)?;
        self.store.remove_tag(id, tag, caller)
    }

    /// Soft-deletes a collection
    pub fn tombstone(&self, caller: UserId, id: CollectionId) -> WorkshopResult<Collection> {
        self.authorize(caller, id, Capability::Manage)?;
        self.store.tombstone(id, caller)
    }

    /// Collections the caller owns
    pub fn my_collections(&self, caller: UserId) -> WorkshopResult<Vec<Collection>> {
        self.store.list_owned(caller)
    }

    /// The roster of collaborators on a collection the caller may read
    pub fn collaborators(
        &self,
        caller: UserId,
        id: CollectionId,
    ) -> WorkshopResult<Vec<Collaborator>> {
        Ok(self.get_collection(caller, id)?.collaborators)
    }

    // ----- versions -----

    /// Publishes a new version of a collection
    pub async fn publish(
        &self,
        caller: UserId,
        id: CollectionId,
        collectables: Vec<Collectable>,
        changelog: Option<String>,
    ) -> WorkshopResult<Version> {
        self.authorize(caller, id, Capability::Publish)?;
        self.publisher.publish(id, collectables, changelog, caller).await
    }

    /// Fetches one version of a collection the caller may read
    pub fn get_version(&self, caller: UserId, id: VersionId) -> WorkshopResult<Version> {
        let version = self.store.get_version(id)?;
        let collection = self.store.get_collection(version.collection_id())?;
        require(caller, &collection, Capability::Read)?;
        Ok(version)
    }

    /// Full version history of a collection the caller may read
    pub fn list_versions(
        &self,
        caller: UserId,
        id: CollectionId,
    ) -> WorkshopResult<Vec<Version>> {
        self.authorize(caller, id, Capability::Read)?;
        self.store.list_versions(id)
    }

    // ----- discovery -----

    /// Searches public collections; degrades instead of failing
    pub fn search(&self, query: &SearchQuery) -> SearchResults {
        self.indexer.search(query)
    }

    // ----- subscriptions -----

    /// Subscribes a user or guild to a collection
    pub fn subscribe(
        &self,
        caller: UserId,
        subscriber: SubscriberId,
        id: CollectionId,
        mode: PinMode,
    ) -> WorkshopResult<Subscription> {
        self.resolver.subscribe(subscriber, id, mode, caller)
    }

    /// Removes a subscription
    pub fn unsubscribe(
        &self,
        subscriber: SubscriberId,
        id: CollectionId,
    ) -> WorkshopResult<()> {
        self.resolver.unsubscribe(subscriber, id)
    }

    /// Resolves a subscriber's active alias environment
    pub fn resolve(&self, subscriber: SubscriberId) -> WorkshopResult<ResolvedSet> {
        self.resolver.resolve(subscriber)
    }

    // ----- operations -----

    /// The search indexer, for the worker task and ops endpoints
    pub fn indexer(&self) -> &Arc<SearchIndexer> {
        &self.indexer
    }

    /// Operational counters
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    fn authorize(
        &self,
        caller: UserId,
        id: CollectionId,
        capability: Capability,
    ) -> WorkshopResult<()> {
        let collection = self.store.get_collection(id)?;
        require(caller, &collection, capability)
    }
}
