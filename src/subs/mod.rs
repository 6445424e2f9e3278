//! Subscription Resolver
//!
//! Maps a subscriber's installed references (pinned or track-latest) to the
//! concrete versions that govern their runtime alias set.
//!
//! ## Resolution rules
//! - `Latest` resolves read-through to the collection's current version at
//!   resolution time; owners may republish at any moment
//! - `Pinned` resolves to the stored version id, unaffected by later
//!   publishes
//! - a tombstoned (or physically missing) collection resolves to a terminal
//!   `Unavailable` marker; the rest of the batch still resolves
//! - name collisions across subscribed collections resolve by subscription
//!   creation order, earliest wins, independently per collectable kind

use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::{WorkshopError, WorkshopResult};
use crate::model::{
    Collectable, CollectableKind, CollectionId, PinMode, SubscriberId, Subscription, UserId,
    Version,
};
use crate::observability::{Event, Logger, MetricsRegistry};
use crate::perms::{require, Capability};
use crate::store::{CollectionStore, SubscriptionRepo};

/// The outcome of resolving one subscription
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The subscription resolves to a concrete version
    Active {
        /// The subscription record
        subscription: Subscription,
        /// The effective version
        version: Version,
    },
    /// The collection is tombstoned, missing, or has never published
    Unavailable {
        /// The subscription record
        subscription: Subscription,
    },
}

impl Resolution {
    /// The subscription this entry resolves
    pub fn subscription(&self) -> &Subscription {
        match self {
            Resolution::Active { subscription, .. } => subscription,
            Resolution::Unavailable { subscription } => subscription,
        }
    }

    /// The effective version, if available
    pub fn version(&self) -> Option<&Version> {
        match self {
            Resolution::Active { version, .. } => Some(version),
            Resolution::Unavailable { .. } => None,
        }
    }
}

/// A subscriber's fully resolved alias environment, in precedence order
#[derive(Debug, Clone, Default)]
pub struct ResolvedSet {
    entries: Vec<Resolution>,
}

impl ResolvedSet {
    /// All entries in subscription creation order
    pub fn entries(&self) -> &[Resolution] {
        &self.entries
    }

    /// The effective version for one collection, if available
    pub fn effective(&self, collection_id: CollectionId) -> Option<&Version> {
        self.entries
            .iter()
            .find(|r| r.subscription().collection_id == collection_id)
            .and_then(Resolution::version)
    }

    /// The runtime collectable set of one kind, earliest subscription winning
    /// name collisions
    pub fn active(&self, kind: CollectableKind) -> Vec<&Collectable> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        for entry in &self.entries {
            let Some(version) = entry.version() else {
                continue;
            };
            for collectable in version.of_kind(kind) {
                if seen.insert(collectable.name.as_str()) {
                    out.push(collectable);
                }
            }
        }
        out
    }

    /// Looks up the winning collectable for a name
    pub fn lookup(&self, kind: CollectableKind, name: &str) -> Option<&Collectable> {
        self.active(kind).into_iter().find(|c| c.name == name)
    }
}

/// The subscription resolver component
#[derive(Clone)]
pub struct SubscriptionResolver {
    store: CollectionStore,
    subscriptions: Arc<dyn SubscriptionRepo>,
    metrics: Arc<MetricsRegistry>,
}

impl SubscriptionResolver {
    /// Create a resolver over the given store and repository
    pub fn new(
        store: CollectionStore,
        subscriptions: Arc<dyn SubscriptionRepo>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            store,
            subscriptions,
            metrics,
        }
    }

    /// Subscribes `subscriber` to a collection.
    ///
    /// `invoker` is the acting user (for guild installs, whoever ran the
    /// command). Private collections require the invoker to hold `Read`; a
    /// pinned target must belong to the collection. Re-subscribing updates
    /// the pin mode but keeps the original precedence position.
    pub fn subscribe(
        &self,
        subscriber: SubscriberId,
        collection_id: CollectionId,
        mode: PinMode,
        invoker: UserId,
    ) -> WorkshopResult<Subscription> {
        let collection = self.store.get_collection(collection_id)?;
        if collection.tombstoned {
            return Err(WorkshopError::not_found("collection"));
        }
        require(invoker, &collection, Capability::Read)?;

        if let PinMode::Pinned(version_id) = mode {
            let version = self.store.get_version(version_id)?;
            if version.collection_id() != collection_id {
                return Err(WorkshopError::validation(
                    "pinned_version",
                    "version does not belong to the subscribed collection",
                ));
            }
        }

        let (stored, created) = self
            .subscriptions
            .upsert(Subscription::new(subscriber, collection_id, mode))?;

        if created {
            let (users, guilds) = match subscriber {
                SubscriberId::User(_) => (1, 0),
                SubscriberId::Guild(_) => (0, 1),
            };
            self.store
                .adjust_subscriber_count(collection_id, users, guilds)?;
            self.metrics.incr_subscriptions_created();
        }
        Logger::info(
            if created {
                Event::SubscriptionCreated.as_str()
            } else {
                Event::SubscriptionUpdated.as_str()
            },
            &[
                ("collection", &collection_id.to_string()),
                ("invoker", &invoker.to_string()),
            ],
        );
        Ok(stored)
    }

    /// Removes a subscription
    pub fn unsubscribe(
        &self,
        subscriber: SubscriberId,
        collection_id: CollectionId,
    ) -> WorkshopResult<()> {
        if !self.subscriptions.delete(subscriber, collection_id)? {
            return Err(WorkshopError::not_found("subscription"));
        }
        let (users, guilds) = match subscriber {
            SubscriberId::User(_) => (-1, 0),
            SubscriberId::Guild(_) => (0, -1),
        };
        // The collection may be tombstoned or gone; counts are approximate.
        let _ = self
            .store
            .adjust_subscriber_count(collection_id, users, guilds);
        Logger::info(
            Event::SubscriptionRemoved.as_str(),
            &[("collection", &collection_id.to_string())],
        );
        Ok(())
    }

    /// Resolves every subscription of `subscriber` in creation order.
    ///
    /// Only a primary-store failure aborts the batch; per-collection
    /// problems become `Unavailable` entries.
    pub fn resolve(&self, subscriber: SubscriberId) -> WorkshopResult<ResolvedSet> {
        let mut entries = Vec::new();

        for subscription in self.subscriptions.find_by_subscriber(subscriber)? {
            let resolution = self.resolve_one(&subscription)?;
            entries.push(resolution);
        }

        Ok(ResolvedSet { entries })
    }

    fn resolve_one(&self, subscription: &Subscription) -> WorkshopResult<Resolution> {
        let collection = match self.store.get_collection(subscription.collection_id) {
            Ok(c) => c,
            Err(WorkshopError::NotFound(_)) => {
                return Ok(Resolution::Unavailable {
                    subscription: subscription.clone(),
                })
            }
            Err(err) => return Err(err),
        };
        if collection.tombstoned {
            return Ok(Resolution::Unavailable {
                subscription: subscription.clone(),
            });
        }

        let version_id = match subscription.mode {
            PinMode::Latest => collection.current_version,
            PinMode::Pinned(id) => Some(id),
        };
        let Some(version_id) = version_id else {
            // Subscribed before the first publish.
            return Ok(Resolution::Unavailable {
                subscription: subscription.clone(),
            });
        };

        match self.store.get_version(version_id) {
            Ok(version) => Ok(Resolution::Active {
                subscription: subscription.clone(),
                version,
            }),
            Err(WorkshopError::NotFound(_)) => Ok(Resolution::Unavailable {
                subscription: subscription.clone(),
            }),
            Err(err) => Err(err),
        }
    }
}
