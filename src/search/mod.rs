//! Search Indexer
//!
//! Projects published collections into a searchable index and keeps it
//! eventually consistent with the collection store.
//!
//! ## Consistency model
//! - a publish commits regardless of indexer outcome; index failures are
//!   retried with capped exponential backoff and never surfaced to the
//!   publisher
//! - `apply` is idempotent, so the outbox's at-least-once delivery converges
//! - if the backend is unreachable at query time, `search` returns an empty
//!   result with `degraded = true` instead of failing — stale-but-available
//!   beats unavailable
//! - `reindex_all` rebuilds every document from the store's current state and
//!   is idempotent

mod backend;

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

pub use backend::{MemorySearchBackend, SearchBackend, SearchBackendError, SearchBackendResult};

use crate::config::IndexerConfig;
use crate::errors::WorkshopResult;
use crate::model::{Collection, CollectionId, UserId, Visibility};
use crate::observability::{Event, Logger, MetricsRegistry};
use crate::outbox::{IndexEvent, Outbox};
use crate::store::CollectionStore;

/// Disposable projection of a public collection's discovery metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDocument {
    /// The collection this document projects
    pub collection_id: CollectionId,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Discovery tags
    pub tags: Vec<String>,
    /// Owner identity
    pub owner: UserId,
    /// Approximate subscriber count (popularity ordering)
    pub num_subscribers: i64,
    /// Current version number at projection time
    pub version_number: u64,
}

impl SearchDocument {
    /// Projects an outbox event's commit-time metadata
    pub fn from_event(event: &IndexEvent) -> Self {
        Self {
            collection_id: event.collection_id,
            name: event.name.clone(),
            description: event.description.clone(),
            tags: event.tags.clone(),
            owner: event.owner,
            num_subscribers: event.num_subscribers,
            version_number: event.version_number,
        }
    }

    /// Projects a collection's current state (full reindex path)
    pub fn from_collection(collection: &Collection) -> Self {
        Self {
            collection_id: collection.id,
            name: collection.name.clone(),
            description: collection.description.clone(),
            tags: collection.tags.clone(),
            owner: collection.owner,
            num_subscribers: collection.num_subscribers,
            version_number: collection.current_version_number,
        }
    }
}

/// A free-text plus tag-filtered search request
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    /// Free text matched against name and description
    pub text: Option<String>,
    /// Tags the result must carry (all of them)
    #[serde(default)]
    pub tags: Vec<String>,
    /// Maximum results returned
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    25
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: None,
            tags: Vec::new(),
            limit: default_limit(),
        }
    }
}

impl SearchQuery {
    /// Free-text query with default limit
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

/// A discovery hit returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    /// Collection id
    pub id: CollectionId,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Discovery tags
    pub tags: Vec<String>,
    /// Owner identity
    pub owner: UserId,
    /// Approximate subscriber count
    pub num_subscribers: i64,
}

impl From<SearchDocument> for CollectionSummary {
    fn from(doc: SearchDocument) -> Self {
        Self {
            id: doc.collection_id,
            name: doc.name,
            description: doc.description,
            tags: doc.tags,
            owner: doc.owner,
            num_subscribers: doc.num_subscribers,
        }
    }
}

/// Search results plus the degraded-mode signal
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    /// Ordered hits; empty in degraded mode
    pub summaries: Vec<CollectionSummary>,
    /// True when the backend was unreachable and the result is best-effort
    pub degraded: bool,
}

/// Outcome of one worker pass over the outbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainOutcome {
    /// Events successfully projected this pass
    pub dispatched: usize,
    /// Events still pending (backend kept failing)
    pub remaining: usize,
}

/// Report from a full reindex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReindexReport {
    /// Documents upserted
    pub indexed: usize,
    /// Documents removed (non-public or tombstoned)
    pub removed: usize,
}

/// Why a full reindex stopped early
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReindexError {
    /// Primary store failed; nothing to rebuild from
    #[error(transparent)]
    Store(#[from] crate::errors::WorkshopError),
    /// Backend refused mid-rebuild; rerun once it recovers
    #[error(transparent)]
    Backend(#[from] SearchBackendError),
}

/// The search indexer component
pub struct SearchIndexer {
    backend: Arc<dyn SearchBackend>,
    store: CollectionStore,
    outbox: Outbox,
    metrics: Arc<MetricsRegistry>,
    config: IndexerConfig,
}

impl SearchIndexer {
    /// Create an indexer over the given backend and store
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        store: CollectionStore,
        outbox: Outbox,
        metrics: Arc<MetricsRegistry>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            backend,
            store,
            outbox,
            metrics,
            config,
        }
    }

    /// Projects one outbox event into the index.
    ///
    /// Idempotent: upserts keyed by collection id when the event's visibility
    /// is public (and not tombstoned), deletes otherwise.
    pub fn apply(&self, event: &IndexEvent) -> SearchBackendResult<()> {
        if event.is_upsert() {
            self.backend.upsert(SearchDocument::from_event(event))?;
            self.metrics.incr_index_upserts();
            Logger::trace(
                Event::IndexUpsert.as_str(),
                &[
                    ("collection", &event.collection_id.to_string()),
                    ("seq", &event.seq.to_string()),
                ],
            );
        } else {
            self.backend.delete(event.collection_id)?;
            self.metrics.incr_index_deletes();
            Logger::trace(
                Event::IndexDelete.as_str(),
                &[
                    ("collection", &event.collection_id.to_string()),
                    ("seq", &event.seq.to_string()),
                ],
            );
        }
        Ok(())
    }

    /// Runs a discovery search.
    ///
    /// Never fails: an unreachable backend yields an empty result with the
    /// degraded flag set.
    pub fn search(&self, query: &SearchQuery) -> SearchResults {
        match self.backend.query(query) {
            Ok(hits) => SearchResults {
                summaries: hits.into_iter().map(CollectionSummary::from).collect(),
                degraded: false,
            },
            Err(err) => {
                self.metrics.incr_degraded_searches();
                Logger::warn(
                    Event::SearchDegraded.as_str(),
                    &[("reason", &err.to_string())],
                );
                SearchResults {
                    summaries: Vec::new(),
                    degraded: true,
                }
            }
        }
    }

    /// Rebuilds every search document from the collection store.
    ///
    /// Idempotent: running it twice produces the same index contents.
    pub fn reindex_all(&self) -> Result<ReindexReport, ReindexError> {
        Logger::info(Event::ReindexStart.as_str(), &[]);
        let collections = self.store.list_all()?;

        let mut report = ReindexReport {
            indexed: 0,
            removed: 0,
        };
        for collection in &collections {
            let result = if collection.visibility == Visibility::Public && !collection.tombstoned {
                report.indexed += 1;
                self.backend.upsert(SearchDocument::from_collection(collection))
            } else {
                report.removed += 1;
                self.backend.delete(collection.id)
            };
            if let Err(err) = result {
                self.metrics.incr_index_failures();
                Logger::error(
                    Event::IndexRetry.as_str(),
                    &[
                        ("collection", &collection.id.to_string()),
                        ("phase", "reindex"),
                        ("reason", &err.to_string()),
                    ],
                );
                return Err(err.into());
            }
        }

        self.metrics.incr_reindex_runs();
        Logger::info(
            Event::ReindexComplete.as_str(),
            &[
                ("indexed", &report.indexed.to_string()),
                ("removed", &report.removed.to_string()),
            ],
        );
        Ok(report)
    }

    /// Drains one batch of pending outbox events, retrying each with capped
    /// exponential backoff and jitter.
    ///
    /// Stops at the first event that exhausts its attempts so events apply in
    /// sequence order; the backlog stays queued for the next pass.
    pub async fn run_once(&self) -> WorkshopResult<DrainOutcome> {
        let pending = self.outbox.pending(self.config.batch_size)?;
        let mut dispatched = 0usize;

        for event in &pending {
            if self.apply_with_retry(event).await {
                self.outbox.mark_dispatched(event.seq)?;
                dispatched += 1;
            } else {
                Logger::warn(
                    Event::IndexBackoff.as_str(),
                    &[
                        ("collection", &event.collection_id.to_string()),
                        ("seq", &event.seq.to_string()),
                    ],
                );
                break;
            }
        }

        Ok(DrainOutcome {
            dispatched,
            remaining: self.outbox.backlog()?,
        })
    }

    /// Runs the worker until `shutdown` flips to true.
    ///
    /// Detached from the publish path: arbitrary delay here never affects
    /// read-your-own-write on the collection store.
    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                return;
            }
            match self.run_once().await {
                Ok(outcome) if outcome.remaining > 0 => {
                    // Backend still failing; wait out the poll interval.
                }
                Ok(_) => {}
                Err(err) => {
                    Logger::error(
                        Event::IndexRetry.as_str(),
                        &[("phase", "drain"), ("reason", &err.to_string())],
                    );
                }
            }
            tokio::select! {
                _ = shutdown.changed() => return,
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
            }
        }
    }

    async fn apply_with_retry(&self, event: &IndexEvent) -> bool {
        for attempt in 0..self.config.max_attempts {
            match self.apply(event) {
                Ok(()) => return true,
                Err(err) => {
                    self.metrics.incr_index_failures();
                    Logger::warn(
                        Event::IndexRetry.as_str(),
                        &[
                            ("attempt", &attempt.to_string()),
                            ("collection", &event.collection_id.to_string()),
                            ("reason", &err.to_string()),
                            ("seq", &event.seq.to_string()),
                        ],
                    );
                    if attempt + 1 < self.config.max_attempts {
                        let jitter_ms = rand::thread_rng().gen_range(0..=self.config.backoff_base_ms);
                        let delay = self.config.backoff_delay(attempt)
                            + std::time::Duration::from_millis(jitter_ms);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        false
    }
}
