//! Search backend capability
//!
//! The real deployment talks to an external search service; the core only
//! sees this trait. Availability is not guaranteed and callers must treat
//! every operation as fallible.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use thiserror::Error;

use crate::model::CollectionId;

use super::{SearchDocument, SearchQuery};

/// Errors from the search backend
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchBackendError {
    /// Backend unreachable or refusing requests
    #[error("search backend unavailable: {0}")]
    Unavailable(String),

    /// Backend rejected the request
    #[error("search backend rejected request: {0}")]
    Rejected(String),
}

/// Result type for backend operations
pub type SearchBackendResult<T> = Result<T, SearchBackendError>;

/// Capability trait for the search backend.
///
/// Documents are keyed by collection id; upsert and delete must be
/// idempotent so at-least-once event delivery converges.
pub trait SearchBackend: Send + Sync {
    /// Inserts or replaces the document for its collection id
    fn upsert(&self, document: SearchDocument) -> SearchBackendResult<()>;

    /// Removes the document for a collection id; unknown ids are a no-op
    fn delete(&self, collection_id: CollectionId) -> SearchBackendResult<()>;

    /// Runs a free-text plus tag-filtered query.
    ///
    /// Result ordering is backend-defined; the sequence is finite and not
    /// restartable across index updates.
    fn query(&self, query: &SearchQuery) -> SearchBackendResult<Vec<SearchDocument>>;

    /// Every indexed document, for idempotence checks and index audits
    fn dump(&self) -> SearchBackendResult<Vec<SearchDocument>>;
}

/// In-memory search backend for tests and single-process deployments.
///
/// Availability can be toggled to exercise degraded-mode and retry paths.
#[derive(Default)]
pub struct MemorySearchBackend {
    documents: RwLock<HashMap<CollectionId, SearchDocument>>,
    available: AtomicBool,
}

impl MemorySearchBackend {
    /// Create an empty, available backend
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Toggle simulated availability
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> SearchBackendResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SearchBackendError::Unavailable("simulated outage".into()))
        }
    }

    fn lock_failed() -> SearchBackendError {
        SearchBackendError::Unavailable("backend lock poisoned".into())
    }
}

impl SearchBackend for MemorySearchBackend {
    fn upsert(&self, document: SearchDocument) -> SearchBackendResult<()> {
        self.check_available()?;
        let mut docs = self.documents.write().map_err(|_| Self::lock_failed())?;
        docs.insert(document.collection_id, document);
        Ok(())
    }

    fn delete(&self, collection_id: CollectionId) -> SearchBackendResult<()> {
        self.check_available()?;
        let mut docs = self.documents.write().map_err(|_| Self::lock_failed())?;
        docs.remove(&collection_id);
        Ok(())
    }

    fn query(&self, query: &SearchQuery) -> SearchBackendResult<Vec<SearchDocument>> {
        self.check_available()?;
        let docs = self.documents.read().map_err(|_| Self::lock_failed())?;

        let needle = query.text.as_deref().map(str::to_lowercase);
        let mut hits: Vec<SearchDocument> = docs
            .values()
            .filter(|d| match &needle {
                Some(text) => {
                    d.name.to_lowercase().contains(text)
                        || d.description.to_lowercase().contains(text)
                }
                None => true,
            })
            .filter(|d| query.tags.iter().all(|tag| d.tags.contains(tag)))
            .cloned()
            .collect();

        // Popularity ordering, name as tie-break for determinism.
        hits.sort_by(|a, b| {
            b.num_subscribers
                .cmp(&a.num_subscribers)
                .then_with(|| a.name.cmp(&b.name))
        });
        hits.truncate(query.limit);
        Ok(hits)
    }

    fn dump(&self) -> SearchBackendResult<Vec<SearchDocument>> {
        self.check_available()?;
        let docs = self.documents.read().map_err(|_| Self::lock_failed())?;
        let mut all: Vec<SearchDocument> = docs.values().cloned().collect();
        all.sort_by(|a, b| a.collection_id.cmp(&b.collection_id));
        Ok(all)
    }
}
