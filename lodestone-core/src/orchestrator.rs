//! Search orchestration: query embedding, index lookup, store enrichment.
//!
//! The orchestrator is the only async part of the core. It suspends at
//! exactly two points - the embedding call and the store fetches - both
//! outside every index lock; the registry work in between is synchronous.
//!
//! The embedding provider and the chunk store are external collaborators
//! reached through the traits below; the orchestrator is handed its
//! dependencies at construction rather than reaching for process-global
//! state.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::index::AlgorithmTag;
use crate::registry::IndexRegistry;
use crate::vector::{ChunkId, LibraryId};

/// Converts query text into an embedding vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a search query. The returned vector must have the configured
    /// process-wide dimension.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

/// Fetches chunk text and document names from the persistent store.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Looks up a chunk by id. `Ok(None)` means the chunk no longer exists
    /// (e.g. deleted between index hit and fetch).
    async fn fetch_chunk(&self, chunk_id: ChunkId) -> Result<Option<StoredChunk>>;
}

/// A chunk as returned by the external store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredChunk {
    /// The chunk's text content.
    pub text: String,
    /// Name of the document the chunk belongs to.
    pub document_name: String,
}

/// A fully enriched search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub chunk_id: ChunkId,
    pub text: String,
    pub similarity: f32,
    pub document_name: String,
}

/// Orchestrates the complete search workflow over a shared registry.
///
/// Embedding failures collapse to an empty result (logged); chunks missing
/// from the store are silently skipped, which makes search eventually
/// consistent with deletions.
pub struct SearchOrchestrator<E, S> {
    registry: Arc<IndexRegistry>,
    embedder: E,
    store: S,
}

impl<E, S> SearchOrchestrator<E, S>
where
    E: EmbeddingProvider,
    S: ChunkStore,
{
    /// Creates an orchestrator over the given registry and collaborators.
    pub fn new(registry: Arc<IndexRegistry>, embedder: E, store: S) -> Self {
        Self {
            registry,
            embedder,
            store,
        }
    }

    /// The registry this orchestrator queries.
    pub fn registry(&self) -> &IndexRegistry {
        &self.registry
    }

    /// Searches a library by query text.
    ///
    /// A blank query or a failed embedding yields `Ok(vec![])`; only
    /// programming errors (wrong embedding width) surface as `Err`.
    pub async fn search_text(
        &self,
        library_id: LibraryId,
        query_text: &str,
        k: usize,
        algorithm: Option<AlgorithmTag>,
    ) -> Result<Vec<SearchMatch>> {
        if query_text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let embedding = match self.embedder.embed_query(query_text).await {
            Ok(embedding) => embedding,
            Err(error) => {
                warn!(library = %library_id, %error, "query embedding failed");
                return Ok(Vec::new());
            }
        };

        self.search_vector(library_id, &embedding, k, algorithm).await
    }

    /// Searches a library by query vector, enriching each index hit with the
    /// chunk's text and document name from the store.
    pub async fn search_vector(
        &self,
        library_id: LibraryId,
        query: &[f32],
        k: usize,
        algorithm: Option<AlgorithmTag>,
    ) -> Result<Vec<SearchMatch>> {
        let hits = self.registry.query(library_id, query, k, algorithm)?;

        let mut matches = Vec::with_capacity(hits.len());
        for hit in hits {
            match self.store.fetch_chunk(hit.chunk_id).await {
                Ok(Some(chunk)) => matches.push(SearchMatch {
                    chunk_id: hit.chunk_id,
                    text: chunk.text,
                    similarity: hit.similarity,
                    document_name: chunk.document_name,
                }),
                Ok(None) => {
                    debug!(chunk = %hit.chunk_id, "indexed chunk missing from store; skipping");
                }
                Err(error) => {
                    debug!(chunk = %hit.chunk_id, %error, "store fetch failed; skipping chunk");
                }
            }
        }
        Ok(matches)
    }
}
