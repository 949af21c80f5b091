//! # Lodestone Core
//!
//! Core library for Lodestone - the vector similarity search engine of a
//! document-oriented vector database.
//!
//! The core accepts high-dimensional float vectors tagged by opaque chunk
//! identifiers, organizes them into per-library in-memory indexes, and
//! answers k-nearest-neighbour queries under cosine similarity. Indexes are
//! volatile: they are rebuilt from the external store at startup via
//! [`IndexRegistry::rehydrate`].
//!
//! ## Core Types
//!
//! ### Indexes
//!
//! - [`BruteForceIndex`] - exact nearest neighbor search, O(n) per query
//! - [`LshIndex`] - random-hyperplane locality-sensitive hashing with exact
//!   re-ranking
//! - [`HnswIndex`] - approximate nearest neighbor over an HNSW graph
//! - [`VectorIndex`] - the closed variant the registry dispatches over
//!
//! ### Ownership and orchestration
//!
//! - [`IndexRegistry`] - per-library, per-algorithm instance ownership and
//!   lifecycle, thread-safe by internal locking
//! - [`SearchOrchestrator`] - text/vector search workflow over the registry,
//!   enriched from the external store
//!
//! ### Types
//!
//! - [`Vector`] - owned vector data, normalization-aware
//! - [`ChunkId`] / [`LibraryId`] - opaque 128-bit identifiers
//! - [`Metadata`] - opaque string-to-string diagnostics mapping
//! - [`AlgorithmTag`] - which algorithm serves a library
//! - [`CoreConfig`] - process-wide configuration, environment-derived

pub mod config;
pub mod distance;
pub mod error;
pub mod index;
pub mod metadata;
pub mod orchestrator;
pub mod registry;
pub mod vector;

// Re-exports for convenient access
pub use config::CoreConfig;
pub use error::{Error, Result};
pub use index::brute_force::BruteForceIndex;
pub use index::hnsw::{HnswConfig, HnswIndex};
pub use index::lsh::{LshConfig, LshIndex};
pub use index::{AlgorithmTag, IndexStats, SearchHit, StatsDetail, VectorIndex};
pub use metadata::Metadata;
pub use orchestrator::{
    ChunkStore, EmbeddingProvider, SearchMatch, SearchOrchestrator, StoredChunk,
};
pub use registry::IndexRegistry;
pub use vector::{ChunkId, LibraryId, Vector};

/// Re-export commonly used types for convenience.
///
/// # Example
///
/// ```rust
/// use lodestone_core::prelude::*;
/// use uuid::Uuid;
///
/// let registry = IndexRegistry::new(CoreConfig::new(4));
/// registry
///     .add_chunk(Uuid::new_v4(), Uuid::new_v4(), &[1.0, 0.0, 0.0, 0.0], Metadata::new(), false)
///     .unwrap();
/// ```
pub mod prelude {
    pub use crate::{
        AlgorithmTag, BruteForceIndex, ChunkId, ChunkStore, CoreConfig, EmbeddingProvider, Error,
        HnswConfig, HnswIndex, IndexRegistry, IndexStats, LibraryId, LshConfig, LshIndex,
        Metadata, Result, SearchHit, SearchMatch, SearchOrchestrator, StoredChunk, Vector,
        VectorIndex,
    };
}
