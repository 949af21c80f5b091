//! # Lodestone
//!
//! **The vector similarity search core of a document vector database.**
//!
//! Lodestone organizes embedding vectors into per-library in-memory indexes
//! and answers k-nearest-neighbour queries under cosine similarity. Three
//! interchangeable algorithms serve every library:
//!
//! | Algorithm | Guarantee | Search cost |
//! |-----------|-----------|-------------|
//! | [`BruteForceIndex`] | Exact results | O(N·d) |
//! | [`LshIndex`] | Approximate, exact re-rank | sublinear candidates |
//! | [`HnswIndex`] | Approximate, high recall | O(log N) expected |
//!
//! Indexes are volatile by design: the persistent store owns the embeddings,
//! and the registry is rehydrated from it at startup. Durability, filtered
//! search and distribution live outside this crate.
//!
//! ## Quick Start
//!
//! ### A registry of library indexes
//!
//! ```rust
//! use lodestone::prelude::*;
//! use uuid::Uuid;
//!
//! // One registry per process, shared with every request handler.
//! let registry = IndexRegistry::new(CoreConfig::new(4));
//!
//! let library = Uuid::new_v4();
//! let chunk = Uuid::new_v4();
//!
//! // Instances appear lazily on first insert.
//! registry
//!     .add_chunk(library, chunk, &[0.1, 0.9, 0.0, 0.2], Metadata::new(), false)
//!     .unwrap();
//!
//! let hits = registry.query(library, &[0.1, 0.9, 0.0, 0.2], 10, None).unwrap();
//! assert_eq!(hits[0].chunk_id, chunk);
//! ```
//!
//! ### A standalone index
//!
//! ```rust
//! use lodestone::prelude::*;
//! use uuid::Uuid;
//!
//! let mut index = HnswIndex::new(4, HnswConfig::default());
//! index.add(Uuid::new_v4(), &[1.0, 0.0, 0.0, 0.0], Metadata::new()).unwrap();
//! index.add(Uuid::new_v4(), &[0.0, 1.0, 0.0, 0.0], Metadata::new()).unwrap();
//!
//! let hits = index.search(&[0.9, 0.1, 0.0, 0.0], 1).unwrap();
//! assert_eq!(hits.len(), 1);
//! ```
//!
//! ### The full search pipeline
//!
//! [`SearchOrchestrator`] wires the registry to an embedding provider and
//! the chunk store; see `examples/search_pipeline.rs` for an end-to-end
//! text-query walkthrough.

pub use lodestone_core::*;
