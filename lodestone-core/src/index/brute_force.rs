//! Brute-force (flat) index for exact nearest neighbor search.
//!
//! Computes cosine similarity against every stored vector during search.
//! O(N*d) per query, but exact: this is the ground truth the approximate
//! indexes are measured against, and a perfectly good index for small
//! libraries.

use std::collections::HashMap;

use crate::distance::dot_product;
use crate::error::{Error, Result};
use crate::index::{rank_hits, AlgorithmTag, IndexStats, SearchHit, StatsDetail};
use crate::metadata::Metadata;
use crate::vector::{ChunkId, Vector};

#[derive(Debug, Clone)]
struct Entry {
    vector: Vector,
    #[allow(dead_code)]
    metadata: Metadata,
    /// Position in the insert sequence; stable across overwrites.
    seq: u64,
}

/// Exact linear-scan index.
///
/// # Example
///
/// ```
/// use lodestone_core::{BruteForceIndex, Metadata};
/// use uuid::Uuid;
///
/// let mut index = BruteForceIndex::new(3);
/// let id = Uuid::new_v4();
/// index.add(id, &[1.0, 0.0, 0.0], Metadata::new()).unwrap();
///
/// let hits = index.search(&[1.0, 0.0, 0.0], 1).unwrap();
/// assert_eq!(hits[0].chunk_id, id);
/// assert!((hits[0].similarity - 1.0).abs() < 1e-5);
/// ```
#[derive(Debug)]
pub struct BruteForceIndex {
    dimension: usize,
    entries: HashMap<ChunkId, Entry>,
    next_seq: u64,
    built: bool,
}

impl BruteForceIndex {
    /// Creates an empty index for vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: HashMap::new(),
            next_seq: 0,
            built: false,
        }
    }

    /// Returns the dimension of vectors in this index.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Returns the number of distinct chunk ids stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the index contains no vectors.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stores the normalized form of `vector` under `id`.
    ///
    /// Re-inserting an existing id replaces the vector in place; the entry
    /// keeps its original position in the insert sequence and `len` does not
    /// change.
    pub fn add(&mut self, id: ChunkId, vector: &[f32], metadata: Metadata) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }

        let normalized = Vector::new(vector).normalized();
        let seq = match self.entries.get(&id) {
            Some(existing) => existing.seq,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                seq
            }
        };
        self.entries.insert(
            id,
            Entry {
                vector: normalized,
                metadata,
                seq,
            },
        );
        Ok(())
    }

    /// Removes `id`; returns whether it existed. Idempotent.
    pub fn remove(&mut self, id: ChunkId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Returns the stored (normalized) vector for `id`, if present.
    pub fn get(&self, id: ChunkId) -> Option<&Vector> {
        self.entries.get(&id).map(|e| &e.vector)
    }

    /// Exact top-k search under cosine similarity.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let normalized_query = Vector::new(query).normalized();
        let q = normalized_query.as_slice();

        let scored: Vec<_> = self
            .entries
            .iter()
            .map(|(&id, entry)| (id, dot_product(q, entry.vector.as_slice()), entry.seq))
            .collect();

        Ok(rank_hits(scored, k))
    }

    /// Brute force needs no build step; marks the instance as built.
    pub fn build(&mut self) {
        self.built = true;
    }

    /// Current statistics.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            algorithm: AlgorithmTag::BruteForce,
            dimension: self.dimension,
            size: self.len(),
            built: self.built,
            detail: StatsDetail::BruteForce {
                memory_bytes: self.len() * self.dimension * std::mem::size_of::<f32>(),
            },
        }
    }
}
