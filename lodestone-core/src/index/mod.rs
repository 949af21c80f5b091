//! Vector index algorithms and their shared surface.
//!
//! The three algorithms are represented as a closed variant, [`VectorIndex`],
//! and dispatched in one place rather than through runtime subtyping. Every
//! index stores L2-normalized vectors (zero vectors as-is) and ranks by
//! cosine similarity descending, with ties broken by insertion order.

pub mod brute_force;
pub mod hnsw;
pub mod lsh;

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::CoreConfig;
use crate::error::Result;
use crate::metadata::Metadata;
use crate::vector::ChunkId;

use self::brute_force::BruteForceIndex;
use self::hnsw::HnswIndex;
use self::lsh::LshIndex;

/// The indexing algorithms a library can be served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmTag {
    /// Hierarchical Navigable Small World proximity graph.
    Hnsw,
    /// Random-hyperplane locality-sensitive hashing.
    Lsh,
    /// Exact linear scan baseline.
    BruteForce,
}

impl AlgorithmTag {
    /// All algorithms, in dispatch order.
    pub const ALL: [AlgorithmTag; 3] =
        [AlgorithmTag::Hnsw, AlgorithmTag::Lsh, AlgorithmTag::BruteForce];

    /// The configuration-file / API spelling of this tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlgorithmTag::Hnsw => "hnsw",
            AlgorithmTag::Lsh => "lsh",
            AlgorithmTag::BruteForce => "brute_force",
        }
    }
}

impl Default for AlgorithmTag {
    fn default() -> Self {
        AlgorithmTag::Hnsw
    }
}

impl FromStr for AlgorithmTag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hnsw" => Ok(AlgorithmTag::Hnsw),
            "lsh" => Ok(AlgorithmTag::Lsh),
            "brute_force" | "bruteforce" => Ok(AlgorithmTag::BruteForce),
            other => Err(format!("unknown vector index algorithm: {other}")),
        }
    }
}

impl std::fmt::Display for AlgorithmTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single ranked hit from a k-NN search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// The chunk the stored vector belongs to.
    pub chunk_id: ChunkId,
    /// Cosine similarity to the query, in [-1, 1].
    pub similarity: f32,
    /// `1.0 - similarity`, reported for diagnostic symmetry.
    pub distance: f32,
}

/// Statistics reported by an index instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Which algorithm produced these stats.
    pub algorithm: AlgorithmTag,
    /// Vector dimension of the instance.
    pub dimension: usize,
    /// Number of distinct chunk ids currently stored.
    pub size: usize,
    /// Whether `build` has been invoked.
    pub built: bool,
    /// Algorithm-specific counters.
    pub detail: StatsDetail,
}

/// Per-algorithm counters attached to [`IndexStats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum StatsDetail {
    BruteForce {
        /// Estimated vector storage, `size * dimension * 4` bytes.
        memory_bytes: usize,
    },
    Lsh {
        tables: usize,
        hash_bits: usize,
        total_buckets: usize,
        avg_bucket_len: f32,
    },
    Hnsw {
        max_level: usize,
        has_entry_point: bool,
        avg_neighbors: f32,
    },
}

/// A vector index instance serving one `(library, algorithm)` key.
///
/// The closed variant is the single dispatch point for the three algorithms;
/// the registry and tests talk to this type, never to a concrete index
/// behind a trait object.
#[derive(Debug)]
pub enum VectorIndex {
    Hnsw(HnswIndex),
    Lsh(LshIndex),
    BruteForce(BruteForceIndex),
}

impl VectorIndex {
    /// Creates an empty instance of the given algorithm using the configured
    /// dimension and algorithm knobs.
    pub fn for_algorithm(tag: AlgorithmTag, config: &CoreConfig) -> Self {
        match tag {
            AlgorithmTag::Hnsw => {
                VectorIndex::Hnsw(HnswIndex::new(config.dimension, config.hnsw.clone()))
            }
            AlgorithmTag::Lsh => {
                VectorIndex::Lsh(LshIndex::new(config.dimension, config.lsh.clone()))
            }
            AlgorithmTag::BruteForce => {
                VectorIndex::BruteForce(BruteForceIndex::new(config.dimension))
            }
        }
    }

    /// The algorithm this instance runs.
    pub fn algorithm(&self) -> AlgorithmTag {
        match self {
            VectorIndex::Hnsw(_) => AlgorithmTag::Hnsw,
            VectorIndex::Lsh(_) => AlgorithmTag::Lsh,
            VectorIndex::BruteForce(_) => AlgorithmTag::BruteForce,
        }
    }

    /// Stores `vector` under `id`, replacing any previous entry in place.
    pub fn add(&mut self, id: ChunkId, vector: &[f32], metadata: Metadata) -> Result<()> {
        match self {
            VectorIndex::Hnsw(index) => index.add(id, vector, metadata),
            VectorIndex::Lsh(index) => index.add(id, vector, metadata),
            VectorIndex::BruteForce(index) => index.add(id, vector, metadata),
        }
    }

    /// Removes `id`; returns whether it was present.
    pub fn remove(&mut self, id: ChunkId) -> bool {
        match self {
            VectorIndex::Hnsw(index) => index.remove(id),
            VectorIndex::Lsh(index) => index.remove(id),
            VectorIndex::BruteForce(index) => index.remove(id),
        }
    }

    /// Returns the `min(k, size)` nearest stored vectors to `query`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        match self {
            VectorIndex::Hnsw(index) => index.search(query, k),
            VectorIndex::Lsh(index) => index.search(query, k),
            VectorIndex::BruteForce(index) => index.search(query, k),
        }
    }

    /// Builds/optimizes the index. All three algorithms build incrementally,
    /// so this only marks the instance as built.
    pub fn build(&mut self) {
        match self {
            VectorIndex::Hnsw(index) => index.build(),
            VectorIndex::Lsh(index) => index.build(),
            VectorIndex::BruteForce(index) => index.build(),
        }
    }

    /// Number of distinct chunk ids currently stored.
    pub fn len(&self) -> usize {
        match self {
            VectorIndex::Hnsw(index) => index.len(),
            VectorIndex::Lsh(index) => index.len(),
            VectorIndex::BruteForce(index) => index.len(),
        }
    }

    /// Returns true if the instance stores no vectors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current statistics and algorithm-specific counters.
    pub fn stats(&self) -> IndexStats {
        match self {
            VectorIndex::Hnsw(index) => index.stats(),
            VectorIndex::Lsh(index) => index.stats(),
            VectorIndex::BruteForce(index) => index.stats(),
        }
    }
}

/// Ranks `(id, similarity, insert_seq)` triples: similarity descending, then
/// insertion order ascending, truncated to `k`.
pub(crate) fn rank_hits(mut scored: Vec<(ChunkId, f32, u64)>, k: usize) -> Vec<SearchHit> {
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.2.cmp(&b.2))
    });
    scored.truncate(k);
    scored
        .into_iter()
        .map(|(chunk_id, similarity, _)| SearchHit {
            chunk_id,
            similarity,
            distance: 1.0 - similarity,
        })
        .collect()
}
