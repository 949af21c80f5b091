//! LSH (Locality-Sensitive Hashing) index using random hyperplane projections.
//!
//! Each of `L` tables owns `K` unit-norm hyperplanes drawn from a standard
//! normal distribution with a deterministic per-table seed. A vector's
//! signature in a table is the packed bitstring of projection signs; vectors
//! sharing a bucket in any table become search candidates, which are then
//! re-ranked by exact cosine similarity.
//!
//! Time complexity:
//! - Insert: O(L * K * d)
//! - Search: O(L * K * d + candidates * d), candidates typically << N
//! - Space: O(N * L) bucket entries + O(N * d) vectors

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::distance::{dot_product, normalize};
use crate::error::{Error, Result};
use crate::index::{rank_hits, AlgorithmTag, IndexStats, SearchHit, StatsDetail};
use crate::metadata::Metadata;
use crate::vector::{ChunkId, Vector};

/// Configuration for the LSH index.
#[derive(Debug, Clone)]
pub struct LshConfig {
    /// Number of hash tables. More tables = higher recall, more memory.
    pub tables: usize,
    /// Projection bits per table. More bits = smaller, more selective buckets.
    /// Capped at 64 so a signature packs into one `u64` bucket key.
    pub hash_bits: usize,
    /// Base seed; table `t` draws its hyperplanes from `seed + t`.
    pub seed: u64,
}

impl Default for LshConfig {
    fn default() -> Self {
        Self {
            tables: 8,
            hash_bits: 12,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    vector: Vector,
    #[allow(dead_code)]
    metadata: Metadata,
    seq: u64,
}

/// One hash table: fixed hyperplanes plus signature-keyed buckets.
#[derive(Debug)]
struct LshTable {
    hyperplanes: Vec<Vec<f32>>,
    buckets: HashMap<u64, Vec<ChunkId>>,
}

impl LshTable {
    fn new(dimension: usize, hash_bits: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let hyperplanes = (0..hash_bits)
            .map(|_| {
                let raw: Vec<f32> = (0..dimension)
                    .map(|_| rng.sample::<f32, _>(StandardNormal))
                    .collect();
                normalize(&raw)
            })
            .collect();
        Self {
            hyperplanes,
            buckets: HashMap::new(),
        }
    }

    /// Packs the projection signs of `vector` into the bucket key.
    fn signature(&self, vector: &[f32]) -> u64 {
        let mut key = 0u64;
        for (bit, hyperplane) in self.hyperplanes.iter().enumerate() {
            if dot_product(hyperplane, vector) >= 0.0 {
                key |= 1 << bit;
            }
        }
        key
    }

    fn insert(&mut self, id: ChunkId, vector: &[f32]) {
        let key = self.signature(vector);
        self.buckets.entry(key).or_default().push(id);
    }

    fn remove(&mut self, id: ChunkId, vector: &[f32]) {
        let key = self.signature(vector);
        if let Some(bucket) = self.buckets.get_mut(&key) {
            bucket.retain(|&member| member != id);
            if bucket.is_empty() {
                self.buckets.remove(&key);
            }
        }
    }
}

/// Random-hyperplane LSH index with exact re-ranking.
///
/// Hyperplanes are fixed for the life of the instance, so two instances built
/// with the same seed and the same insert sequence answer queries
/// identically.
#[derive(Debug)]
pub struct LshIndex {
    dimension: usize,
    config: LshConfig,
    tables: Vec<LshTable>,
    entries: HashMap<ChunkId, Entry>,
    next_seq: u64,
    built: bool,
}

impl LshIndex {
    /// Creates an empty index; hyperplanes are drawn eagerly from the
    /// configured seed.
    pub fn new(dimension: usize, mut config: LshConfig) -> Self {
        // Signature packing requires at most one bit per u64 position.
        config.hash_bits = config.hash_bits.min(64);
        let tables = (0..config.tables)
            .map(|t| LshTable::new(dimension, config.hash_bits, config.seed + t as u64))
            .collect();
        Self {
            dimension,
            config,
            tables,
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

    /// Stores the normalized form of `vector` under `id` and hashes it into
    /// every table. Re-inserting an existing id unhooks the old signatures
    /// first and keeps the entry's insert-sequence position.
    pub fn add(&mut self, id: ChunkId, vector: &[f32], metadata: Metadata) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }

        let normalized = Vector::new(vector).normalized();

        let seq = match self.entries.remove(&id) {
            Some(old) => {
                for table in &mut self.tables {
                    table.remove(id, old.vector.as_slice());
                }
                old.seq
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                seq
            }
        };

        for table in &mut self.tables {
            table.insert(id, normalized.as_slice());
        }
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

    /// Removes `id` from every table's bucket and from storage. Empty buckets
    /// are deleted. Idempotent.
    pub fn remove(&mut self, id: ChunkId) -> bool {
        let Some(entry) = self.entries.remove(&id) else {
            return false;
        };
        for table in &mut self.tables {
            table.remove(id, entry.vector.as_slice());
        }
        true
    }

    /// Returns the stored (normalized) vector for `id`, if present.
    pub fn get(&self, id: ChunkId) -> Option<&Vector> {
        self.entries.get(&id).map(|e| &e.vector)
    }

    /// Approximate top-k search: bucket-candidate union, then exact cosine
    /// re-rank. Degrades to a full scan when the union is empty, so a
    /// pathological query still returns results.
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

        let mut candidates: HashSet<ChunkId> = HashSet::new();
        for table in &self.tables {
            if let Some(bucket) = table.buckets.get(&table.signature(q)) {
                candidates.extend(bucket.iter().copied());
            }
        }

        let scored: Vec<_> = if candidates.is_empty() {
            self.entries
                .iter()
                .map(|(&id, entry)| (id, dot_product(q, entry.vector.as_slice()), entry.seq))
                .collect()
        } else {
            candidates
                .into_iter()
                .filter_map(|id| {
                    self.entries
                        .get(&id)
                        .map(|entry| (id, dot_product(q, entry.vector.as_slice()), entry.seq))
                })
                .collect()
        };

        Ok(rank_hits(scored, k))
    }

    /// LSH builds incrementally; marks the instance as built.
    pub fn build(&mut self) {
        self.built = true;
    }

    /// Current statistics, including bucket occupancy.
    pub fn stats(&self) -> IndexStats {
        let total_buckets: usize = self.tables.iter().map(|t| t.buckets.len()).sum();
        let total_members: usize = self
            .tables
            .iter()
            .flat_map(|t| t.buckets.values())
            .map(Vec::len)
            .sum();
        let avg_bucket_len = if total_buckets == 0 {
            0.0
        } else {
            total_members as f32 / total_buckets as f32
        };

        IndexStats {
            algorithm: AlgorithmTag::Lsh,
            dimension: self.dimension,
            size: self.len(),
            built: self.built,
            detail: StatsDetail::Lsh {
                tables: self.config.tables,
                hash_bits: self.config.hash_bits,
                total_buckets,
                avg_bucket_len,
            },
        }
    }

    /// Checks that every stored id sits in the bucket its recomputed
    /// signature selects, in every table. Test support.
    #[cfg(test)]
    fn buckets_consistent(&self) -> bool {
        self.entries.iter().all(|(id, entry)| {
            self.tables.iter().all(|table| {
                table
                    .buckets
                    .get(&table.signature(entry.vector.as_slice()))
                    .is_some_and(|bucket| bucket.contains(id))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn small_index() -> LshIndex {
        LshIndex::new(
            4,
            LshConfig {
                tables: 4,
                hash_bits: 6,
                seed: 42,
            },
        )
    }

    #[test]
    fn test_hyperplanes_unit_norm() {
        let index = small_index();
        for table in &index.tables {
            for hyperplane in &table.hyperplanes {
                assert!((crate::distance::l2_norm(hyperplane) - 1.0).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_hyperplanes_deterministic_per_seed() {
        let a = small_index();
        let b = small_index();
        for (ta, tb) in a.tables.iter().zip(b.tables.iter()) {
            assert_eq!(ta.hyperplanes, tb.hyperplanes);
        }
        // Different table seeds produce different projections.
        assert_ne!(a.tables[0].hyperplanes, a.tables[1].hyperplanes);
    }

    #[test]
    fn test_hash_bits_clamped_to_64() {
        let index = LshIndex::new(
            4,
            LshConfig {
                tables: 1,
                hash_bits: 128,
                seed: 1,
            },
        );
        assert_eq!(index.tables[0].hyperplanes.len(), 64);
    }

    #[test]
    fn test_add_and_search_exact_match() {
        let mut index = small_index();
        let id = Uuid::new_v4();
        index.add(id, &[1.0, 0.0, 0.0, 0.0], Metadata::new()).unwrap();
        index
            .add(Uuid::new_v4(), &[0.0, 1.0, 0.0, 0.0], Metadata::new())
            .unwrap();

        let hits = index.search(&[1.0, 0.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].chunk_id, id);
        assert!((hits[0].similarity - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = small_index();
        assert!(matches!(
            index.add(Uuid::new_v4(), &[1.0], Metadata::new()),
            Err(Error::DimensionMismatch { .. })
        ));
        assert!(matches!(
            index.search(&[1.0], 3),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_overwrite_rehashes_and_keeps_size() {
        let mut index = small_index();
        let id = Uuid::new_v4();
        index.add(id, &[1.0, 0.0, 0.0, 0.0], Metadata::new()).unwrap();
        index.add(id, &[-1.0, 0.0, 0.0, 0.0], Metadata::new()).unwrap();

        assert_eq!(index.len(), 1);
        assert!(index.buckets_consistent());

        // Old signature's bucket no longer lists the id anywhere.
        let total_members: usize = index
            .tables
            .iter()
            .flat_map(|t| t.buckets.values())
            .map(Vec::len)
            .sum();
        assert_eq!(total_members, index.tables.len());
    }

    #[test]
    fn test_remove_cleans_buckets() {
        let mut index = small_index();
        let id = Uuid::new_v4();
        index.add(id, &[0.5, 0.5, 0.0, 0.0], Metadata::new()).unwrap();
        assert!(index.remove(id));
        assert!(!index.remove(id));
        assert_eq!(index.len(), 0);
        for table in &index.tables {
            assert!(table.buckets.is_empty());
        }
    }

    #[test]
    fn test_search_empty_index() {
        let index = small_index();
        assert!(index.search(&[1.0, 0.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_fallback_scans_everything() {
        // A single-table index with many bits makes an empty candidate union
        // likely for a far-away query; the fallback must still return results.
        let mut index = LshIndex::new(
            4,
            LshConfig {
                tables: 1,
                hash_bits: 4,
                seed: 7,
            },
        );
        for _ in 0..5 {
            index
                .add(Uuid::new_v4(), &[1.0, 0.2, 0.1, 0.0], Metadata::new())
                .unwrap();
        }
        // Whether or not the union is empty, k results come back.
        let hits = index.search(&[-1.0, -0.2, -0.1, 0.0], 3).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_determinism_across_instances() {
        let mut a = small_index();
        let mut b = small_index();
        let ids: Vec<_> = (0..20).map(|_| Uuid::new_v4()).collect();
        for (i, &id) in ids.iter().enumerate() {
            let v = [i as f32 * 0.3, 1.0, (i % 3) as f32, 0.5];
            a.add(id, &v, Metadata::new()).unwrap();
            b.add(id, &v, Metadata::new()).unwrap();
        }
        let q = [0.4, 0.9, 1.1, 0.2];
        assert_eq!(a.search(&q, 5).unwrap(), b.search(&q, 5).unwrap());
        assert_eq!(a.stats(), b.stats());
    }

    proptest! {
        #[test]
        fn prop_buckets_stay_consistent(
            vectors in proptest::collection::vec(
                proptest::collection::vec(-1.0f32..1.0f32, 4),
                1..40,
            ),
            removals in proptest::collection::vec(any::<prop::sample::Index>(), 0..10),
        ) {
            let mut index = small_index();
            let ids: Vec<_> = (0..vectors.len()).map(|_| Uuid::new_v4()).collect();
            for (id, v) in ids.iter().zip(vectors.iter()) {
                index.add(*id, v, Metadata::new()).unwrap();
            }
            for removal in removals {
                index.remove(*removal.get(&ids));
            }
            prop_assert!(index.buckets_consistent());
        }
    }
}
