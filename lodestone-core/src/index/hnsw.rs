//! HNSW (Hierarchical Navigable Small World) graph index.
//!
//! A multi-layer proximity graph: layer 0 holds every vector, higher layers
//! hold exponentially fewer, like a skip list. Search greedily descends from
//! the entry point through the sparse layers, then expands a candidate pool
//! at layer 0 and re-ranks it exactly.
//!
//! Construction here is the simplified variant: each insert ranks all
//! level-eligible nodes by similarity and connects to the best, which is
//! O(N*d) per level in the worst case. That trade is deliberate for the
//! target scale; the graph it produces keeps every edge bidirectional and
//! bounded by the per-level neighbour caps. Search expands layer 0
//! breadth-first into a pool of `3k` distinct nodes before the exact
//! re-rank.
//!
//! # References
//!
//! - Malkov & Yashunin (2018): "Efficient and robust approximate nearest
//!   neighbor search using HNSW graphs"

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::distance::dot_product;
use crate::error::{Error, Result};
use crate::index::{rank_hits, AlgorithmTag, IndexStats, SearchHit, StatsDetail};
use crate::metadata::Metadata;
use crate::vector::{ChunkId, Vector};

/// Seed for the per-instance level PRNG. Two processes replaying the same
/// insert sequence must draw the same levels and build identical graphs.
const LEVEL_SEED: u64 = 0x1005_7013;

/// Configuration for the HNSW index.
#[derive(Debug, Clone)]
pub struct HnswConfig {
    /// Soft neighbour cap at layers above 0. Higher = better recall, more
    /// memory. Typical: 16-64.
    pub m: usize,
    /// Soft neighbour cap at layer 0 (usually 2*M).
    pub m0: usize,
    /// Highest layer a node can be assigned.
    pub max_level: usize,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: 16,
            m0: 32,
            max_level: 8,
        }
    }
}

impl HnswConfig {
    /// Creates a config with the given M and the conventional `m0 = 2 * m`.
    pub fn with_m(m: usize) -> Self {
        Self {
            m,
            m0: m * 2,
            ..Default::default()
        }
    }
}

/// A node in the graph arena.
#[derive(Debug, Clone)]
struct HnswNode {
    id: ChunkId,
    vector: Vector,
    #[allow(dead_code)]
    metadata: Metadata,
    /// Highest layer this node appears in.
    level: usize,
    /// Neighbour slots per layer; `neighbors[l]` exists for `l <= level`.
    /// Ordered sets keep traversal deterministic across processes.
    neighbors: Vec<BTreeSet<usize>>,
    /// Position in the insert sequence; stable across overwrites.
    seq: u64,
}

impl HnswNode {
    fn new(id: ChunkId, vector: Vector, metadata: Metadata, level: usize, seq: u64) -> Self {
        Self {
            id,
            vector,
            metadata,
            level,
            neighbors: vec![BTreeSet::new(); level + 1],
            seq,
        }
    }
}

/// HNSW index over an arena of graph nodes.
///
/// Nodes live in dense slots; `ChunkId -> slot` is a separate map, and
/// neighbour sets hold slot indices. This keeps the bidirectional-edge
/// invariant a matter of two set operations per edge.
///
/// # Example
///
/// ```
/// use lodestone_core::{HnswConfig, HnswIndex, Metadata};
/// use uuid::Uuid;
///
/// let mut index = HnswIndex::new(4, HnswConfig::default());
/// let id = Uuid::new_v4();
/// index.add(id, &[1.0, 0.0, 0.0, 0.0], Metadata::new()).unwrap();
///
/// let hits = index.search(&[1.0, 0.0, 0.0, 0.0], 3).unwrap();
/// assert_eq!(hits[0].chunk_id, id);
/// ```
#[derive(Debug)]
pub struct HnswIndex {
    dimension: usize,
    config: HnswConfig,
    nodes: Vec<Option<HnswNode>>,
    free_slots: Vec<usize>,
    slots: HashMap<ChunkId, usize>,
    /// Slot of the node holding the maximum level; `None` iff empty.
    entry_point: Option<usize>,
    rng: StdRng,
    next_seq: u64,
    built: bool,
}

impl HnswIndex {
    /// Creates an empty index for vectors of the given dimension.
    pub fn new(dimension: usize, config: HnswConfig) -> Self {
        Self {
            dimension,
            config,
            nodes: Vec::new(),
            free_slots: Vec::new(),
            slots: HashMap::new(),
            entry_point: None,
            rng: StdRng::seed_from_u64(LEVEL_SEED),
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
        self.slots.len()
    }

    /// Returns true if the index contains no vectors.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn node(&self, slot: usize) -> &HnswNode {
        self.nodes[slot].as_ref().expect("live graph slot")
    }

    fn node_mut(&mut self, slot: usize) -> &mut HnswNode {
        self.nodes[slot].as_mut().expect("live graph slot")
    }

    /// Draws a level by flipping a fair coin until failure or the cap.
    fn draw_level(&mut self) -> usize {
        let mut level = 0;
        while level < self.config.max_level && self.rng.gen::<f64>() < 0.5 {
            level += 1;
        }
        level
    }

    fn cap_at(&self, level: usize) -> usize {
        if level == 0 {
            self.config.m0
        } else {
            self.config.m
        }
    }

    /// Stores the normalized form of `vector` under `id` and wires it into
    /// the graph. Re-inserting an existing id detaches the old node first and
    /// keeps its slot and insert-sequence position; `len` does not change.
    pub fn add(&mut self, id: ChunkId, vector: &[f32], metadata: Metadata) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }

        let normalized = Vector::new(vector).normalized();
        let level = self.draw_level();

        let (slot, seq) = match self.slots.get(&id).copied() {
            Some(slot) => {
                let seq = self.node(slot).seq;
                self.detach(slot);
                (slot, seq)
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                let slot = match self.free_slots.pop() {
                    Some(slot) => slot,
                    None => {
                        self.nodes.push(None);
                        self.nodes.len() - 1
                    }
                };
                self.slots.insert(id, slot);
                (slot, seq)
            }
        };

        self.nodes[slot] = Some(HnswNode::new(id, normalized, metadata, level, seq));

        if self.slots.len() == 1 {
            self.entry_point = Some(slot);
            return Ok(());
        }

        self.connect(slot, level);

        match self.entry_point {
            Some(entry) if entry != slot => {
                if level > self.node(entry).level {
                    self.entry_point = Some(slot);
                }
            }
            // Overwrote the entry node; its level was redrawn and may no
            // longer be the maximum.
            _ => self.entry_point = self.max_level_slot(),
        }

        Ok(())
    }

    /// Slot of the live node with the highest level (lowest insert sequence
    /// on ties), or `None` when empty.
    fn max_level_slot(&self) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| entry.as_ref().map(|n| (i, n.level, n.seq)))
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.2.cmp(&a.2)))
            .map(|(i, _, _)| i)
    }

    /// Wires `slot` into each layer up to its level: rank every node
    /// participating at the layer by similarity, connect to the best `cap`,
    /// and prune any neighbour the new edges pushed over its own cap.
    fn connect(&mut self, slot: usize, level: usize) {
        for layer in 0..=level {
            let cap = self.cap_at(layer);

            let query = self.node(slot).vector.clone();
            let mut candidates: Vec<(usize, f32, u64)> = self
                .nodes
                .iter()
                .enumerate()
                .filter_map(|(other, entry)| {
                    let node = entry.as_ref()?;
                    if other == slot || node.level < layer {
                        return None;
                    }
                    let sim = dot_product(query.as_slice(), node.vector.as_slice());
                    Some((other, sim, node.seq))
                })
                .collect();
            candidates.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.2.cmp(&b.2))
            });
            candidates.truncate(cap);

            for (neighbor, _, _) in candidates {
                self.node_mut(slot).neighbors[layer].insert(neighbor);
                self.node_mut(neighbor).neighbors[layer].insert(slot);

                if self.node(neighbor).neighbors[layer].len() > cap {
                    self.prune_worst(neighbor, layer);
                }
            }
        }
    }

    /// Removes the least-similar neighbour of `slot` at `layer`,
    /// bidirectionally.
    fn prune_worst(&mut self, slot: usize, layer: usize) {
        let anchor = self.node(slot).vector.clone();
        let mut worst: Option<(usize, f32)> = None;
        for &neighbor in &self.node(slot).neighbors[layer] {
            let sim = dot_product(anchor.as_slice(), self.node(neighbor).vector.as_slice());
            match worst {
                Some((_, worst_sim)) if sim >= worst_sim => {}
                _ => worst = Some((neighbor, sim)),
            }
        }
        if let Some((worst_slot, _)) = worst {
            self.node_mut(slot).neighbors[layer].remove(&worst_slot);
            self.node_mut(worst_slot).neighbors[layer].remove(&slot);
        }
    }

    /// Deletes every edge touching `slot` and clears its own sets.
    fn detach(&mut self, slot: usize) {
        let adjacency: Vec<(usize, Vec<usize>)> = self
            .node(slot)
            .neighbors
            .iter()
            .enumerate()
            .map(|(layer, set)| (layer, set.iter().copied().collect()))
            .collect();
        for (layer, neighbors) in adjacency {
            for neighbor in neighbors {
                self.node_mut(neighbor).neighbors[layer].remove(&slot);
            }
        }
        for set in &mut self.node_mut(slot).neighbors {
            set.clear();
        }
    }

    /// Removes `id` from the graph; returns whether it was present.
    /// Idempotent. The entry point, if removed, moves to the remaining node
    /// with the highest level.
    pub fn remove(&mut self, id: ChunkId) -> bool {
        let Some(slot) = self.slots.remove(&id) else {
            return false;
        };
        self.detach(slot);
        self.nodes[slot] = None;
        self.free_slots.push(slot);

        if self.entry_point == Some(slot) {
            self.entry_point = self.max_level_slot();
        }
        true
    }

    /// Returns the stored (normalized) vector for `id`, if present.
    pub fn get(&self, id: ChunkId) -> Option<&Vector> {
        self.slots.get(&id).map(|&slot| &self.node(slot).vector)
    }

    /// Approximate top-k search: greedy descent through the upper layers,
    /// breadth-first expansion into a `3k`-node pool at layer 0, exact
    /// re-rank.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }
        let Some(entry) = self.entry_point else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let normalized_query = Vector::new(query).normalized();
        let q = normalized_query.as_slice();

        let mut current = entry;
        for layer in (1..=self.node(entry).level).rev() {
            current = self.greedy_descend(q, current, layer);
        }

        let pool = self.collect_pool(current, k.saturating_mul(3));
        let scored: Vec<_> = pool
            .into_iter()
            .map(|slot| {
                let node = self.node(slot);
                (node.id, dot_product(q, node.vector.as_slice()), node.seq)
            })
            .collect();

        Ok(rank_hits(scored, k))
    }

    /// Moves to the best strictly-improving neighbour at `layer` until no
    /// neighbour improves.
    fn greedy_descend(&self, query: &[f32], start: usize, layer: usize) -> usize {
        let mut current = start;
        let mut current_sim = dot_product(query, self.node(current).vector.as_slice());
        loop {
            let mut best: Option<(usize, f32)> = None;
            if let Some(neighbors) = self.node(current).neighbors.get(layer) {
                for &neighbor in neighbors {
                    let sim = dot_product(query, self.node(neighbor).vector.as_slice());
                    if sim > best.map_or(current_sim, |(_, s)| s) {
                        best = Some((neighbor, sim));
                    }
                }
            }
            match best {
                Some((next, sim)) => {
                    current = next;
                    current_sim = sim;
                }
                None => return current,
            }
        }
    }

    /// Breadth-first expansion at layer 0 from `start`, collecting up to
    /// `target` distinct slots (or the whole reachable component). Ordered
    /// neighbour sets keep the visit order deterministic.
    fn collect_pool(&self, start: usize, target: usize) -> Vec<usize> {
        let mut visited: HashSet<usize> = HashSet::new();
        let mut pool = Vec::new();
        let mut queue = VecDeque::from([start]);

        while let Some(slot) = queue.pop_front() {
            if pool.len() >= target {
                break;
            }
            if !visited.insert(slot) {
                continue;
            }
            pool.push(slot);
            for &neighbor in &self.node(slot).neighbors[0] {
                if !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        pool
    }

    /// HNSW builds incrementally; marks the instance as built.
    pub fn build(&mut self) {
        self.built = true;
    }

    /// Current statistics, including graph shape counters.
    pub fn stats(&self) -> IndexStats {
        let live = || self.nodes.iter().filter_map(Option::as_ref);
        let max_level = live().map(|n| n.level).max().unwrap_or(0);
        let total_edges: usize = live()
            .map(|n| n.neighbors.iter().map(BTreeSet::len).sum::<usize>())
            .sum();
        let avg_neighbors = if self.slots.is_empty() {
            0.0
        } else {
            total_edges as f32 / self.slots.len() as f32
        };

        IndexStats {
            algorithm: AlgorithmTag::Hnsw,
            dimension: self.dimension,
            size: self.len(),
            built: self.built,
            detail: StatsDetail::Hnsw {
                max_level,
                has_entry_point: self.entry_point.is_some(),
                avg_neighbors,
            },
        }
    }

    /// Checks the graph invariants: every edge bidirectional and within both
    /// endpoints' levels, no self-loops, and a valid entry point. Test
    /// support.
    #[cfg(test)]
    fn graph_consistent(&self) -> bool {
        let live: Vec<usize> = (0..self.nodes.len())
            .filter(|&i| self.nodes[i].is_some())
            .collect();

        for &u in &live {
            let node = self.node(u);
            for (layer, neighbors) in node.neighbors.iter().enumerate() {
                for &v in neighbors {
                    if v == u {
                        return false;
                    }
                    let other = match self.nodes.get(v).and_then(Option::as_ref) {
                        Some(other) => other,
                        None => return false,
                    };
                    if other.level < layer || !other.neighbors[layer].contains(&u) {
                        return false;
                    }
                }
            }
        }

        match self.entry_point {
            None => live.is_empty(),
            Some(entry) => {
                let max_level = live.iter().map(|&i| self.node(i).level).max();
                self.nodes.get(entry).is_some_and(|n| n.is_some())
                    && Some(self.node(entry).level) == max_level
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn one_hot(dim: usize, axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[axis] = 1.0;
        v
    }

    fn create_test_index() -> (HnswIndex, Vec<ChunkId>) {
        let mut index = HnswIndex::new(3, HnswConfig::with_m(4));
        let ids: Vec<_> = (0..5).map(|_| Uuid::new_v4()).collect();
        let vectors = [
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 1.0, 0.0],
            [1.0, 0.0, 1.0],
        ];
        for (&id, v) in ids.iter().zip(vectors.iter()) {
            index.add(id, v, Metadata::new()).unwrap();
        }
        (index, ids)
    }

    #[test]
    fn test_new_index() {
        let index = HnswIndex::new(128, HnswConfig::default());
        assert!(index.is_empty());
        assert_eq!(index.dimension(), 128);
        assert!(index.entry_point.is_none());
    }

    #[test]
    fn test_insert_single_becomes_entry_point() {
        let mut index = HnswIndex::new(3, HnswConfig::default());
        index
            .add(Uuid::new_v4(), &[1.0, 2.0, 3.0], Metadata::new())
            .unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.entry_point.is_some());
        assert!(index.graph_consistent());
    }

    #[test]
    fn test_insert_dimension_mismatch() {
        let mut index = HnswIndex::new(3, HnswConfig::default());
        let result = index.add(Uuid::new_v4(), &[1.0, 2.0], Metadata::new());
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
        assert!(index.is_empty());
    }

    #[test]
    fn test_search_empty_index() {
        let index = HnswIndex::new(3, HnswConfig::default());
        assert!(index.search(&[1.0, 0.0, 0.0], 10).unwrap().is_empty());
    }

    #[test]
    fn test_search_exact_match() {
        let (index, ids) = create_test_index();
        let hits = index.search(&[1.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, ids[0]);
        assert!((hits[0].similarity - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_search_results_sorted() {
        let (index, _) = create_test_index();
        let hits = index.search(&[1.0, 0.2, 0.1], 5).unwrap();
        for pair in hits.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }

    #[test]
    fn test_overwrite_replaces_in_place() {
        let mut index = HnswIndex::new(2, HnswConfig::default());
        let id = Uuid::new_v4();
        index.add(id, &[1.0, 0.0], Metadata::new()).unwrap();
        index.add(id, &[0.0, 1.0], Metadata::new()).unwrap();

        assert_eq!(index.len(), 1);
        assert!(index.graph_consistent());
        let hits = index.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].chunk_id, id);
        assert!(hits[0].similarity.abs() < 1e-5);
    }

    #[test]
    fn test_overwrite_keeps_entry_point_invariant() {
        let mut index = HnswIndex::new(2, HnswConfig::with_m(2));
        let ids: Vec<_> = (0..8).map(|_| Uuid::new_v4()).collect();
        for (i, &id) in ids.iter().enumerate() {
            index
                .add(id, &[i as f32, 1.0], Metadata::new())
                .unwrap();
        }
        // Overwrite every node, including whichever holds the entry point.
        for (i, &id) in ids.iter().enumerate() {
            index
                .add(id, &[1.0, i as f32], Metadata::new())
                .unwrap();
            assert!(index.graph_consistent());
        }
        assert_eq!(index.len(), 8);
    }

    #[test]
    fn test_remove_repairs_graph() {
        let (mut index, ids) = create_test_index();
        assert!(index.remove(ids[1]));
        assert_eq!(index.len(), 4);
        assert!(index.graph_consistent());

        let hits = index.search(&[0.0, 1.0, 0.0], 10).unwrap();
        assert!(hits.iter().all(|h| h.chunk_id != ids[1]));

        // Second removal: not found, no mutation.
        assert!(!index.remove(ids[1]));
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_remove_entry_point_resets_to_max_level() {
        let (mut index, ids) = create_test_index();
        for &id in &ids {
            index.remove(id);
            assert!(index.graph_consistent());
        }
        assert!(index.is_empty());
        assert!(index.entry_point.is_none());
    }

    #[test]
    fn test_level_draws_respect_cap() {
        let mut index = HnswIndex::new(2, HnswConfig::default());
        for _ in 0..2000 {
            let level = index.draw_level();
            assert!(level <= index.config.max_level);
        }
    }

    #[test]
    fn test_neighbor_caps_not_grossly_exceeded() {
        let mut index = HnswIndex::new(4, HnswConfig::with_m(2));
        for i in 0..40 {
            let v = [
                (i as f32 * 0.37).sin(),
                (i as f32 * 0.83).cos(),
                1.0,
                i as f32 * 0.01,
            ];
            index.add(Uuid::new_v4(), &v, Metadata::new()).unwrap();
        }
        // One overflow event prunes one edge; sets stay within cap + 1.
        for entry in index.nodes.iter().filter_map(Option::as_ref) {
            for (layer, neighbors) in entry.neighbors.iter().enumerate() {
                assert!(neighbors.len() <= index.cap_at(layer) + 1);
            }
        }
        assert!(index.graph_consistent());
    }

    #[test]
    fn test_one_hot_cluster_agreement() {
        // Nine vectors so a k=3 search pool spans the whole graph.
        let mut index = HnswIndex::new(4, HnswConfig::default());
        let ids: Vec<_> = (0..9).map(|_| Uuid::new_v4()).collect();
        for (i, &id) in ids.iter().enumerate() {
            index.add(id, &one_hot(4, i % 4), Metadata::new()).unwrap();
        }
        let hits = index.search(&one_hot(4, 0), 3).unwrap();
        assert_eq!(hits.len(), 3);
        for hit in hits {
            assert!((hit.similarity - 1.0).abs() < 1e-5);
            let stored = index.get(hit.chunk_id).unwrap();
            assert_eq!(stored.as_slice(), &one_hot(4, 0)[..]);
        }
    }

    #[test]
    fn test_determinism_across_instances() {
        let build = || {
            let mut index = HnswIndex::new(4, HnswConfig::with_m(4));
            for i in 0u64..50 {
                let id = Uuid::from_u64_pair(0, i);
                let v = [
                    (i as f32 * 0.7).sin(),
                    (i as f32 * 0.3).cos(),
                    (i % 5) as f32,
                    1.0,
                ];
                index.add(id, &v, Metadata::new()).unwrap();
            }
            index
        };
        let a = build();
        let b = build();
        let q = [0.1, 0.9, 2.0, 1.0];
        assert_eq!(a.search(&q, 10).unwrap(), b.search(&q, 10).unwrap());
        assert_eq!(a.stats(), b.stats());
    }

    #[test]
    fn test_stats_shape() {
        let (index, _) = create_test_index();
        let stats = index.stats();
        assert_eq!(stats.algorithm, AlgorithmTag::Hnsw);
        assert_eq!(stats.size, 5);
        match stats.detail {
            StatsDetail::Hnsw {
                has_entry_point, ..
            } => assert!(has_entry_point),
            _ => panic!("wrong detail kind"),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_edges_stay_symmetric(
            vectors in proptest::collection::vec(
                proptest::collection::vec(-1.0f32..1.0f32, 4),
                1..30,
            ),
            removals in proptest::collection::vec(any::<prop::sample::Index>(), 0..10),
        ) {
            let mut index = HnswIndex::new(4, HnswConfig::with_m(3));
            let ids: Vec<_> = (0..vectors.len()).map(|_| Uuid::new_v4()).collect();
            for (id, v) in ids.iter().zip(vectors.iter()) {
                index.add(*id, v, Metadata::new()).unwrap();
                prop_assert!(index.graph_consistent());
            }
            for removal in removals {
                index.remove(*removal.get(&ids));
                prop_assert!(index.graph_consistent());
            }
        }
    }
}
