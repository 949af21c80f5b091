//! Ground-truth recall bounds for the approximate indexes.
//!
//! Brute force is exact; HNSW and LSH must keep a minimum overlap with its
//! top-k. The corpora mimic real embedding workloads: most chunks are
//! unrelated background, and each query has a pocket of near-duplicate
//! chunks that form its true neighbourhood. Everything is seeded so a
//! failure is reproducible, not flaky.

use std::collections::HashSet;

use lodestone_core::distance::normalize;
use lodestone_core::{
    BruteForceIndex, HnswConfig, HnswIndex, LshConfig, LshIndex, Metadata, SearchHit,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

const DIM: usize = 128;
const N: usize = 1000;
const K: usize = 10;
const NUM_QUERIES: usize = 20;
/// Near-duplicates planted per query; their cosine to the query is ~0.95,
/// far above the uniform background, so they are the query's true top-k.
const PLANTED_PER_QUERY: usize = 15;
const PLANTED_NOISE: f32 = 0.33;

fn random_vector(rng: &mut StdRng) -> Vec<f32> {
    (0..DIM).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// Uniform background corpus plus queries drawn the same way.
fn uniform_corpus(seed: u64) -> (Vec<(Uuid, Vec<f32>)>, Vec<Vec<f32>>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let vectors = (0..N)
        .map(|i| (Uuid::from_u64_pair(0, i as u64), random_vector(&mut rng)))
        .collect();
    let queries = (0..NUM_QUERIES).map(|_| random_vector(&mut rng)).collect();
    (vectors, queries)
}

/// Corpus with a planted neighbourhood per query: `PLANTED_PER_QUERY`
/// perturbed copies of each query direction, scattered through a uniform
/// background in shuffled insert order.
fn planted_corpus(seed: u64) -> (Vec<(Uuid, Vec<f32>)>, Vec<Vec<f32>>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let queries: Vec<Vec<f32>> = (0..NUM_QUERIES)
        .map(|_| normalize(&random_vector(&mut rng)))
        .collect();

    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(N);
    for query in &queries {
        for _ in 0..PLANTED_PER_QUERY {
            let noise = normalize(&random_vector(&mut rng));
            let planted: Vec<f32> = query
                .iter()
                .zip(noise.iter())
                .map(|(q, n)| q + PLANTED_NOISE * n)
                .collect();
            vectors.push(planted);
        }
    }
    while vectors.len() < N {
        vectors.push(random_vector(&mut rng));
    }
    vectors.shuffle(&mut rng);

    let vectors = vectors
        .into_iter()
        .enumerate()
        .map(|(i, v)| (Uuid::from_u64_pair(0, i as u64), v))
        .collect();
    (vectors, queries)
}

fn id_set(hits: &[SearchHit]) -> HashSet<Uuid> {
    hits.iter().map(|h| h.chunk_id).collect()
}

fn mean_overlap(approx: &[HashSet<Uuid>], exact: &[HashSet<Uuid>]) -> f64 {
    approx
        .iter()
        .zip(exact.iter())
        .map(|(a, b)| a.intersection(b).count() as f64 / K as f64)
        .sum::<f64>()
        / approx.len() as f64
}

#[test]
fn hnsw_recall_against_brute_force() {
    let (vectors, queries) = planted_corpus(7);

    let mut exact = BruteForceIndex::new(DIM);
    let mut hnsw = HnswIndex::new(DIM, HnswConfig::default());
    for (id, v) in &vectors {
        exact.add(*id, v, Metadata::new()).unwrap();
        hnsw.add(*id, v, Metadata::new()).unwrap();
    }

    let ground_truth: Vec<_> = queries
        .iter()
        .map(|q| id_set(&exact.search(q, K).unwrap()))
        .collect();
    let approx: Vec<_> = queries
        .iter()
        .map(|q| id_set(&hnsw.search(q, K).unwrap()))
        .collect();

    let recall = mean_overlap(&approx, &ground_truth);
    assert!(
        recall >= 0.8,
        "HNSW recall {recall:.3} below the 0.8 acceptance bound"
    );
}

#[test]
fn lsh_recall_against_brute_force() {
    let (vectors, queries) = planted_corpus(11);

    let mut exact = BruteForceIndex::new(DIM);
    let mut lsh = LshIndex::new(DIM, LshConfig::default());
    for (id, v) in &vectors {
        exact.add(*id, v, Metadata::new()).unwrap();
        lsh.add(*id, v, Metadata::new()).unwrap();
    }

    let ground_truth: Vec<_> = queries
        .iter()
        .map(|q| id_set(&exact.search(q, K).unwrap()))
        .collect();
    let approx: Vec<_> = queries
        .iter()
        .map(|q| id_set(&lsh.search(q, K).unwrap()))
        .collect();

    let recall = mean_overlap(&approx, &ground_truth);
    assert!(
        recall >= 0.7,
        "LSH recall {recall:.3} below the 0.7 acceptance bound"
    );
}

#[test]
fn brute_force_is_its_own_ground_truth() {
    let (vectors, queries) = uniform_corpus(13);

    let mut exact = BruteForceIndex::new(DIM);
    for (id, v) in &vectors {
        exact.add(*id, v, Metadata::new()).unwrap();
    }

    for q in &queries {
        let hits = exact.search(q, K).unwrap();
        assert_eq!(hits.len(), K);
        for pair in hits.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }
}
