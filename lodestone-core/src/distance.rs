//! Distance kernels for cosine similarity search.
//!
//! All indexes store L2-normalized vectors, so cosine similarity reduces to a
//! dot product and a comparison costs `d` multiply-adds. The kernels here are
//! also usable on raw (unnormalized) input; `cosine_similarity` divides by
//! the norms and returns 0.0 whenever either norm vanishes.

/// Computes the dot product (inner product) of two vectors.
///
/// Formula: sum(a[i] * b[i])
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vector dimensions must match");
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Computes the L2 (Euclidean) norm of a vector.
#[inline]
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Computes cosine similarity between two vectors.
///
/// Formula: (a · b) / (||a|| * ||b||)
/// Range: [-1, 1] where 1 = identical direction, -1 = opposite direction.
/// Returns 0.0 when either vector has zero norm.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let denominator = l2_norm(a) * l2_norm(b);
    if denominator == 0.0 {
        return 0.0;
    }
    dot_product(a, b) / denominator
}

/// Returns an L2-normalized copy of `v`.
///
/// A zero vector is copied as-is; this function never produces NaN.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = l2_norm(v);
    if norm == 0.0 {
        v.to_vec()
    } else {
        v.iter().map(|x| x / norm).collect()
    }
}
