//! Distance kernels: general Euclidean, a loop-unrolled D=13 fast path,
//! and cosine distance over precomputed magnitudes.
//!
//! Grounded on `kannaka-memory::wave::cosine_similarity`'s zero-magnitude
//! handling (generalized here to an epsilon-guarded `1 - cos_sim`
//! distance rather than raw similarity). The unrolled kernel is selected
//! statically by its caller rather than dispatched through a trait
//! object, keeping the DTW inner loop free of indirection.

use crate::matrix::FeatureMatrix;

const COSINE_EPS: f32 = 1e-9;

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Fully unrolled Euclidean distance for 13-dimensional vectors (the
/// width of a default MFCC frame). Caller must ensure both slices have
/// length 13.
#[inline]
fn euclidean_distance_13(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), 13);
    debug_assert_eq!(b.len(), 13);
    let d0 = a[0] - b[0];
    let d1 = a[1] - b[1];
    let d2 = a[2] - b[2];
    let d3 = a[3] - b[3];
    let d4 = a[4] - b[4];
    let d5 = a[5] - b[5];
    let d6 = a[6] - b[6];
    let d7 = a[7] - b[7];
    let d8 = a[8] - b[8];
    let d9 = a[9] - b[9];
    let d10 = a[10] - b[10];
    let d11 = a[11] - b[11];
    let d12 = a[12] - b[12];
    (d0 * d0
        + d1 * d1
        + d2 * d2
        + d3 * d3
        + d4 * d4
        + d5 * d5
        + d6 * d6
        + d7 * d7
        + d8 * d8
        + d9 * d9
        + d10 * d10
        + d11 * d11
        + d12 * d12)
        .sqrt()
}

/// Euclidean cost closure over two feature sequences of matching,
/// arbitrary dimension.
pub fn euclidean_cost<'a>(
    seq1: &'a FeatureMatrix,
    seq2: &'a FeatureMatrix,
) -> impl Fn(usize, usize) -> f32 + 'a {
    move |i, j| euclidean_distance(seq1.row(i), seq2.row(j))
}

/// Euclidean cost closure specialized for 13-dimensional feature vectors.
/// The caller (typically [`crate::dtw::align_mfcc_dtw`]) selects this
/// automatically whenever both sequences have `dim() == 13`.
pub fn euclidean13_cost<'a>(
    seq1: &'a FeatureMatrix,
    seq2: &'a FeatureMatrix,
) -> impl Fn(usize, usize) -> f32 + 'a {
    move |i, j| euclidean_distance_13(seq1.row(i), seq2.row(j))
}

/// Per-row L2 magnitude, precomputed once so the DTW inner loop never
/// recomputes it.
pub fn magnitudes(seq: &FeatureMatrix) -> Vec<f32> {
    seq.rows()
        .iter()
        .map(|r| r.iter().map(|x| x * x).sum::<f32>().sqrt())
        .collect()
}

/// Cosine distance `1 - (a . b) / (|a||b| + eps)` over two sequences with
/// precomputed magnitude arrays. Zero-magnitude vectors fall out to
/// distance `1` (orthogonal) via the epsilon term.
pub fn cosine_cost<'a>(
    seq1: &'a FeatureMatrix,
    seq2: &'a FeatureMatrix,
    mags1: &'a [f32],
    mags2: &'a [f32],
) -> impl Fn(usize, usize) -> f32 + 'a {
    move |i, j| {
        let a = seq1.row(i);
        let b = seq2.row(j);
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        1.0 - dot / (mags1[i] * mags2[j] + COSINE_EPS)
    }
}
