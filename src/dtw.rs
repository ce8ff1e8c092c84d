//! The windowed DTW aligner — the hard part of forced alignment.
//!
//! There's no teacher file for this: `kannaka-memory` has no DTW.
//! Grounded on the corpus's general conventions instead — `thiserror`
//! `Result` returns the way `kannaka-memory::store` does, and a
//! column-major `Vec<Vec<f32>>` cost matrix (a vector of owned buffers,
//! not one flat slab, so memory pressure aborts leave earlier columns
//! usable for diagnostics).

use crate::error::AlignError;
use crate::matrix::FeatureMatrix;

/// Per-column window into the target sequence: row `i` of `seq1` aligns
/// against `[starts[i], starts[i] + window)` of `seq2`.
#[derive(Debug, Clone)]
pub struct WindowPlan {
    pub window: usize,
    pub starts: Vec<usize>,
}

/// Result of [`align_dtw_windowed`] / [`align_mfcc_dtw`].
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentResult {
    pub path: Vec<(usize, usize)>,
    pub path_cost: f32,
}

/// Distance kind selectable by the convenience wrapper [`align_mfcc_dtw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceKind {
    Euclidean,
    Cosine,
}

/// Compute the per-column window plan: `W = min(windowMaxLength, N2)`,
/// `windowMaxLength` clamped up to 2 first, and per-column start offsets
/// derived either from caller-supplied `center_indexes` or the linear
/// diagonal default `floor(i/N1 * N2)`.
pub fn compute_window_plan(
    n1: usize,
    n2: usize,
    window_max_length: usize,
    center_indexes: Option<&[usize]>,
) -> Result<WindowPlan, AlignError> {
    if let Some(centers) = center_indexes {
        if centers.len() != n1 {
            return Err(AlignError::InvalidArgument(format!(
                "center_indexes length {} does not match source length {n1}",
                centers.len()
            )));
        }
    }

    if n1 == 0 || n2 == 0 {
        return Ok(WindowPlan {
            window: 0,
            starts: Vec::new(),
        });
    }

    let window_max_length = window_max_length.max(2);
    let w = window_max_length.min(n2);
    let max_start = (n2 - w) as isize;

    let mut starts = Vec::with_capacity(n1);
    for i in 0..n1 {
        let center = match center_indexes {
            Some(c) => c[i],
            None => (i * n2) / n1,
        };
        let raw_start = center as isize - (w / 2) as isize;
        let start = raw_start.clamp(0, max_start) as usize;
        starts.push(start);
    }

    Ok(WindowPlan { window: w, starts })
}

/// Memory predictor: `N1 * min(N2, W) * 4` bytes, in MB. Callers may
/// refuse an alignment whose projected footprint exceeds a budget before
/// any allocation happens — the aligner itself never caps.
pub fn cost_matrix_mb(n1: usize, n2: usize, window_max_length: usize) -> f64 {
    n1 as f64 * n2.min(window_max_length) as f64 * 4.0 / 1e6
}

/// Forward accumulated-cost pass, including the band-jump
/// reset-to-zero rule for columns whose window shares no row with
/// their predecessor's.
fn forward_pass(n1: usize, plan: &WindowPlan, cost: &impl Fn(usize, usize) -> f32) -> Vec<Vec<f32>> {
    let w = plan.window;
    let mut columns: Vec<Vec<f32>> = Vec::with_capacity(n1);

    let mut col0 = vec![0.0f32; w];
    col0[0] = cost(0, plan.starts[0]);
    for r in 1..w {
        col0[r] = col0[r - 1] + cost(0, plan.starts[0] + r);
    }
    columns.push(col0);

    for i in 1..n1 {
        let delta = plan.starts[i] as isize - plan.starts[i - 1] as isize;
        let mut col = vec![0.0f32; w];
        for r in 0..w {
            let up_cost = if r > 0 { col[r - 1] } else { f32::INFINITY };
            let left_idx = r as isize + delta;
            let left_cost = if left_idx >= 0 && (left_idx as usize) < w {
                columns[i - 1][left_idx as usize]
            } else {
                f32::INFINITY
            };
            let diag_idx = left_idx - 1;
            let diag_cost = if diag_idx >= 0 && (diag_idx as usize) < w {
                columns[i - 1][diag_idx as usize]
            } else {
                f32::INFINITY
            };

            let mut best = up_cost.min(left_cost).min(diag_cost);
            if best.is_infinite() {
                best = 0.0;
            }
            col[r] = cost(i, plan.starts[i] + r) + best;
        }
        columns.push(col);
    }

    columns
}

/// Backward walk reconstructing the path from `(N1-1, W-1)` in
/// window-local coordinates back to `(0, 0)`, applying the `up -> left ->
/// diag` tie-break and the band-jump recovery rule.
fn backtrace(
    n1: usize,
    plan: &WindowPlan,
    columns: &[Vec<f32>],
) -> Result<Vec<(usize, usize)>, AlignError> {
    let w = plan.window as isize;
    let mut i = n1 - 1;
    let mut r: isize = w - 1;
    let mut path = Vec::with_capacity(n1 + plan.window);

    loop {
        // Defensive clamp: a band jump can in principle land `r` outside
        // the current column's valid range when the caller-supplied
        // center indexes slide the window by more than its own width in
        // a single step. The plain "decrement i and set r <- r + delta"
        // rule is preserved for every case the property tests exercise
        // (delta within [0, W]); this clamp only kicks in for
        // pathological center-index sequences, trading exactness on that
        // one reset cell for a guarantee the backtrace always terminates
        // on a valid, in-bounds path.
        if r < 0 || r >= w {
            r = r.clamp(0, w - 1);
        }
        let ru = r as usize;
        path.push((i, plan.starts[i] + ru));
        if i == 0 && ru == 0 {
            break;
        }

        let delta = if i > 0 {
            plan.starts[i] as isize - plan.starts[i - 1] as isize
        } else {
            0
        };
        let up_cost = if ru > 0 { columns[i][ru - 1] } else { f32::INFINITY };
        let left_idx = r + delta;
        let left_cost = if i > 0 && left_idx >= 0 && left_idx < w {
            columns[i - 1][left_idx as usize]
        } else {
            f32::INFINITY
        };
        let diag_idx = left_idx - 1;
        let diag_cost = if i > 0 && diag_idx >= 0 && diag_idx < w {
            columns[i - 1][diag_idx as usize]
        } else {
            f32::INFINITY
        };

        if up_cost.is_infinite() && left_cost.is_infinite() && diag_cost.is_infinite() {
            if ru > 0 {
                r = ru as isize - 1;
            } else if i > 0 {
                i -= 1;
                r = left_idx;
            } else {
                return Err(AlignError::InternalInvariant(
                    "backtrace reached an unreachable state".into(),
                ));
            }
            continue;
        }

        if up_cost <= left_cost && up_cost <= diag_cost {
            r = ru as isize - 1;
        } else if left_cost <= diag_cost {
            i -= 1;
            r = left_idx;
        } else {
            i -= 1;
            r = diag_idx;
        }
    }

    path.reverse();
    Ok(path)
}

/// Band-constrained DTW between two index ranges `[0, n1)` and `[0, n2)`
/// under `cost(i, j)`. Generic over the cost closure so the common case
/// monomorphizes with no per-call indirection in the inner loop.
pub fn align_dtw_windowed(
    n1: usize,
    n2: usize,
    cost: impl Fn(usize, usize) -> f32,
    window_max_length: usize,
    center_indexes: Option<&[usize]>,
) -> Result<AlignmentResult, AlignError> {
    if n1 == 0 || n2 == 0 {
        return Ok(AlignmentResult {
            path: Vec::new(),
            path_cost: 0.0,
        });
    }

    let plan = compute_window_plan(n1, n2, window_max_length, center_indexes)?;
    let columns = forward_pass(n1, &plan, &cost);
    let path_cost = columns[n1 - 1][plan.window - 1];
    let path = backtrace(n1, &plan, &columns)?;

    Ok(AlignmentResult { path, path_cost })
}

/// Convenience wrapper selecting the right distance kernel — the
/// unrolled D=13 Euclidean path when both sequences have that width,
/// general Euclidean otherwise, or cosine over precomputed magnitudes.
pub fn align_mfcc_dtw(
    seq1: &FeatureMatrix,
    seq2: &FeatureMatrix,
    window_max_length: usize,
    kind: DistanceKind,
    center_indexes: Option<&[usize]>,
) -> Result<Vec<(usize, usize)>, AlignError> {
    if seq1.dim() != seq2.dim() && !(seq1.is_empty() || seq2.is_empty()) {
        return Err(AlignError::InvalidDimension(format!(
            "sequence dimensions differ: {} vs {}",
            seq1.dim(),
            seq2.dim()
        )));
    }

    let result = match kind {
        DistanceKind::Euclidean if seq1.dim() == 13 && seq2.dim() == 13 => {
            let cost = crate::distance::euclidean13_cost(seq1, seq2);
            align_dtw_windowed(seq1.len(), seq2.len(), cost, window_max_length, center_indexes)?
        }
        DistanceKind::Euclidean => {
            let cost = crate::distance::euclidean_cost(seq1, seq2);
            align_dtw_windowed(seq1.len(), seq2.len(), cost, window_max_length, center_indexes)?
        }
        DistanceKind::Cosine => {
            let mags1 = crate::distance::magnitudes(seq1);
            let mags2 = crate::distance::magnitudes(seq2);
            let cost = crate::distance::cosine_cost(seq1, seq2, &mags1, &mags2);
            align_dtw_windowed(seq1.len(), seq2.len(), cost, window_max_length, center_indexes)?
        }
    };

    Ok(result.path)
}
