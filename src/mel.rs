//! Mel filterbank design and mel-spectrum projection.
//!
//! Grounded on `kannaka-memory::ear::mel::build_mel_filterbank`, generalized
//! from a dense `Vec<Vec<f32>>` filterbank matrix to a sparse
//! `{start_index, weights}` representation, with the per-filter
//! sum-to-1 renormalization the teacher's version omits.

use crate::error::AlignError;

/// `melFromHz` — Hz to mel (O'Shaughnessy / HTK scale).
pub fn mel_from_hz(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Inverse of [`mel_from_hz`].
pub fn hz_from_mel(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// A single triangular mel filter stored sparsely: `weights[k]` applies to
/// power-spectrum bin `start_index + k`.
#[derive(Debug, Clone)]
pub struct MelFilter {
    pub start_index: usize,
    pub weights: Vec<f32>,
}

/// Build `filterbank_count` triangular filters spanning `[lower_hz, upper_hz]`
/// over a power spectrum of `bin_count` bins whose bin-to-frequency mapping
/// is given by `bin_frequencies_hz` (length `bin_count`).
///
/// Center frequencies are linearly spaced in mel between `lower_hz` and
/// `upper_hz`; each filter's weights rise 0→1 at its center and fall back to
/// 0 at the next filter's center, then are renormalized so the filter's
/// weights sum to 1.
pub fn build_filterbank(
    filterbank_count: usize,
    lower_hz: f32,
    upper_hz: f32,
    bin_frequencies_hz: &[f32],
) -> Result<Vec<MelFilter>, AlignError> {
    if filterbank_count == 0 {
        return Err(AlignError::InvalidArgument(
            "filterbank_count must be > 0".into(),
        ));
    }
    if bin_frequencies_hz.is_empty() {
        return Err(AlignError::InvalidArgument(
            "bin_frequencies_hz must not be empty".into(),
        ));
    }

    let lower_mel = mel_from_hz(lower_hz);
    let upper_mel = mel_from_hz(upper_hz);
    let step = (upper_mel - lower_mel) / (filterbank_count + 1) as f32;

    // filterbank_count + 2 boundary points: left edge, centers, right edge.
    let mel_points: Vec<f32> = (0..filterbank_count + 2)
        .map(|i| lower_mel + step * i as f32)
        .collect();
    let hz_points: Vec<f32> = mel_points.iter().map(|&m| hz_from_mel(m)).collect();

    let n_bins = bin_frequencies_hz.len();
    let mut filters = Vec::with_capacity(filterbank_count);

    for i in 0..filterbank_count {
        let left = hz_points[i];
        let center = hz_points[i + 1];
        let right = hz_points[i + 2];

        let mut start_index = n_bins;
        let mut end_index = 0usize; // exclusive
        let mut dense = Vec::new();

        for (j, &f) in bin_frequencies_hz.iter().enumerate() {
            let w = if f >= left && f <= center && (center - left) > 1e-10 {
                (f - left) / (center - left)
            } else if f > center && f <= right && (right - center) > 1e-10 {
                (right - f) / (right - center)
            } else {
                0.0
            };
            if w > 0.0 {
                if start_index == n_bins {
                    start_index = j;
                }
                end_index = j + 1;
                dense.push(w);
            } else if start_index != n_bins {
                // We've moved past the support; keep a zero placeholder only
                // if we're still inside [start_index, end_index), otherwise stop.
                if j < end_index {
                    dense.push(w);
                }
            }
        }

        if start_index == n_bins {
            // Degenerate filter with empty support (can happen if the
            // spectrum doesn't resolve this band); keep it empty.
            filters.push(MelFilter {
                start_index: 0,
                weights: Vec::new(),
            });
            continue;
        }

        let sum: f32 = dense.iter().sum();
        if sum > 1e-12 {
            for w in &mut dense {
                *w /= sum;
            }
        }

        filters.push(MelFilter {
            start_index,
            weights: dense,
        });
    }

    Ok(filters)
}

/// Power spectrum from interleaved-complex STFT bins: `|bin|^2 = re^2 + im^2`.
pub fn power_spectrum(frame: &[f32]) -> Vec<f32> {
    frame
        .chunks_exact(2)
        .map(|c| c[0] * c[0] + c[1] * c[1])
        .collect()
}

/// Project a power spectrum through the filterbank, producing one mel energy
/// per filter.
pub fn mel_spectrum(power: &[f32], filterbank: &[MelFilter]) -> Vec<f32> {
    filterbank
        .iter()
        .map(|filter| {
            filter
                .weights
                .iter()
                .enumerate()
                .map(|(k, &w)| {
                    let idx = filter.start_index + k;
                    if idx < power.len() {
                        w * power[idx]
                    } else {
                        0.0
                    }
                })
                .sum()
        })
        .collect()
}

/// DCT-II matrix entry `(m, b) = cos(pi * m * (b + 0.5) / mel_band_count)`.
pub fn dct_ii_matrix_entry(m: usize, b: usize, mel_band_count: usize) -> f32 {
    (std::f32::consts::PI * m as f32 * (b as f32 + 0.5) / mel_band_count as f32).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_bins(n: usize, sample_rate: f32, fft_order: usize) -> Vec<f32> {
        (0..n)
            .map(|i| i as f32 * sample_rate / fft_order as f32)
            .collect()
    }

    #[test]
    fn mel_hz_roundtrip() {
        for hz in [0.0, 100.0, 1000.0, 8000.0] {
            let back = hz_from_mel(mel_from_hz(hz));
            assert!((back - hz).abs() < 1e-2, "hz={hz} back={back}");
        }
    }

    #[test]
    fn filters_sum_to_one() {
        let bins = linear_bins(257, 16000.0, 512);
        let filters = build_filterbank(40, 133.33, 6855.50, &bins).unwrap();
        for (i, f) in filters.iter().enumerate() {
            if f.weights.is_empty() {
                continue;
            }
            let sum: f32 = f.weights.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4, "filter {i} sums to {sum}");
        }
    }

    #[test]
    fn filter_support_covers_band() {
        let bins = linear_bins(257, 16000.0, 512);
        let filters = build_filterbank(40, 133.33, 6855.50, &bins).unwrap();
        let min_bin = filters
            .iter()
            .filter(|f| !f.weights.is_empty())
            .map(|f| f.start_index)
            .min()
            .unwrap();
        let max_bin = filters
            .iter()
            .filter(|f| !f.weights.is_empty())
            .map(|f| f.start_index + f.weights.len())
            .max()
            .unwrap();
        assert!(bins[min_bin] <= 160.0, "lowest bin too high: {}", bins[min_bin]);
        assert!(
            bins[max_bin.min(bins.len() - 1)] >= 6000.0,
            "highest bin too low"
        );
    }

    #[test]
    fn rejects_zero_filterbank_count() {
        let bins = linear_bins(257, 16000.0, 512);
        assert!(build_filterbank(0, 133.33, 6855.50, &bins).is_err());
    }
}
