//! Integration tests covering the MFCC feature pipeline end to end,
//! including aligning identical features produced from the same tone
//! twice.

use std::f32::consts::PI;

use align_core::{align_dtw_windowed, compute_mfccs, euclidean_cost, MfccOptions, RubatoResampler};

fn sine(freq: f32, n: usize, sample_rate: f32) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / sample_rate).sin())
        .collect()
}

#[test]
fn identity_mfcc_alignment() {
    let resampler = RubatoResampler::new();
    let options = MfccOptions::default();
    let tone = sine(440.0, 16_000, 16_000.0);

    let mfcc1 = compute_mfccs(&tone, 16_000, &resampler, &options).unwrap();
    let mfcc2 = compute_mfccs(&tone, 16_000, &resampler, &options).unwrap();
    assert_eq!(mfcc1.len(), mfcc2.len());

    let cost = euclidean_cost(&mfcc1, &mfcc2);
    let result = align_dtw_windowed(mfcc1.len(), mfcc2.len(), cost, 5, None).unwrap();

    for (k, &(i, j)) in result.path.iter().enumerate() {
        assert_eq!(i, k);
        assert_eq!(j, k);
    }
    assert!(result.path_cost < 1e-3);
}

#[test]
fn resampling_from_a_foreign_rate_still_produces_aligned_features() {
    let resampler = RubatoResampler::new();
    let options = MfccOptions::default();
    let tone_44k = sine(440.0, 44_100, 44_100.0);
    let tone_16k = sine(440.0, 16_000, 16_000.0);

    let mfcc_a = compute_mfccs(&tone_44k, 44_100, &resampler, &options).unwrap();
    let mfcc_b = compute_mfccs(&tone_16k, 16_000, &resampler, &options).unwrap();

    assert!(!mfcc_a.is_empty());
    assert!(!mfcc_b.is_empty());
    assert_eq!(mfcc_a.dim(), mfcc_b.dim());
}

#[test]
fn normalization_centers_every_coefficient_column() {
    let resampler = RubatoResampler::new();
    let mut options = MfccOptions::default();
    options.normalize = true;
    let tone = sine(523.25, 16_000, 16_000.0);
    let mfcc = compute_mfccs(&tone, 16_000, &resampler, &options).unwrap();

    let means = mfcc.column_means();
    for m in means {
        assert!(m.abs() < 1e-3, "column mean not centered: {m}");
    }
}
