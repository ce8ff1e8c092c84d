//! The MFCC feature pipeline: pre-emphasis → resample → STFT → Mel →
//! log-power → DCT-II → optional liftering / normalization.
//!
//! Grounded on `kannaka-memory::ear::features::{extract_features,
//! compute_mfcc_mean}`, generalized from a fixed 13-coefficient
//! mean-across-frames summary into a full per-frame feature sequence,
//! with the orthonormal DCT scaling, liftering, and normalization the
//! teacher's summary statistic never needed.

use crate::error::AlignError;
use crate::matrix::FeatureMatrix;
use crate::mel::{build_filterbank, dct_ii_matrix_entry, mel_spectrum, power_spectrum, MelFilter};
use crate::resample::Resampler;
use crate::stft::{stftr, WindowKind};

/// Options controlling the MFCC pipeline. Defaults match the parameters
/// used for forced alignment: 40 mel filters, 13 cepstral coefficients,
/// a 512-point FFT, a 133.33-6855.50 Hz band, 25 ms windows at a 10 ms
/// hop, 16 kHz analysis rate, and pre-emphasis with alpha 0.97.
#[derive(Debug, Clone)]
pub struct MfccOptions {
    pub filterbank_count: usize,
    pub feature_count: usize,
    pub fft_order: usize,
    pub lower_freq: f32,
    pub upper_freq: f32,
    pub window_duration_secs: f32,
    pub hop_duration_secs: f32,
    pub analysis_sample_rate: u32,
    pub window_kind: WindowKind,
    /// `Some(alpha)` applies pre-emphasis with that coefficient; `None`
    /// skips it.
    pub pre_emphasis: Option<f32>,
    pub normalize: bool,
    /// Liftering factor `L`; `0` skips liftering.
    pub lifter: usize,
    pub zero_first_coefficient: bool,
}

impl Default for MfccOptions {
    fn default() -> Self {
        Self {
            filterbank_count: 40,
            feature_count: 13,
            fft_order: 512,
            lower_freq: 133.33,
            upper_freq: 6855.50,
            window_duration_secs: 0.025,
            hop_duration_secs: 0.010,
            analysis_sample_rate: 16_000,
            window_kind: WindowKind::Hann,
            pre_emphasis: Some(0.97),
            normalize: false,
            lifter: 0,
            zero_first_coefficient: false,
        }
    }
}

/// `y[0] = x[0] - alpha*initial`, `y[i] = x[i] - alpha*x[i-1]`.
pub fn pre_emphasize(samples: &[f32], alpha: f32, initial: f32) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(samples.len());
    out.push(samples[0] - alpha * initial);
    for i in 1..samples.len() {
        out.push(samples[i] - alpha * samples[i - 1]);
    }
    out
}

/// Inverse of [`pre_emphasize`]: `x[0] = y[0] + alpha*initial`,
/// `x[i] = y[i] + alpha*x[i-1]`.
pub fn de_emphasize(emph: &[f32], alpha: f32, initial: f32) -> Vec<f32> {
    if emph.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(emph.len());
    out.push(emph[0] + alpha * initial);
    for i in 1..emph.len() {
        let prev = out[i - 1];
        out.push(emph[i] + alpha * prev);
    }
    out
}

fn dct_ii(log_mel: &[f32], feature_count: usize) -> Vec<f32> {
    let mel_band_count = log_mel.len();
    let mut out = Vec::with_capacity(feature_count);
    for m in 0..feature_count {
        let mut sum = 0.0f32;
        for (b, &v) in log_mel.iter().enumerate() {
            sum += v * dct_ii_matrix_entry(m, b, mel_band_count);
        }
        let scale = if m == 0 {
            (1.0 / (4.0 * feature_count as f32)).sqrt()
        } else {
            (1.0 / (2.0 * feature_count as f32)).sqrt()
        };
        out.push(sum * scale * 2.0);
    }
    out
}

fn bin_frequencies_hz(fft_order: usize, sample_rate: u32) -> Vec<f32> {
    let n_bins = fft_order / 2 + 1;
    (0..n_bins)
        .map(|i| i as f32 * sample_rate as f32 / fft_order as f32)
        .collect()
}

/// Compute an MFCC feature sequence from mono PCM at any sample rate.
/// Resamples via the supplied [`Resampler`] to `options.analysis_sample_rate`
/// and produces a `feature_count`-wide sequence.
pub fn compute_mfccs(
    mono_audio: &[f32],
    sample_rate: u32,
    resampler: &impl Resampler,
    options: &MfccOptions,
) -> Result<FeatureMatrix, AlignError> {
    if mono_audio.is_empty() {
        return Ok(FeatureMatrix::empty(options.feature_count));
    }

    let resampled = resampler.resample(mono_audio, sample_rate, options.analysis_sample_rate);

    let processed = match options.pre_emphasis {
        Some(alpha) => pre_emphasize(&resampled, alpha, resampled.first().copied().unwrap_or(0.0)),
        None => resampled,
    };

    let window_size = (options.window_duration_secs * options.analysis_sample_rate as f32).round() as usize;
    let window_size = window_size + (window_size % 2); // force even
    let hop_size = (options.hop_duration_secs * options.analysis_sample_rate as f32).round() as usize;

    if processed.len() < window_size {
        return Ok(FeatureMatrix::empty(options.feature_count));
    }

    let frames = stftr(
        &processed,
        options.fft_order,
        window_size,
        hop_size.max(1),
        options.window_kind,
    )?;

    let bins = bin_frequencies_hz(options.fft_order, options.analysis_sample_rate);
    let filterbank: Vec<MelFilter> =
        build_filterbank(options.filterbank_count, options.lower_freq, options.upper_freq, &bins)?;

    let mut rows = Vec::with_capacity(frames.len());
    for frame in &frames {
        let power = power_spectrum(frame);
        let mel = mel_spectrum(&power, &filterbank);
        let log_mel: Vec<f32> = mel.iter().map(|&v| v.max(1e-12).log10()).collect();
        rows.push(dct_ii(&log_mel, options.feature_count));
    }

    let mut mfcc = FeatureMatrix::from_rows(rows)?;
    apply_post_processing(&mut mfcc, options);
    Ok(mfcc)
}

/// Apply normalization, liftering, and zero-first-coefficient, in that
/// order, after pre-emphasis has already happened before framing.
fn apply_post_processing(mfcc: &mut FeatureMatrix, options: &MfccOptions) {
    if mfcc.is_empty() {
        return;
    }

    if options.normalize {
        let means = mfcc.column_means();
        let stds = mfcc.column_stddevs(&means);
        let n = mfcc.len();
        for i in 0..n {
            let row = mfcc.row_mut(i);
            for (v, (&mean, &std)) in row.iter_mut().zip(means.iter().zip(stds.iter())) {
                if std > 1e-12 {
                    *v = (*v - mean) / std;
                } else {
                    *v -= mean;
                }
            }
        }
    }

    if options.lifter > 0 {
        let l = options.lifter as f32;
        let dim = mfcc.dim();
        let coeffs: Vec<f32> = (0..dim)
            .map(|i| 1.0 + (l / 2.0) * (std::f32::consts::PI * (i as f32 + 1.0) / l).sin())
            .collect();
        let n = mfcc.len();
        for i in 0..n {
            let row = mfcc.row_mut(i);
            for (v, &c) in row.iter_mut().zip(coeffs.iter()) {
                *v *= c;
            }
        }
    }

    if options.zero_first_coefficient {
        let n = mfcc.len();
        for i in 0..n {
            mfcc.row_mut(i)[0] = 0.0;
        }
    }
}
