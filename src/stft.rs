//! Short-Time Fourier Transform: framed forward FFT (`stftr`) and
//! weighted-overlap-add inverse (`stiftr`).
//!
//! Grounded on `kannaka-memory::ear::mel::mel_spectrogram`'s use of
//! `rustfft` for framed analysis, generalized to arbitrary window/hop
//! sizes, three selectable window kinds, and an inverse transform the
//! teacher's mel pipeline never needed.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f32::consts::PI;

use crate::error::AlignError;

/// Window function applied to each analysis frame before the forward FFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Hann,
    Hamming,
    /// Hann raised to the 0.85 power, as used by Kaldi-family pipelines.
    Povey,
}

/// A single interleaved-complex STFT frame: `N/2 + 1` bins packed as
/// `(real, imag)` f32 pairs, length `N + 2`.
pub type StftFrame = Vec<f32>;

/// Compute window weights of length `size` for the given [`WindowKind`].
pub fn window_weights(kind: WindowKind, size: usize) -> Vec<f32> {
    match kind {
        WindowKind::Hann => (0..size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (size as f32 - 1.0)).cos()))
            .collect(),
        WindowKind::Hamming => (0..size)
            .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f32 / (size as f32 - 1.0)).cos())
            .collect(),
        WindowKind::Povey => {
            let hann: Vec<f32> = (0..size)
                .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (size as f32 - 1.0)).cos()))
                .collect();
            hann.into_iter().map(|w| w.powf(0.85)).collect()
        }
    }
}

/// Forward STFT: pre-pad `samples` with `window_size/2` zeros on both
/// sides, then slide a `hop_size`-stepped `window_size` window across the
/// signal, multiply by the window weights, zero-extend to `fft_order`,
/// and emit one real-FFT frame per hop.
pub fn stftr(
    samples: &[f32],
    fft_order: usize,
    window_size: usize,
    hop_size: usize,
    window_kind: WindowKind,
) -> Result<Vec<StftFrame>, AlignError> {
    if fft_order % 2 != 0 {
        return Err(AlignError::InvalidDimension(format!(
            "fft_order must be even, got {fft_order}"
        )));
    }
    if window_size % 2 != 0 {
        return Err(AlignError::InvalidDimension(format!(
            "window_size must be even, got {window_size}"
        )));
    }
    if window_size > fft_order {
        return Err(AlignError::InvalidDimension(format!(
            "window_size ({window_size}) must be <= fft_order ({fft_order})"
        )));
    }
    if hop_size > window_size {
        return Err(AlignError::InvalidDimension(format!(
            "hop_size ({hop_size}) must be <= window_size ({window_size})"
        )));
    }

    let pad = window_size / 2;
    let mut padded = vec![0.0f32; pad];
    padded.extend_from_slice(samples);
    padded.extend(std::iter::repeat(0.0f32).take(pad));

    let weights = window_weights(window_kind, window_size);

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_order);
    let n_bins = fft_order / 2 + 1;

    let mut frames = Vec::new();
    let mut pos = 0;
    while pos + window_size <= padded.len() {
        let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); fft_order];
        for i in 0..window_size {
            buffer[i] = Complex::new(padded[pos + i] * weights[i], 0.0);
        }
        fft.process(&mut buffer);

        let mut packed = Vec::with_capacity((fft_order + 2) as usize);
        for bin in &buffer[..n_bins] {
            packed.push(bin.re);
            packed.push(bin.im);
        }
        frames.push(packed);
        pos += hop_size;
    }

    Ok(frames)
}

/// Inverse STFT: inverse-FFT each frame, window and overlap-add into an
/// output buffer, normalize by the accumulated squared window weight
/// (`+ 1e-8` to avoid division by zero), then trim the leading
/// `window_size/2`-sample pad and the result to `expected_len` if given.
pub fn stiftr(
    frames: &[StftFrame],
    fft_order: usize,
    window_size: usize,
    hop_size: usize,
    window_kind: WindowKind,
    expected_len: Option<usize>,
) -> Result<Vec<f32>, AlignError> {
    if fft_order % 2 != 0 {
        return Err(AlignError::InvalidDimension(format!(
            "fft_order must be even, got {fft_order}"
        )));
    }
    if window_size % 2 != 0 {
        return Err(AlignError::InvalidDimension(format!(
            "window_size must be even, got {window_size}"
        )));
    }
    if window_size > fft_order {
        return Err(AlignError::InvalidDimension(format!(
            "window_size ({window_size}) must be <= fft_order ({fft_order})"
        )));
    }
    if hop_size > window_size {
        return Err(AlignError::InvalidDimension(format!(
            "hop_size ({hop_size}) must be <= window_size ({window_size})"
        )));
    }

    const EPS: f32 = 1e-8;
    let n_bins = fft_order / 2 + 1;
    let weights = window_weights(window_kind, window_size);

    let mut planner = FftPlanner::new();
    let ifft = planner.plan_fft_inverse(fft_order);

    let total_len = if frames.is_empty() {
        0
    } else {
        (frames.len() - 1) * hop_size + window_size
    };
    let mut output = vec![0.0f32; total_len];
    let mut weight_sq_sum = vec![0.0f32; total_len];

    for (frame_idx, frame) in frames.iter().enumerate() {
        if frame.len() != (n_bins) * 2 {
            return Err(AlignError::InvalidDimension(format!(
                "frame {frame_idx} has {} values, expected {}",
                frame.len(),
                n_bins * 2
            )));
        }

        let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); fft_order];
        for b in 0..n_bins {
            buffer[b] = Complex::new(frame[2 * b], frame[2 * b + 1]);
        }
        // Reconstruct the conjugate-symmetric upper half for a real inverse transform.
        for b in 1..(fft_order - n_bins + 1) {
            buffer[fft_order - b] = buffer[b].conj();
        }

        ifft.process(&mut buffer);
        let scale = 1.0 / fft_order as f32;

        let start = frame_idx * hop_size;
        for i in 0..window_size {
            let sample = buffer[i].re * scale * weights[i];
            output[start + i] += sample;
            weight_sq_sum[start + i] += weights[i] * weights[i];
        }
    }

    for i in 0..total_len {
        output[i] /= weight_sq_sum[i] + EPS;
    }

    let pad = window_size / 2;
    let trimmed = if pad < output.len() {
        output[pad..].to_vec()
    } else {
        Vec::new()
    };

    Ok(match expected_len {
        Some(len) => {
            let mut v = trimmed;
            v.resize(len, 0.0);
            v
        }
        None => trimmed,
    })
}
