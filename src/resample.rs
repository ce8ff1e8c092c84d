//! Resampling seam. Resampling is treated as an external collaborator;
//! this module defines the trait the MFCC pipeline is generic over and
//! one concrete adapter backed by `rubato`, the same crate
//! `kannaka-memory::ear::decode::resample` uses.

use rubato::{FftFixedIn, Resampler as RubatoResamplerTrait};

/// An external resampler the MFCC pipeline invokes; the core never
/// implements resampling math itself.
pub trait Resampler {
    fn resample(&self, samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32>;
}

/// `rubato`-backed sinc/FFT resampler, adapted from
/// `kannaka-memory::ear::decode::resample`.
pub struct RubatoResampler {
    chunk_size: usize,
}

impl RubatoResampler {
    pub fn new() -> Self {
        Self { chunk_size: 1024 }
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self { chunk_size }
    }
}

impl Default for RubatoResampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Resampler for RubatoResampler {
    fn resample(&self, samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
        if from_rate == to_rate || samples.is_empty() {
            return samples.to_vec();
        }

        let ratio = to_rate as f64 / from_rate as f64;
        let chunk_size = self.chunk_size;

        let mut resampler =
            FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, chunk_size, 2, 1)
                .expect("failed to create resampler");

        let mut output = Vec::with_capacity((samples.len() as f64 * ratio) as usize + chunk_size);

        let mut pos = 0;
        while pos + chunk_size <= samples.len() {
            let chunk = vec![samples[pos..pos + chunk_size].to_vec()];
            if let Ok(out) = resampler.process(&chunk, None) {
                if let Some(ch) = out.first() {
                    output.extend_from_slice(ch);
                }
            }
            pos += chunk_size;
        }

        if pos < samples.len() {
            let remaining = samples.len() - pos;
            let mut padded = samples[pos..].to_vec();
            padded.resize(chunk_size, 0.0);
            let chunk = vec![padded];
            if let Ok(out) = resampler.process(&chunk, None) {
                if let Some(ch) = out.first() {
                    let take = ((remaining as f64 * ratio) as usize).min(ch.len());
                    output.extend_from_slice(&ch[..take]);
                }
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_when_rates_match() {
        let r = RubatoResampler::new();
        let samples = vec![1.0, 2.0, 3.0, 4.0];
        let out = r.resample(&samples, 16000, 16000);
        assert_eq!(out, samples);
    }

    #[test]
    fn empty_input_stays_empty() {
        let r = RubatoResampler::new();
        let out = r.resample(&[], 44100, 16000);
        assert!(out.is_empty());
    }

    #[test]
    fn downsampling_shrinks_sample_count() {
        let r = RubatoResampler::with_chunk_size(256);
        let samples: Vec<f32> = (0..4096)
            .map(|i| (i as f32 * 0.01).sin())
            .collect();
        let out = r.resample(&samples, 44100, 16000);
        assert!(!out.is_empty());
        assert!(out.len() < samples.len());
    }
}
