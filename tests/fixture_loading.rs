//! Integration test for the optional `decode`-feature WAV fixture loader
//! (`src/fixture.rs`). Writes a minimal PCM16 mono WAV with a hand-rolled
//! header (no external WAV-writing crate — this test only needs to
//! produce a file `load_wav_mono` can read back), then checks the decoded
//! samples and sample rate round-trip.

#![cfg(feature = "decode")]

use std::f32::consts::PI;
use std::io::Write;

use align_core::fixture::load_wav_mono;

fn write_pcm16_wav(path: &std::path::Path, samples: &[f32], sample_rate: u32) {
    let data_len = samples.len() * 2;
    let mut file = std::fs::File::create(path).unwrap();

    file.write_all(b"RIFF").unwrap();
    file.write_all(&((36 + data_len) as u32).to_le_bytes()).unwrap();
    file.write_all(b"WAVE").unwrap();

    file.write_all(b"fmt ").unwrap();
    file.write_all(&16u32.to_le_bytes()).unwrap(); // fmt chunk size
    file.write_all(&1u16.to_le_bytes()).unwrap(); // PCM
    file.write_all(&1u16.to_le_bytes()).unwrap(); // mono
    file.write_all(&sample_rate.to_le_bytes()).unwrap();
    let byte_rate = sample_rate * 2;
    file.write_all(&byte_rate.to_le_bytes()).unwrap();
    file.write_all(&2u16.to_le_bytes()).unwrap(); // block align
    file.write_all(&16u16.to_le_bytes()).unwrap(); // bits per sample

    file.write_all(b"data").unwrap();
    file.write_all(&(data_len as u32).to_le_bytes()).unwrap();
    for &s in samples {
        let clamped = s.clamp(-1.0, 1.0);
        let i = (clamped * i16::MAX as f32) as i16;
        file.write_all(&i.to_le_bytes()).unwrap();
    }
}

#[test]
fn loads_mono_wav_and_recovers_sample_rate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");

    let sample_rate = 16_000u32;
    let samples: Vec<f32> = (0..sample_rate)
        .map(|i| 0.5 * (2.0 * PI * 440.0 * i as f32 / sample_rate as f32).sin())
        .collect();
    write_pcm16_wav(&path, &samples, sample_rate);

    let (decoded, rate) = load_wav_mono(&path).unwrap();
    assert_eq!(rate, sample_rate);
    assert_eq!(decoded.len(), samples.len());

    // PCM16 quantization introduces small error; compare with a loose epsilon.
    for (a, b) in samples.iter().zip(decoded.iter()) {
        assert!((a - b).abs() < 0.01, "{a} vs {b}");
    }
}

#[test]
fn missing_file_is_invalid_argument() {
    let err = load_wav_mono(std::path::Path::new("/nonexistent/path/does-not-exist.wav")).unwrap_err();
    assert!(matches!(err, align_core::AlignError::InvalidArgument(_)));
}
