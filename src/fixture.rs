//! WAV fixture loading for tests and examples, behind the `decode`
//! feature. Never used by the alignment core itself — decoding audio
//! files is not this crate's job; this exists purely so integration
//! tests can load real audio instead of synthesizing tones.
//!
//! Grounded on `kannaka-memory::ear::decode::decode_audio`, pared down to
//! the WAV/PCM codecs this crate's `decode` feature actually enables.

use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AlignError;

/// Decode a WAV file to mono f32 samples, returning the samples and their
/// native sample rate. Callers resample via [`crate::Resampler`]
/// themselves, same as any other audio source.
pub fn load_wav_mono(path: &Path) -> Result<(Vec<f32>, u32), AlignError> {
    let file = std::fs::File::open(path)
        .map_err(|e| AlignError::InvalidArgument(format!("cannot open {}: {e}", path.display())))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AlignError::InvalidArgument(format!("probe failed: {e}")))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| AlignError::InvalidArgument("no audio track found".into()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let source_rate = codec_params.sample_rate.unwrap_or(44_100);
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AlignError::InvalidArgument(format!("no decoder for track: {e}")))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(_) => break,
        };
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(_) => continue,
        };
        let spec = *decoded.spec();
        let n_frames = decoded.capacity();
        let mut sample_buf = SampleBuffer::<f32>::new(n_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        for frame in sample_buf.samples().chunks(channels) {
            let mono: f32 = frame.iter().sum::<f32>() / channels as f32;
            samples.push(mono);
        }
    }

    if samples.is_empty() {
        return Err(AlignError::InvalidArgument("decoded zero samples".into()));
    }

    Ok((samples, source_rate))
}
