use std::path::Path;

use symphonia::core::audio::SampleBuffer as PcmBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{info, warn};

use crate::samples::SampleBuffer;
use crate::{GameError, Result};

/// Decode an audio file to mono f32 PCM at its native sample rate.
pub fn decode_file(path: &Path) -> Result<SampleBuffer> {
    let file = std::fs::File::open(path)
        .map_err(|e| GameError::DecodeFailure(format!("cannot open {}: {e}", path.display())))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| GameError::DecodeFailure(format!("unrecognised format: {e}")))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| GameError::DecodeFailure("no audio track".into()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| GameError::DecodeFailure("track has no sample rate".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| GameError::DecodeFailure(format!("no decoder: {e}")))?;

    let mut mono: Vec<f32> = Vec::new();
    let mut skipped = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(GameError::DecodeFailure(format!("reading packet: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                skipped += 1;
                warn!("Skipping corrupt packet: {e}");
                continue;
            }
            Err(e) => return Err(GameError::DecodeFailure(e.to_string())),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let mut pcm = PcmBuffer::<f32>::new(decoded.capacity() as u64, spec);
        pcm.copy_interleaved_ref(decoded);
        downmix_into(pcm.samples(), channels, &mut mono);
    }

    if skipped > 0 {
        warn!("{skipped} packets could not be decoded");
    }

    info!(
        "Decoded {:?}: {} samples at {} Hz",
        path,
        mono.len(),
        sample_rate
    );

    Ok(SampleBuffer::new(mono, sample_rate))
}

/// Average interleaved frames into a single channel.
pub fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    let channels = channels.max(1);
    out.reserve(interleaved.len() / channels);
    for frame in interleaved.chunks_exact(channels) {
        out.push(frame.iter().sum::<f32>() / channels as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_channels() {
        let mut out = Vec::new();
        downmix_into(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2, &mut out);
        assert_eq!(out, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn downmix_mono_is_identity() {
        let mut out = Vec::new();
        downmix_into(&[0.1, 0.2, 0.3], 1, &mut out);
        assert_eq!(out, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn missing_file_is_decode_failure() {
        let err = decode_file(Path::new("/definitely/not/here.ogg")).unwrap_err();
        assert!(matches!(err, GameError::DecodeFailure(_)));
    }

    #[test]
    fn garbage_file_is_decode_failure() {
        let path = std::env::temp_dir().join(format!("beattiles-garbage-{}.wav", std::process::id()));
        std::fs::write(&path, b"not really a wave file").unwrap();
        let err = decode_file(&path).unwrap_err();
        assert!(matches!(err, GameError::DecodeFailure(_)));
        std::fs::remove_file(&path).ok();
    }
}
