use std::io::Cursor;

use super::backend::{AudioChunk, AudioFormat};
use crate::error::RecordingError;

/// Stream parameters of an encoded recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

impl StreamSpec {
    /// Parameters of the first chunk, or `fallback` for an empty recording
    pub fn of(chunks: &[AudioChunk], fallback: StreamSpec) -> StreamSpec {
        chunks
            .first()
            .map(|chunk| StreamSpec {
                sample_rate: chunk.sample_rate,
                channels: chunk.channels,
            })
            .unwrap_or(fallback)
    }
}

/// Join captured chunks into one encoded blob
///
/// Chunks whose parameters differ from the first chunk are skipped; a device
/// that renegotiates mid-stream would otherwise corrupt the container.
pub fn encode(
    format: AudioFormat,
    chunks: &[AudioChunk],
    spec: StreamSpec,
) -> Result<Vec<u8>, RecordingError> {
    let samples = chunks
        .iter()
        .filter(|chunk| chunk.sample_rate == spec.sample_rate && chunk.channels == spec.channels)
        .flat_map(|chunk| chunk.samples.iter().copied());

    match format {
        AudioFormat::Wav => encode_wav(samples, spec),
        AudioFormat::Pcm16 => Ok(samples.flat_map(i16::to_le_bytes).collect()),
    }
}

fn encode_wav(
    samples: impl Iterator<Item = i16>,
    spec: StreamSpec,
) -> Result<Vec<u8>, RecordingError> {
    let wav_spec = hound::WavSpec {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, wav_spec).map_err(encoder_error)?;
        for sample in samples {
            writer.write_sample(sample).map_err(encoder_error)?;
        }
        writer.finalize().map_err(encoder_error)?;
    }

    Ok(cursor.into_inner())
}

fn encoder_error(err: hound::Error) -> RecordingError {
    RecordingError::Device(format!("failed to encode recording: {err}"))
}
