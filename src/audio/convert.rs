//! Sample-format conversions applied before chunks reach the recorder.

use super::backend::AudioChunk;

/// Bring a chunk to the target rate and channel count where that is cheap.
///
/// Rates are reduced by decimation only when the source rate is an integer
/// multiple of the target; anything else passes through unchanged and the
/// artifact header records the real rate.
pub fn conform(chunk: AudioChunk, target_sample_rate: u32, target_channels: u16) -> AudioChunk {
    let mut processed = chunk;

    if processed.channels != target_channels && target_channels == 1 {
        processed = to_mono(processed);
    }

    if processed.sample_rate != target_sample_rate {
        processed = decimate(processed, target_sample_rate);
    }

    processed
}

/// Downsample by keeping every Nth frame
pub fn decimate(chunk: AudioChunk, target_rate: u32) -> AudioChunk {
    if target_rate == 0 || chunk.sample_rate <= target_rate || chunk.sample_rate % target_rate != 0
    {
        return chunk;
    }

    let ratio = (chunk.sample_rate / target_rate) as usize;
    let channels = usize::from(chunk.channels.max(1));

    let samples: Vec<i16> = chunk
        .samples
        .chunks_exact(channels)
        .step_by(ratio)
        .flatten()
        .copied()
        .collect();

    AudioChunk {
        samples,
        sample_rate: target_rate,
        channels: chunk.channels,
        timestamp_ms: chunk.timestamp_ms,
    }
}

/// Average interleaved channels into one
pub fn to_mono(chunk: AudioChunk) -> AudioChunk {
    if chunk.channels <= 1 {
        return chunk;
    }

    let samples = downmix_i16(&chunk.samples, usize::from(chunk.channels));

    AudioChunk {
        samples,
        sample_rate: chunk.sample_rate,
        channels: 1,
        timestamp_ms: chunk.timestamp_ms,
    }
}

pub fn downmix_i16(interleaved: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

pub fn downmix_f32(interleaved: &[f32], channels: usize) -> Vec<i16> {
    let channels = channels.max(1);
    interleaved
        .chunks_exact(channels)
        .map(|frame| {
            let mean = frame.iter().sum::<f32>() / channels as f32;
            (mean.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
        })
        .collect()
}

pub fn downmix_u16(interleaved: &[u16], channels: usize) -> Vec<i16> {
    let signed: Vec<i16> = interleaved
        .iter()
        .map(|&s| (i32::from(s) - 32768) as i16)
        .collect();
    downmix_i16(&signed, channels)
}
