// Integration tests for WAV input: decoding, chunking, file capture and upload artifacts
//
// Fixtures are generated into a temp directory with hound.

use anyhow::Result;
use lets_talk::audio::{AudioFile, CaptureConfig, CaptureDevice, FileCapture, RecordingArtifact};
use lets_talk::recording::{RecorderConfig, RecordingSession};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Write `seconds` of a constant tone at `sample_rate`/`channels`
fn write_wav(dir: &Path, name: &str, sample_rate: u32, channels: u16, seconds: u32) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for _ in 0..sample_rate * seconds * u32::from(channels) {
        writer.write_sample(1200i16).unwrap();
    }
    writer.finalize().unwrap();
    path
}

#[test]
fn test_audio_file_open() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_wav(dir.path(), "answer.wav", 16000, 1, 2);

    let audio = AudioFile::open(&path)?;

    assert!((audio.duration_seconds - 2.0).abs() < 0.001);
    assert_eq!(audio.sample_rate, 16000);
    assert_eq!(audio.channels, 1);
    assert_eq!(audio.samples.len(), 32000);
    assert!(audio.path.contains("answer.wav"));

    Ok(())
}

#[test]
fn test_audio_file_nonexistent() {
    let path = PathBuf::from("/nonexistent/path/to/audio.wav");
    let result = AudioFile::open(&path);

    assert!(result.is_err(), "Opening nonexistent file should fail");
}

#[test]
fn test_stereo_samples_are_interleaved() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_wav(dir.path(), "stereo.wav", 16000, 2, 1);

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.channels, 2);
    assert_eq!(audio.samples.len() % 2, 0);
    assert!((audio.duration_seconds - 1.0).abs() < 0.001);

    Ok(())
}

#[test]
fn test_chunks_are_conformed_to_capture_config() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_wav(dir.path(), "stereo-32k.wav", 32000, 2, 1);

    let audio = AudioFile::open(&path)?;
    let chunks = audio.chunks(&CaptureConfig::default());

    assert_eq!(chunks.len(), 10);
    for (index, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.sample_rate, 16000);
        assert_eq!(chunk.channels, 1);
        assert_eq!(chunk.samples.len(), 1600);
        assert_eq!(chunk.timestamp_ms, index as u64 * 100);
    }

    Ok(())
}

#[test]
fn test_wav_file_becomes_upload_artifact() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_wav(dir.path(), "answer.wav", 16000, 1, 3);

    let artifact = RecordingArtifact::from_wav_file(&path)?;

    assert_eq!(artifact.mime_type, "audio/wav");
    assert_eq!(artifact.file_name(), "recording.wav");
    assert!((artifact.duration_seconds - 3.0).abs() < 0.001);

    let reader = hound::WavReader::new(std::io::Cursor::new(artifact.bytes.to_vec()))?;
    assert_eq!(reader.len(), 48000);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_file_capture_feeds_a_recording() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_wav(dir.path(), "answer.wav", 16000, 1, 1);

    let device = Arc::new(FileCapture::open(&path, &CaptureConfig::default())?);
    assert!(device.name().starts_with("file:"));

    let session = RecordingSession::new(device.clone(), RecorderConfig::default());
    session.start().await;
    assert!(device.is_streaming());

    // Longer than the file; the recorder keeps waiting for a stop
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(session.is_recording().await);

    session.stop().await;
    assert!(!device.is_streaming());

    let artifact = session.artifact().await.expect("artifact");
    let reader = hound::WavReader::new(std::io::Cursor::new(artifact.bytes.to_vec()))?;
    assert_eq!(reader.len(), 16000);

    Ok(())
}
