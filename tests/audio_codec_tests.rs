// Tests for WAV finalization and decoding of audio payloads

use anyhow::Result;
use medmentor::{encode_wav, AudioChunk, AudioFile};
use medmentor::audio::write_wav_file;
use tempfile::TempDir;

fn chunk(samples: Vec<i16>, timestamp_ms: u64) -> AudioChunk {
    AudioChunk {
        samples,
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
    }
}

#[test]
fn test_encode_wav_concatenates_chunks() -> Result<()> {
    let chunks = vec![
        chunk(vec![1i16; 1600], 0),
        chunk(vec![2i16; 1600], 100),
        chunk(vec![3i16; 800], 200),
    ];

    let payload = encode_wav("session-a", &chunks)?;

    assert_eq!(payload.session_id, "session-a");
    assert_eq!(payload.sample_rate, 16000);
    assert_eq!(payload.channels, 1);
    assert!((payload.duration_seconds - 0.25).abs() < 0.001);

    let audio = AudioFile::from_wav_bytes(&payload.wav_bytes, "roundtrip")?;
    assert_eq!(audio.samples.len(), 4000);
    assert_eq!(audio.samples[0], 1);
    assert_eq!(audio.samples[1600], 2);
    assert_eq!(audio.samples[3200], 3);

    Ok(())
}

#[test]
fn test_encode_wav_rejects_empty_capture() {
    assert!(encode_wav("session-a", &[]).is_err());
}

#[test]
fn test_wav_bytes_parse_as_valid_wav() -> Result<()> {
    let payload = encode_wav("session-a", &[chunk(vec![0i16; 16000], 0)])?;

    let audio = AudioFile::from_wav_bytes(&payload.wav_bytes, "check")?;
    assert_eq!(audio.sample_rate, 16000);
    assert_eq!(audio.channels, 1);
    assert!((audio.duration_seconds - 1.0).abs() < 0.001);

    Ok(())
}

#[test]
fn test_into_chunks_splits_by_duration() -> Result<()> {
    // Half a second of audio in 100ms chunks -> 5 chunks of 1600 samples.
    let payload = encode_wav("session-a", &[chunk(vec![7i16; 8000], 0)])?;
    let audio = AudioFile::from_wav_bytes(&payload.wav_bytes, "chunking")?;

    let chunks = audio.into_chunks(100);
    assert_eq!(chunks.len(), 5);
    assert!(chunks.iter().all(|c| c.samples.len() == 1600));
    assert_eq!(chunks[0].timestamp_ms, 0);
    assert_eq!(chunks[4].timestamp_ms, 400);

    Ok(())
}

#[test]
fn test_into_chunks_keeps_trailing_partial_chunk() -> Result<()> {
    let payload = encode_wav("session-a", &[chunk(vec![7i16; 2000], 0)])?;
    let audio = AudioFile::from_wav_bytes(&payload.wav_bytes, "partial")?;

    let chunks = audio.into_chunks(100);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].samples.len(), 1600);
    assert_eq!(chunks[1].samples.len(), 400);

    Ok(())
}

#[test]
fn test_write_wav_file_and_reopen() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let payload = encode_wav("session-a", &[chunk(vec![5i16; 1600], 0)])?;

    let path = write_wav_file(temp_dir.path(), &payload, 0)?;
    assert!(path.to_string_lossy().ends_with("session-a-000.wav"));

    let audio = AudioFile::open(&path)?;
    assert_eq!(audio.samples.len(), 1600);
    assert_eq!(audio.sample_rate, 16000);

    Ok(())
}
