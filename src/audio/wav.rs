use anyhow::{ensure, Context, Result};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::info;

use super::capture::AudioChunk;

/// A finalized recording, ready for upload to the transcription backend.
///
/// This is always built from the chunks the controller actually captured;
/// there is no other source of upload content.
#[derive(Debug, Clone)]
pub struct RecordingPayload {
    pub session_id: String,
    pub wav_bytes: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_seconds: f64,
}

/// Concatenate captured chunks into a single in-memory WAV payload.
///
/// The first chunk fixes the format; all chunks of one recording come from
/// the same device and share it.
pub fn encode_wav(session_id: &str, chunks: &[AudioChunk]) -> Result<RecordingPayload> {
    ensure!(!chunks.is_empty(), "No audio captured");

    let sample_rate = chunks[0].sample_rate;
    let channels = chunks[0].channels;

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut sample_count = 0usize;
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).context("Failed to create WAV writer")?;

        for chunk in chunks {
            for &sample in &chunk.samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
            sample_count += chunk.samples.len();
        }

        writer.finalize().context("Failed to finalize WAV payload")?;
    }

    let duration_seconds = sample_count as f64 / (sample_rate as f64 * channels as f64);

    info!(
        "Finalized recording for {}: {:.1}s, {} chunks, {} bytes",
        session_id,
        duration_seconds,
        chunks.len(),
        cursor.get_ref().len()
    );

    Ok(RecordingPayload {
        session_id: session_id.to_string(),
        wav_bytes: cursor.into_inner(),
        sample_rate,
        channels,
        duration_seconds,
    })
}

/// Persist a finalized recording under the recordings directory as
/// `{session_id}-{index}.wav`, returning the written path.
pub fn write_wav_file(dir: &Path, payload: &RecordingPayload, index: usize) -> Result<PathBuf> {
    fs::create_dir_all(dir).context("Failed to create recordings directory")?;

    let path = dir.join(format!("{}-{:03}.wav", payload.session_id, index));
    fs::write(&path, &payload.wav_bytes)
        .with_context(|| format!("Failed to write recording: {}", path.display()))?;

    Ok(path)
}
