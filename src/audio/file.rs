use anyhow::{bail, Context, Result};
use hound::WavReader;
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::info;

use super::capture::AudioChunk;

/// Decoded audio, normalized to interleaved i16 PCM.
pub struct AudioFile {
    pub source: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    /// Open an audio file from disk. WAV goes through hound directly; every
    /// other container is probed and decoded by symphonia.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let is_wav = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("wav"))
            .unwrap_or(false);

        if is_wav {
            let reader = WavReader::open(path).context("Failed to open WAV file")?;
            return Self::from_wav_reader(reader, path.display().to_string());
        }

        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read audio file: {}", path.display()))?;
        Self::decode_bytes(bytes, Some(&path.display().to_string()))
    }

    /// Parse WAV bytes (e.g. a finalized recording payload).
    pub fn from_wav_bytes(bytes: &[u8], source: impl Into<String>) -> Result<Self> {
        let reader = WavReader::new(Cursor::new(bytes)).context("Failed to parse WAV bytes")?;
        Self::from_wav_reader(reader, source.into())
    }

    fn from_wav_reader<R: std::io::Read>(reader: WavReader<R>, source: String) -> Result<Self> {
        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        Self::from_samples(source, samples, spec.sample_rate, spec.channels)
    }

    /// Decode an in-memory audio payload of any supported container/codec
    /// (M4A, MP3, WAV, FLAC, OGG). Used for uploaded visit recordings.
    pub fn decode_bytes(bytes: Vec<u8>, name: Option<&str>) -> Result<Self> {
        let source = name.unwrap_or("upload").to_string();

        let mut hint = Hint::new();
        if let Some(ext) = name
            .map(Path::new)
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
        {
            hint.with_extension(ext);
        }

        let stream = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .context("Unrecognized audio format")?;

        let mut format = probed.format;
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .context("No decodable audio track")?;
        let track_id = track.id;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .context("Unsupported audio codec")?;

        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(16000);
        let mut channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(1);
        let mut samples: Vec<i16> = Vec::new();
        let mut sample_buf: Option<SampleBuffer<i16>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(e).context("Failed reading audio packet"),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    if sample_buf.is_none() {
                        let spec = *decoded.spec();
                        sample_rate = spec.rate;
                        channels = spec.channels.count() as u16;
                        sample_buf = Some(SampleBuffer::<i16>::new(decoded.capacity() as u64, spec));
                    }
                    if let Some(buf) = &mut sample_buf {
                        buf.copy_interleaved_ref(decoded);
                        samples.extend_from_slice(buf.samples());
                    }
                }
                // Skip over damaged packets rather than failing the upload.
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(e).context("Failed decoding audio packet"),
            }
        }

        Self::from_samples(source, samples, sample_rate, channels)
    }

    fn from_samples(
        source: String,
        samples: Vec<i16>,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self> {
        if samples.is_empty() {
            bail!("Audio contains no samples");
        }

        let duration_seconds = samples.len() as f64 / (sample_rate as f64 * channels as f64);

        info!(
            "Audio loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            sample_rate,
            channels,
            samples.len()
        );

        Ok(Self {
            source,
            duration_seconds,
            sample_rate,
            channels,
            samples,
        })
    }

    /// Split the decoded samples into chunk-sized capture fragments.
    pub fn into_chunks(&self, chunk_duration_ms: u64) -> Vec<AudioChunk> {
        let samples_per_chunk = ((self.sample_rate as u64 * chunk_duration_ms / 1000).max(1)
            * self.channels as u64) as usize;

        self.samples
            .chunks(samples_per_chunk)
            .enumerate()
            .map(|(i, window)| AudioChunk {
                samples: window.to_vec(),
                sample_rate: self.sample_rate,
                channels: self.channels,
                timestamp_ms: i as u64 * chunk_duration_ms,
            })
            .collect()
    }
}
