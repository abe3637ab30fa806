use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::CaptureError;

/// One fragment of captured audio (i16 PCM, interleaved).
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for capture devices.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (16kHz is what the transcription backend expects)
    pub sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Chunk size in milliseconds
    pub chunk_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            chunk_duration_ms: 100,
        }
    }
}

/// Audio capture resource boundary.
///
/// Implementations:
/// - `ChannelCapture`: chunks arrive from an in-process channel (frames fed
///   over the API, or a test double)
/// - `FileCapture`: replays an audio file in chunk-sized steps
///
/// A device is exclusively owned by one `RecordingController` between
/// `start()` and `stop()`; `stop()` must be safe to call more than once.
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Begin capturing.
    ///
    /// Returns the receiver the device delivers chunks on, or
    /// `CaptureError::Unavailable` when the resource cannot be acquired.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError>;

    /// Release the underlying resource.
    async fn stop(&mut self);

    /// Check if the device is currently capturing.
    fn is_capturing(&self) -> bool;

    /// Get device name for logging.
    fn name(&self) -> &str;
}

/// Capture device backed by an in-process channel.
///
/// The channel is created up front so callers can hold a feeder before the
/// device is started; chunks pushed into the feeder come out of the stream
/// returned by `start()`.
pub struct ChannelCapture {
    tx: mpsc::Sender<AudioChunk>,
    rx: Option<mpsc::Receiver<AudioChunk>>,
    capturing: bool,
}

impl ChannelCapture {
    pub fn new(buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer);
        Self {
            tx,
            rx: Some(rx),
            capturing: false,
        }
    }

    /// Sender for pushing chunks into the capture stream.
    pub fn feeder(&self) -> mpsc::Sender<AudioChunk> {
        self.tx.clone()
    }
}

impl Default for ChannelCapture {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait::async_trait]
impl CaptureDevice for ChannelCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        let rx = self
            .rx
            .take()
            .ok_or_else(|| CaptureError::Unavailable("channel capture already consumed".into()))?;

        self.capturing = true;
        debug!("Channel capture started");
        Ok(rx)
    }

    async fn stop(&mut self) {
        self.capturing = false;
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "channel"
    }
}

/// Capture device that replays an audio file in chunk-sized steps.
///
/// Acquisition fails with `CaptureUnavailable` when the file cannot be
/// opened or decoded, leaving the caller's state untouched.
pub struct FileCapture {
    path: PathBuf,
    config: CaptureConfig,
    replay_task: Option<JoinHandle<()>>,
}

impl FileCapture {
    pub fn new(path: impl Into<PathBuf>, config: CaptureConfig) -> Self {
        Self {
            path: path.into(),
            config,
            replay_task: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureDevice for FileCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        let audio = super::file::AudioFile::open(&self.path)
            .map_err(|e| CaptureError::Unavailable(format!("{:#}", e)))?;

        info!(
            "Replaying {} ({:.1}s) as capture source",
            self.path.display(),
            audio.duration_seconds
        );

        let chunks = audio.into_chunks(self.config.chunk_duration_ms);
        let (tx, rx) = mpsc::channel(100);

        self.replay_task = Some(tokio::spawn(async move {
            for chunk in chunks {
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
            // Sender drops here, closing the stream.
        }));

        Ok(rx)
    }

    async fn stop(&mut self) {
        if let Some(task) = self.replay_task.take() {
            task.abort();
            let _ = task.await;
        }
    }

    fn is_capturing(&self) -> bool {
        self.replay_task.is_some()
    }

    fn name(&self) -> &str {
        "file"
    }
}
