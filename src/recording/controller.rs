use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::audio::{encode_wav, write_wav_file, AudioChunk, CaptureDevice, RecordingPayload};
use crate::error::CaptureError;

/// Recorder lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
}

/// Two-state controller owning the capture resource for one session.
///
/// At most one capture device is live at a time; `start()` while recording
/// and `stop()` while idle are no-ops. On stop the device is released
/// before finalization can fail, and the finalized payload is handed to
/// the upload sink exactly once.
pub struct RecordingController {
    session_id: String,
    state: RecorderState,
    device: Option<Box<dyn CaptureDevice>>,
    chunks: Arc<Mutex<Vec<AudioChunk>>>,
    drain_task: Option<JoinHandle<()>>,
    upload_tx: mpsc::Sender<RecordingPayload>,
    recordings_dir: Option<PathBuf>,
    finalized_count: usize,
}

impl RecordingController {
    pub fn new(
        session_id: impl Into<String>,
        upload_tx: mpsc::Sender<RecordingPayload>,
        recordings_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            state: RecorderState::Idle,
            device: None,
            chunks: Arc::new(Mutex::new(Vec::new())),
            drain_task: None,
            upload_tx,
            recordings_dir,
            finalized_count: 0,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// Idle → Recording: acquire the capture device and start draining its
    /// chunk stream. On acquisition failure the state stays Idle and the
    /// error is surfaced to the caller.
    pub async fn start(&mut self, mut device: Box<dyn CaptureDevice>) -> Result<(), CaptureError> {
        if self.state == RecorderState::Recording {
            warn!(
                "Session {}: recording already active, ignoring start",
                self.session_id
            );
            return Ok(());
        }

        let mut rx = device.start().await?;

        // Fresh buffer for the new recording.
        self.chunks.lock().await.clear();

        let chunks = Arc::clone(&self.chunks);
        let drain_task = tokio::spawn(async move {
            while let Some(chunk) = rx.recv().await {
                chunks.lock().await.push(chunk);
            }
        });

        info!(
            "Session {}: recording started via {} device",
            self.session_id,
            device.name()
        );

        self.device = Some(device);
        self.drain_task = Some(drain_task);
        self.state = RecorderState::Recording;

        Ok(())
    }

    /// Append a chunk directly (frames fed over the API). Ignored while
    /// idle.
    pub async fn on_chunk(&mut self, chunk: AudioChunk) {
        if self.state != RecorderState::Recording {
            return;
        }
        self.chunks.lock().await.push(chunk);
    }

    /// Recording → Idle: release the device, finalize the buffer into one
    /// WAV payload and hand it to the upload sink.
    ///
    /// Returns the finalized payload, or None when the controller was idle
    /// or nothing was captured. The device is released on every path, even
    /// when finalization fails.
    pub async fn stop(&mut self) -> Result<Option<RecordingPayload>> {
        if self.state != RecorderState::Recording {
            warn!(
                "Session {}: recording not active, ignoring stop",
                self.session_id
            );
            return Ok(None);
        }

        self.state = RecorderState::Idle;

        // Release the capture resource first; finalization failures below
        // must not leave the device held.
        if let Some(mut device) = self.device.take() {
            device.stop().await;
        }

        // Let the drain task flush whatever the device already delivered,
        // then cut it loose if its stream never closes.
        if let Some(mut drain_task) = self.drain_task.take() {
            if tokio::time::timeout(Duration::from_millis(250), &mut drain_task)
                .await
                .is_err()
            {
                drain_task.abort();
                let _ = drain_task.await;
            }
        }

        let chunks: Vec<AudioChunk> = {
            let mut buffer = self.chunks.lock().await;
            std::mem::take(&mut *buffer)
        };

        if chunks.is_empty() {
            info!("Session {}: recording produced no audio", self.session_id);
            return Ok(None);
        }

        let payload = encode_wav(&self.session_id, &chunks)?;

        if let Some(dir) = &self.recordings_dir {
            match write_wav_file(dir, &payload, self.finalized_count) {
                Ok(path) => info!("Session {}: saved recording to {}", self.session_id, path.display()),
                Err(e) => warn!("Session {}: failed to save recording: {:#}", self.session_id, e),
            }
        }
        self.finalized_count += 1;

        if let Err(e) = self.upload_tx.send(payload.clone()).await {
            error!(
                "Session {}: upload sink closed, dropping recording: {}",
                self.session_id, e
            );
        }

        Ok(Some(payload))
    }
}
