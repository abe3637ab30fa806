use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::info;

use crate::audio::CaptureConfig;
use crate::auth::AuthSession;
use crate::backend::{ChatBackend, PatientsBackend, TranscriptionBackend};
use crate::conversation::ConversationSession;
use crate::profile::ProfileStore;
use crate::recording::RecordingController;

/// One live patient session: the conversation plus its recording
/// controller and the task forwarding finalized recordings into it.
pub struct SessionEntry {
    pub conversation: Arc<ConversationSession>,
    pub recorder: Mutex<RecordingController>,
    upload_task: JoinHandle<()>,
}

impl SessionEntry {
    /// Stop forwarding recordings; called when the session is dropped from
    /// the registry.
    pub fn shutdown(&self) {
        self.upload_task.abort();
    }
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active sessions (session_id → entry)
    pub sessions: Arc<RwLock<HashMap<String, Arc<SessionEntry>>>>,

    pub chat_backend: Arc<dyn ChatBackend>,
    pub transcription_backend: Arc<dyn TranscriptionBackend>,
    pub patients_backend: Arc<dyn PatientsBackend>,

    pub auth: AuthSession,
    pub profiles: Arc<dyn ProfileStore>,

    pub capture: CaptureConfig,
    pub recordings_dir: Option<PathBuf>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chat_backend: Arc<dyn ChatBackend>,
        transcription_backend: Arc<dyn TranscriptionBackend>,
        patients_backend: Arc<dyn PatientsBackend>,
        auth: AuthSession,
        profiles: Arc<dyn ProfileStore>,
        capture: CaptureConfig,
        recordings_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            chat_backend,
            transcription_backend,
            patients_backend,
            auth,
            profiles,
            capture,
            recordings_dir,
        }
    }

    /// Create and register a new session. Finalized recordings flow from
    /// the controller's upload sink into the conversation's transcription
    /// submit path.
    pub async fn create_session(&self) -> Arc<SessionEntry> {
        let session_id = format!("session-{}", uuid::Uuid::new_v4());

        let conversation = Arc::new(ConversationSession::new(
            session_id.as_str(),
            Arc::clone(&self.chat_backend),
            Arc::clone(&self.transcription_backend),
        ));

        let (upload_tx, mut upload_rx) = mpsc::channel(4);
        let recorder =
            RecordingController::new(session_id.as_str(), upload_tx, self.recordings_dir.clone());

        let uploader = Arc::clone(&conversation);
        let upload_task = tokio::spawn(async move {
            while let Some(payload) = upload_rx.recv().await {
                uploader.submit_transcription(payload).await;
            }
        });

        let entry = Arc::new(SessionEntry {
            conversation,
            recorder: Mutex::new(recorder),
            upload_task,
        });

        self.sessions
            .write()
            .await
            .insert(session_id.clone(), Arc::clone(&entry));

        info!("Created session {}", session_id);
        entry
    }

    pub async fn get_session(&self, session_id: &str) -> Option<Arc<SessionEntry>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn remove_session(&self, session_id: &str) -> Option<Arc<SessionEntry>> {
        let entry = self.sessions.write().await.remove(session_id);
        if let Some(entry) = &entry {
            entry.shutdown();
            info!("Removed session {}", session_id);
        }
        entry
    }
}
