use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::backend::{ChatBackend, ChatReply, TranscriptionBackend, TranscriptionResult};
use crate::error::BackendError;
use crate::recording::RecordingPayload;

use super::log::MessageLog;
use super::message::{Message, MessageId, Sender};

/// Fixed greeting appended when a session is created.
pub const GREETING: &str = "How can I assist you today?";

/// Fixed content of a placeholder message while a request is in flight.
///
/// The placeholder is tracked by id, never by this text; the constant only
/// exists so the UI has something to render.
pub const PROCESSING_MARKER: &str = "Processing your request...";

/// What kind of backend call a pending handle is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    Chat,
    Transcription,
}

struct SessionState {
    log: MessageLog,

    /// Outstanding requests, keyed by their placeholder message id.
    /// Removing the entry is what makes resolution exactly-once.
    pending: HashMap<MessageId, PendingKind>,
}

/// A patient conversation: message history plus the merge logic that
/// reconciles optimistic appends with eventual backend results.
///
/// `submit_chat` / `submit_transcription` run the full asynchronous path;
/// the `begin_*` / `resolve_*` pairs expose the underlying transitions so
/// tests can drive completion order directly.
pub struct ConversationSession {
    id: String,
    state: Arc<Mutex<SessionState>>,
    chat_backend: Arc<dyn ChatBackend>,
    transcription_backend: Arc<dyn TranscriptionBackend>,
}

impl ConversationSession {
    pub fn new(
        id: impl Into<String>,
        chat_backend: Arc<dyn ChatBackend>,
        transcription_backend: Arc<dyn TranscriptionBackend>,
    ) -> Self {
        let mut log = MessageLog::new();
        log.append(Sender::Bot, GREETING);

        Self {
            id: id.into(),
            state: Arc::new(Mutex::new(SessionState {
                log,
                pending: HashMap::new(),
            })),
            chat_backend,
            transcription_backend,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Snapshot of the message log in display order.
    pub async fn messages(&self) -> Vec<Message> {
        self.state.lock().await.log.messages().to_vec()
    }

    /// Number of requests still waiting on a resolution.
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Submit a chat message: optimistic append plus an asynchronous backend
    /// call whose result is merged back against the returned handle.
    ///
    /// Returns None for blank input (nothing is appended).
    pub async fn submit_chat(&self, text: &str) -> Option<MessageId> {
        let handle = self.begin_chat(text).await?;

        let message = text.trim().to_string();
        let state = Arc::clone(&self.state);
        let backend = Arc::clone(&self.chat_backend);
        let session_id = self.id.clone();

        tokio::spawn(async move {
            let result = backend.chat(&message).await;
            Self::merge_chat(&session_id, &state, handle, result).await;
        });

        Some(handle)
    }

    /// Append the user's message and a placeholder, registering the pending
    /// handle, without issuing the backend call.
    pub async fn begin_chat(&self, text: &str) -> Option<MessageId> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let mut state = self.state.lock().await;
        state.log.append(Sender::User, text);
        let handle = state.log.append(Sender::Bot, PROCESSING_MARKER);
        state.pending.insert(handle, PendingKind::Chat);

        debug!("Session {}: chat submitted (handle {:?})", self.id, handle);
        Some(handle)
    }

    /// Merge a chat result against its handle. Returns false when the handle
    /// was already resolved (or never existed) — the log is left untouched.
    pub async fn resolve_chat(
        &self,
        handle: MessageId,
        result: Result<ChatReply, BackendError>,
    ) -> bool {
        Self::merge_chat(&self.id, &self.state, handle, result).await
    }

    async fn merge_chat(
        session_id: &str,
        state: &Mutex<SessionState>,
        handle: MessageId,
        result: Result<ChatReply, BackendError>,
    ) -> bool {
        let mut state = state.lock().await;
        if state.pending.remove(&handle).is_none() {
            debug!(
                "Session {}: ignoring duplicate resolution for handle {:?}",
                session_id, handle
            );
            return false;
        }

        state.log.remove_where(|m| m.id == handle);

        match result {
            Ok(reply) => {
                state.log.append(Sender::Bot, reply.response);
            }
            Err(err) => {
                warn!("Session {}: chat request failed: {}", session_id, err);
                state.log.append(Sender::Bot, err.user_message());
            }
        }

        true
    }

    /// Submit a finalized recording for transcription. The placeholder is
    /// resolved with transcript, summary, action items and suggested
    /// questions — or a single error message.
    pub async fn submit_transcription(&self, payload: RecordingPayload) -> MessageId {
        let handle = self.begin_transcription().await;

        let state = Arc::clone(&self.state);
        let backend = Arc::clone(&self.transcription_backend);
        let session_id = self.id.clone();

        tokio::spawn(async move {
            let result = backend.transcribe(&payload).await;
            Self::merge_transcription(&session_id, &state, handle, result).await;
        });

        handle
    }

    /// Append the transcription placeholder and register its handle.
    pub async fn begin_transcription(&self) -> MessageId {
        let mut state = self.state.lock().await;
        let handle = state.log.append(Sender::Bot, PROCESSING_MARKER);
        state.pending.insert(handle, PendingKind::Transcription);

        info!(
            "Session {}: transcription submitted (handle {:?})",
            self.id, handle
        );
        handle
    }

    /// Merge a transcription result against its handle. Result messages are
    /// appended in fixed order: transcript, summary, action items, prompts.
    pub async fn resolve_transcription(
        &self,
        handle: MessageId,
        result: Result<TranscriptionResult, BackendError>,
    ) -> bool {
        Self::merge_transcription(&self.id, &self.state, handle, result).await
    }

    async fn merge_transcription(
        session_id: &str,
        state: &Mutex<SessionState>,
        handle: MessageId,
        result: Result<TranscriptionResult, BackendError>,
    ) -> bool {
        let mut state = state.lock().await;
        if state.pending.remove(&handle).is_none() {
            debug!(
                "Session {}: ignoring duplicate resolution for handle {:?}",
                session_id, handle
            );
            return false;
        }

        state.log.remove_where(|m| m.id == handle);

        match result {
            Ok(outcome) => {
                state.log.append(Sender::Bot, outcome.transcription);
                if !outcome.summary.is_empty() {
                    state.log.append(Sender::Bot, outcome.summary);
                }
                if !outcome.action_items.is_empty() {
                    state.log.append(Sender::Bot, outcome.action_items.join("\n"));
                }
                for question in outcome.suggested_questions {
                    state.log.append_prompt(question);
                }
            }
            Err(err) => {
                warn!(
                    "Session {}: transcription request failed: {}",
                    session_id, err
                );
                state.log.append(Sender::Bot, err.user_message());
            }
        }

        true
    }

    /// Select a suggested-question message: re-enters `submit_chat` with the
    /// question's text as a new user-originated request.
    ///
    /// Returns the new request's handle, or None when the id does not name a
    /// prompt message.
    pub async fn select_prompt(&self, id: MessageId) -> Option<MessageId> {
        let question = {
            let state = self.state.lock().await;
            match state.log.get(id) {
                Some(message) if message.is_prompt => message.content.clone(),
                _ => return None,
            }
        };

        self.submit_chat(&question).await
    }
}
