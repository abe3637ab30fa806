// Integration tests for the conversation session
//
// These drive the optimistic-append / async-merge contract: exactly one
// placeholder per request, exactly one resolution per handle, isolation
// between concurrent handles, and the fixed ordering of transcription
// results and suggested questions.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use medmentor::conversation::PROCESSING_MARKER;
use medmentor::{
    BackendError, ChatBackend, ChatReply, ConversationSession, MessageId, RecordingPayload,
    Sender, TranscriptionBackend, TranscriptionResult,
};
use tokio::sync::{Mutex, Notify};

// ============================================================================
// Fakes
// ============================================================================

/// Chat backend that pops scripted results in order; defaults to an echo
/// reply when the script runs dry.
struct ScriptedChat {
    replies: Mutex<VecDeque<Result<ChatReply, BackendError>>>,
}

impl ScriptedChat {
    fn new(replies: Vec<Result<ChatReply, BackendError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
        })
    }
}

#[async_trait]
impl ChatBackend for ScriptedChat {
    async fn chat(&self, message: &str) -> Result<ChatReply, BackendError> {
        self.replies.lock().await.pop_front().unwrap_or_else(|| {
            Ok(ChatReply {
                response: format!("echo: {}", message),
            })
        })
    }
}

/// Chat backend that blocks until the test releases it, so assertions can
/// run while the request is still in flight.
struct GatedChat {
    gate: Notify,
    reply: String,
}

impl GatedChat {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            gate: Notify::new(),
            reply: reply.to_string(),
        })
    }

    fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl ChatBackend for GatedChat {
    async fn chat(&self, _message: &str) -> Result<ChatReply, BackendError> {
        self.gate.notified().await;
        Ok(ChatReply {
            response: self.reply.clone(),
        })
    }
}

/// Transcription backend for sessions that never submit one.
struct NoTranscription;

#[async_trait]
impl TranscriptionBackend for NoTranscription {
    async fn transcribe(
        &self,
        _payload: &RecordingPayload,
    ) -> Result<TranscriptionResult, BackendError> {
        Err(BackendError::Malformed("not under test".into()))
    }
}

fn chat_session(chat: Arc<dyn ChatBackend>) -> ConversationSession {
    ConversationSession::new("session-test", chat, Arc::new(NoTranscription))
}

fn resolve_only_session() -> ConversationSession {
    chat_session(ScriptedChat::new(Vec::new()))
}

/// Wait until no requests are pending.
async fn settle(session: &ConversationSession) {
    for _ in 0..200 {
        if session.pending_count().await == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("Session did not settle");
}

// ============================================================================
// Chat
// ============================================================================

#[tokio::test]
async fn test_new_session_opens_with_greeting() {
    let session = resolve_only_session();

    let messages = session.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender, Sender::Bot);
    assert_eq!(messages[0].content, "How can I assist you today?");
}

#[tokio::test]
async fn test_begin_chat_appends_user_message_and_placeholder() {
    let session = resolve_only_session();

    let handle = session.begin_chat("Hi").await.expect("handle");

    let messages = session.messages().await;
    assert_eq!(messages.len(), 3); // greeting + user + placeholder
    assert_eq!(messages[1].sender, Sender::User);
    assert_eq!(messages[1].content, "Hi");
    assert_eq!(messages[2].id, handle);
    assert_eq!(messages[2].sender, Sender::Bot);
    assert_eq!(messages[2].content, PROCESSING_MARKER);
    assert_eq!(session.pending_count().await, 1);
}

#[tokio::test]
async fn test_blank_chat_is_rejected_without_appending() {
    let session = resolve_only_session();

    assert!(session.submit_chat("   ").await.is_none());

    assert_eq!(session.messages().await.len(), 1);
    assert_eq!(session.pending_count().await, 0);
}

#[tokio::test]
async fn test_chat_success_replaces_placeholder() {
    let session = resolve_only_session();
    let handle = session.begin_chat("Hi").await.unwrap();

    let resolved = session
        .resolve_chat(
            handle,
            Ok(ChatReply {
                response: "Hello!".to_string(),
            }),
        )
        .await;
    assert!(resolved);

    let messages = session.messages().await;
    let tail: Vec<(Sender, &str)> = messages[messages.len() - 2..]
        .iter()
        .map(|m| (m.sender, m.content.as_str()))
        .collect();
    assert_eq!(tail, vec![(Sender::User, "Hi"), (Sender::Bot, "Hello!")]);

    assert!(
        messages.iter().all(|m| m.id != handle),
        "Placeholder must be gone"
    );
    assert_eq!(session.pending_count().await, 0);
}

#[tokio::test]
async fn test_chat_network_failure_appends_fixed_error() {
    let session = resolve_only_session();
    let handle = session.begin_chat("Hi").await.unwrap();

    session
        .resolve_chat(handle, Err(BackendError::Unreachable("refused".into())))
        .await;

    let messages = session.messages().await;
    let last = messages.last().unwrap();
    assert_eq!(last.sender, Sender::Bot);
    assert_eq!(last.content, "Error: Server not reachable.");
}

#[tokio::test]
async fn test_failure_taxonomy_stays_distinguishable() {
    let session = resolve_only_session();

    let rejected = session.begin_chat("one").await.unwrap();
    session
        .resolve_chat(
            rejected,
            Err(BackendError::Rejected {
                status: 500,
                detail: "API request failed".into(),
            }),
        )
        .await;

    let malformed = session.begin_chat("two").await.unwrap();
    session
        .resolve_chat(malformed, Err(BackendError::Malformed("missing field".into())))
        .await;

    let messages = session.messages().await;
    let texts: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert!(texts.contains(&"Error: The server could not process your request."));
    assert!(texts.contains(&"Error: The server returned an unexpected response."));
}

#[tokio::test]
async fn test_handle_resolves_exactly_once() {
    let session = resolve_only_session();
    let handle = session.begin_chat("Hi").await.unwrap();

    assert!(
        session
            .resolve_chat(handle, Ok(ChatReply { response: "first".into() }))
            .await
    );

    let snapshot: Vec<String> = session
        .messages()
        .await
        .iter()
        .map(|m| m.content.clone())
        .collect();

    // A second resolution for the same handle is a no-op, whatever it carries.
    assert!(
        !session
            .resolve_chat(handle, Ok(ChatReply { response: "second".into() }))
            .await
    );
    assert!(
        !session
            .resolve_chat(handle, Err(BackendError::Unreachable("late".into())))
            .await
    );

    let after: Vec<String> = session
        .messages()
        .await
        .iter()
        .map(|m| m.content.clone())
        .collect();
    assert_eq!(snapshot, after);
}

#[tokio::test]
async fn test_concurrent_handles_resolve_independently() {
    let session = resolve_only_session();

    let first = session.begin_chat("first question").await.unwrap();
    let second = session.begin_chat("second question").await.unwrap();
    assert_ne!(first, second);
    assert_eq!(session.pending_count().await, 2);

    // Completions arrive out of issuance order.
    session
        .resolve_chat(second, Ok(ChatReply { response: "second answer".into() }))
        .await;

    let messages = session.messages().await;
    assert!(
        messages.iter().any(|m| m.id == first),
        "Resolving one handle must not touch the other's placeholder"
    );
    assert_eq!(session.pending_count().await, 1);

    session
        .resolve_chat(first, Ok(ChatReply { response: "first answer".into() }))
        .await;

    // Append order is completion order.
    let messages = session.messages().await;
    let texts: Vec<&str> = messages
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    let second_pos = texts.iter().position(|t| *t == "second answer").unwrap();
    let first_pos = texts.iter().position(|t| *t == "first answer").unwrap();
    assert!(second_pos < first_pos);
    assert_eq!(session.pending_count().await, 0);
}

#[tokio::test]
async fn test_submit_chat_full_async_path() {
    let chat = ScriptedChat::new(vec![Ok(ChatReply {
        response: "Hello!".to_string(),
    })]);
    let session = chat_session(chat);

    session.submit_chat("Hi").await.expect("handle");
    settle(&session).await;

    let messages = session.messages().await;
    let tail: Vec<(Sender, &str)> = messages[messages.len() - 2..]
        .iter()
        .map(|m| (m.sender, m.content.as_str()))
        .collect();
    assert_eq!(tail, vec![(Sender::User, "Hi"), (Sender::Bot, "Hello!")]);
}

#[tokio::test]
async fn test_concurrent_submits_full_async_path() {
    let chat = ScriptedChat::new(Vec::new());
    let session = Arc::new(chat_session(chat));

    let submits = futures::future::join_all(
        (0..4).map(|i| {
            let session = Arc::clone(&session);
            async move { session.submit_chat(&format!("question {}", i)).await }
        }),
    )
    .await;

    assert!(submits.iter().all(Option::is_some));
    settle(&session).await;

    // greeting + 4 * (user + reply)
    let messages = session.messages().await;
    assert_eq!(messages.len(), 9);
    assert_eq!(messages.iter().filter(|m| m.sender == Sender::User).count(), 4);
}

// ============================================================================
// Transcription
// ============================================================================

fn transcription_result() -> TranscriptionResult {
    TranscriptionResult {
        transcription: "Doctor: Hello.\nYou: My sugar runs high in the mornings.".to_string(),
        summary: "Morning hyperglycemia discussed.".to_string(),
        action_items: vec![
            "Check fasting glucose daily".to_string(),
            "Review insulin dose next visit".to_string(),
        ],
        suggested_questions: vec!["Q1".to_string(), "Q2".to_string()],
    }
}

#[tokio::test]
async fn test_transcription_success_appends_in_fixed_order() {
    let session = resolve_only_session();
    let before = session.messages().await.len();

    let handle = session.begin_transcription().await;
    session
        .resolve_transcription(handle, Ok(transcription_result()))
        .await;

    let messages = session.messages().await;
    let appended = &messages[before..];
    assert_eq!(appended.len(), 5);

    assert!(appended[0].content.contains("sugar runs high"));
    assert_eq!(appended[1].content, "Morning hyperglycemia discussed.");
    assert!(appended[2].content.contains("Check fasting glucose daily"));

    // Prompts come last, in the order the backend gave them.
    assert_eq!(appended[3].content, "Q1");
    assert_eq!(appended[4].content, "Q2");
    assert!(appended[3].is_prompt && appended[4].is_prompt);
    assert!(appended[..3].iter().all(|m| !m.is_prompt));
    assert!(appended.iter().all(|m| m.sender == Sender::Bot));
}

#[tokio::test]
async fn test_transcription_failure_appends_single_error() {
    let session = resolve_only_session();
    let before = session.messages().await.len();

    let handle = session.begin_transcription().await;
    session
        .resolve_transcription(handle, Err(BackendError::Unreachable("down".into())))
        .await;

    let messages = session.messages().await;
    assert_eq!(messages.len(), before + 1);
    assert_eq!(messages.last().unwrap().content, "Error: Server not reachable.");
}

#[tokio::test]
async fn test_select_prompt_resubmits_question_before_resolution() {
    let gated = GatedChat::new("Answer to Q1");
    let session = chat_session(gated.clone());

    let handle = session.begin_transcription().await;
    session
        .resolve_transcription(handle, Ok(transcription_result()))
        .await;

    let prompt_id = session
        .messages()
        .await
        .iter()
        .find(|m| m.is_prompt && m.content == "Q1")
        .map(|m| m.id)
        .expect("prompt message");

    session.select_prompt(prompt_id).await.expect("new handle");

    // The question is already in the log as a user message while the
    // request is still in flight.
    let messages = session.messages().await;
    assert!(messages
        .iter()
        .any(|m| m.sender == Sender::User && m.content == "Q1"));
    assert_eq!(session.pending_count().await, 1);

    gated.release();
    settle(&session).await;

    assert_eq!(
        session.messages().await.last().unwrap().content,
        "Answer to Q1"
    );
}

#[tokio::test]
async fn test_select_prompt_rejects_non_prompt_messages() {
    let session = resolve_only_session();
    let ordinary = session.begin_chat("plain").await.unwrap();

    let before = session.messages().await.len();
    assert!(session.select_prompt(ordinary).await.is_none());
    assert!(session.select_prompt(MessageId(9999)).await.is_none());
    assert_eq!(session.messages().await.len(), before);
}
