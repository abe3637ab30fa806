use super::state::AppState;
use crate::audio::{encode_wav, AudioChunk, AudioFile, CaptureDevice, ChannelCapture, FileCapture};
use crate::auth::User;
use crate::backend::{LoginRequest, RegisterRequest};
use crate::conversation::{Message, MessageId};
use crate::error::BackendError;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatSendRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub session_id: String,
    /// Placeholder id of the in-flight request.
    pub handle: MessageId,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct StartRecordingRequest {
    /// Optional audio file to replay as the capture source; frames arrive
    /// over POST .../record/frame otherwise.
    pub source_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordFrameRequest {
    /// Base64-encoded PCM bytes (i16 little-endian, interleaved)
    pub pcm: String,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub timestamp_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct RecordingStatusResponse {
    pub session_id: String,
    pub status: String,
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct DiagnosesRequest {
    pub diagnoses: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn not_found(session_id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Session {} not found", session_id),
        }),
    )
        .into_response()
}

/// Map a backend failure onto our own response: rejected statuses pass
/// through, transport/decoding failures become 502.
fn backend_error(err: BackendError) -> Response {
    let status = match &err {
        BackendError::Rejected { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        _ => StatusCode::BAD_GATEWAY,
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Session Handlers
// ============================================================================

/// POST /sessions
/// Create a new conversation session
pub async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let entry = state.create_session().await;

    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: entry.conversation.id().to_string(),
            status: "created".to_string(),
        }),
    )
}

/// DELETE /sessions/:session_id
/// Drop a session
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.remove_session(&session_id).await {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(&session_id),
    }
}

/// GET /sessions/:session_id/messages
/// Get the full message log in display order
pub async fn get_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.get_session(&session_id).await {
        Some(entry) => {
            let messages: Vec<Message> = entry.conversation.messages().await;
            (StatusCode::OK, Json(messages)).into_response()
        }
        None => not_found(&session_id),
    }
}

/// POST /sessions/:session_id/chat
/// Submit a chat message
pub async fn send_chat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<ChatSendRequest>,
) -> Response {
    let Some(entry) = state.get_session(&session_id).await else {
        return not_found(&session_id);
    };

    match entry.conversation.submit_chat(&req.message).await {
        Some(handle) => (
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                session_id,
                handle,
                status: "processing".to_string(),
            }),
        )
            .into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "No message provided.".to_string(),
            }),
        )
            .into_response(),
    }
}

/// POST /sessions/:session_id/prompts/:message_id
/// Select a suggested question, re-submitting it as a chat message
pub async fn select_prompt(
    State(state): State<AppState>,
    Path((session_id, message_id)): Path<(String, u64)>,
) -> Response {
    let Some(entry) = state.get_session(&session_id).await else {
        return not_found(&session_id);
    };

    match entry.conversation.select_prompt(MessageId(message_id)).await {
        Some(handle) => (
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                session_id,
                handle,
                status: "processing".to_string(),
            }),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Message {} is not a suggested question", message_id),
            }),
        )
            .into_response(),
    }
}

// ============================================================================
// Recording Handlers
// ============================================================================

/// POST /sessions/:session_id/record/start
/// Start recording for a session
pub async fn start_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Option<Json<StartRecordingRequest>>,
) -> Response {
    let Some(entry) = state.get_session(&session_id).await else {
        return not_found(&session_id);
    };

    let device: Box<dyn CaptureDevice> = match body.and_then(|Json(req)| req.source_path) {
        Some(path) => Box::new(FileCapture::new(path, state.capture.clone())),
        None => Box::new(ChannelCapture::default()),
    };

    let mut recorder = entry.recorder.lock().await;
    match recorder.start(device).await {
        Ok(()) => {
            info!("Recording started for session {}", session_id);
            (
                StatusCode::OK,
                Json(RecordingStatusResponse {
                    session_id,
                    status: "recording".to_string(),
                    duration_seconds: None,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to start recording: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// POST /sessions/:session_id/record/frame
/// Feed one captured audio frame (base64 PCM) into the recorder
pub async fn push_frame(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<RecordFrameRequest>,
) -> Response {
    let Some(entry) = state.get_session(&session_id).await else {
        return not_found(&session_id);
    };

    let pcm = match base64::engine::general_purpose::STANDARD.decode(&req.pcm) {
        Ok(bytes) => bytes,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("Invalid base64 PCM: {}", e),
                }),
            )
                .into_response();
        }
    };

    let samples: Vec<i16> = pcm
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    let chunk = AudioChunk {
        samples,
        sample_rate: req.sample_rate.unwrap_or(state.capture.sample_rate),
        channels: req.channels.unwrap_or(state.capture.channels),
        timestamp_ms: req.timestamp_ms.unwrap_or(0),
    };

    entry.recorder.lock().await.on_chunk(chunk).await;

    (
        StatusCode::OK,
        Json(RecordingStatusResponse {
            session_id,
            status: "recording".to_string(),
            duration_seconds: None,
        }),
    )
        .into_response()
}

/// POST /sessions/:session_id/record/stop
/// Stop recording; the finalized payload is submitted for transcription
pub async fn stop_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let Some(entry) = state.get_session(&session_id).await else {
        return not_found(&session_id);
    };

    let mut recorder = entry.recorder.lock().await;
    match recorder.stop().await {
        Ok(Some(payload)) => {
            info!("Recording stopped for session {}", session_id);
            (
                StatusCode::OK,
                Json(RecordingStatusResponse {
                    session_id,
                    status: "stopped".to_string(),
                    duration_seconds: Some(payload.duration_seconds),
                }),
            )
                .into_response()
        }
        Ok(None) => (
            StatusCode::OK,
            Json(RecordingStatusResponse {
                session_id,
                status: "idle".to_string(),
                duration_seconds: None,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to stop recording: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to finalize recording: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /sessions/:session_id/notes/upload
/// Upload a visit recording (any supported audio format) for transcription
pub async fn upload_notes(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let Some(entry) = state.get_session(&session_id).await else {
        return not_found(&session_id);
    };

    let mut upload: Option<(Option<String>, Vec<u8>)> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let file_name = field.file_name().map(|s| s.to_string());
                match field.bytes().await {
                    Ok(bytes) => {
                        upload = Some((file_name, bytes.to_vec()));
                        break;
                    }
                    Err(e) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(ErrorResponse {
                                error: format!("Failed to read upload: {}", e),
                            }),
                        )
                            .into_response();
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: format!("Invalid multipart body: {}", e),
                    }),
                )
                    .into_response();
            }
        }
    }

    let Some((file_name, bytes)) = upload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Missing file field".to_string(),
            }),
        )
            .into_response();
    };

    let audio = match AudioFile::decode_bytes(bytes, file_name.as_deref()) {
        Ok(audio) => audio,
        Err(e) => {
            warn!("Rejected upload for session {}: {:#}", session_id, e);
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    error: format!("Could not decode audio: {}", e),
                }),
            )
                .into_response();
        }
    };

    let chunk = AudioChunk {
        sample_rate: audio.sample_rate,
        channels: audio.channels,
        timestamp_ms: 0,
        samples: audio.samples,
    };

    let payload = match encode_wav(&session_id, &[chunk]) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Failed to encode upload for session {}: {:#}", session_id, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to encode audio: {}", e),
                }),
            )
                .into_response();
        }
    };

    let handle = entry.conversation.submit_transcription(payload).await;

    (
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            session_id,
            handle,
            status: "processing".to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Auth/Profile Handlers
// ============================================================================

/// POST /auth/register
/// Register a patient with the backend and seed the local profile document
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Response {
    match state.patients_backend.register(&req).await {
        Ok(reply) => {
            let document = serde_json::json!({
                "patient_id": reply.patient_id,
                "name": req.name,
                "email": req.email,
                "dob": req.dob,
                "gender": req.gender,
                "chronic_disease": req.chronic_disease,
                "years_since_diagnosis": req.years_since_diagnosis,
                "diagnoses": [],
            });
            state.profiles.set(&reply.patient_id, document).await;

            (StatusCode::CREATED, Json(reply)).into_response()
        }
        Err(e) => backend_error(e),
    }
}

/// POST /auth/login
/// Log in against the backend and mark the session signed in
pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Response {
    match state.patients_backend.login(&req).await {
        Ok(profile) => {
            let field = |key: &str| {
                profile
                    .get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };

            let user = User {
                patient_id: field("patient_id"),
                email: req.email.clone(),
                name: field("name"),
            };

            state.profiles.merge(&user.patient_id, profile.clone()).await;
            state.auth.sign_in(user);

            (StatusCode::OK, Json(profile)).into_response()
        }
        Err(e) => backend_error(e),
    }
}

/// POST /auth/logout
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    state.auth.sign_out();
    StatusCode::NO_CONTENT
}

/// GET /auth/profile
/// Fetch the signed-in patient's profile (local document, backend fallback)
pub async fn get_profile(State(state): State<AppState>) -> Response {
    let Some(user) = state.auth.current_user() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Not signed in".to_string(),
            }),
        )
            .into_response();
    };

    if let Some(document) = state.profiles.get(&user.patient_id).await {
        return (StatusCode::OK, Json(document)).into_response();
    }

    match state.patients_backend.profile(&user.patient_id).await {
        Ok(profile) => {
            state.profiles.set(&user.patient_id, profile.clone()).await;
            (StatusCode::OK, Json(profile)).into_response()
        }
        Err(e) => backend_error(e),
    }
}

/// PATCH /auth/profile
/// Partial-field update of the signed-in patient's profile
pub async fn update_profile(State(state): State<AppState>, Json(fields): Json<Value>) -> Response {
    let Some(user) = state.auth.current_user() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Not signed in".to_string(),
            }),
        )
            .into_response();
    };

    state.profiles.merge(&user.patient_id, fields).await;

    match state.profiles.get(&user.patient_id).await {
        Some(document) => (StatusCode::OK, Json(document)).into_response(),
        None => (StatusCode::OK, Json(Value::Null)).into_response(),
    }
}

/// POST /auth/profile/diagnoses
/// Append diagnoses to the profile's list, skipping ones already present
pub async fn add_diagnoses(
    State(state): State<AppState>,
    Json(req): Json<DiagnosesRequest>,
) -> Response {
    let Some(user) = state.auth.current_user() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Not signed in".to_string(),
            }),
        )
            .into_response();
    };

    let values = req.diagnoses.into_iter().map(Value::String).collect();
    state
        .profiles
        .array_union(&user.patient_id, "diagnoses", values)
        .await;

    match state.profiles.get(&user.patient_id).await {
        Some(document) => (StatusCode::OK, Json(document)).into_response(),
        None => (StatusCode::OK, Json(Value::Null)).into_response(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
