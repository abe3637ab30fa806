use serde::{Deserialize, Serialize};

/// Request body for POST /chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Successful chat reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

/// Successful transcription result for an uploaded visit recording.
///
/// `transcription` and `summary` are required; a response missing them is
/// treated as malformed. The lists default to empty when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub transcription: String,
    pub summary: String,
    #[serde(default)]
    pub action_items: Vec<String>,
    #[serde(default)]
    pub suggested_questions: Vec<String>,
}

/// Request body for POST /patients/register.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Date of birth, "YYYY-MM-DD".
    pub dob: String,
    pub chronic_disease: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_since_diagnosis: Option<u32>,
}

/// Successful registration reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterReply {
    pub message: String,
    pub patient_id: String,
}

/// Request body for POST /patients/login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Error body every backend endpoint returns on failure.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendErrorBody {
    pub error: String,
}
