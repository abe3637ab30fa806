use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::audio::RecordingPayload;
use crate::error::BackendError;

use super::types::{
    BackendErrorBody, ChatReply, ChatRequest, LoginRequest, RegisterReply, RegisterRequest,
    TranscriptionResult,
};

/// Chat collaborator boundary (POST /chat).
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, message: &str) -> Result<ChatReply, BackendError>;
}

/// Transcription collaborator boundary (POST /transcription).
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    async fn transcribe(&self, payload: &RecordingPayload)
        -> Result<TranscriptionResult, BackendError>;
}

/// Patient registration/login/profile boundary (/patients/*). The profile
/// contracts are opaque JSON.
#[async_trait]
pub trait PatientsBackend: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> Result<RegisterReply, BackendError>;
    async fn login(&self, request: &LoginRequest) -> Result<Value, BackendError>;
    async fn profile(&self, patient_id: &str) -> Result<Value, BackendError>;
}

/// HTTP client for the external MedMentor backend.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a response into the failure taxonomy: non-2xx → Rejected (with
    /// the backend's error body where it has one), undecodable 2xx →
    /// Malformed.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
        let status = response.status();

        if !status.is_success() {
            let detail = response
                .json::<BackendErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn chat(&self, message: &str) -> Result<ChatReply, BackendError> {
        debug!("Sending chat message ({} chars)", message.len());

        let response = self
            .http
            .post(self.url("/chat"))
            .json(&ChatRequest {
                message: message.to_string(),
            })
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        Self::decode(response).await
    }
}

#[async_trait]
impl TranscriptionBackend for ApiClient {
    async fn transcribe(
        &self,
        payload: &RecordingPayload,
    ) -> Result<TranscriptionResult, BackendError> {
        info!(
            "Uploading recording for transcription ({} bytes, {:.1}s)",
            payload.wav_bytes.len(),
            payload.duration_seconds
        );

        let part = multipart::Part::bytes(payload.wav_bytes.clone())
            .file_name(format!("{}.wav", payload.session_id))
            .mime_str("audio/wav")
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.url("/transcription"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        Self::decode(response).await
    }
}

#[async_trait]
impl PatientsBackend for ApiClient {
    async fn register(&self, request: &RegisterRequest) -> Result<RegisterReply, BackendError> {
        info!("Registering patient {}", request.email);

        let response = self
            .http
            .post(self.url("/patients/register"))
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        Self::decode(response).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<Value, BackendError> {
        info!("Logging in patient {}", request.email);

        let response = self
            .http
            .post(self.url("/patients/login"))
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        Self::decode(response).await
    }

    async fn profile(&self, patient_id: &str) -> Result<Value, BackendError> {
        let response = self
            .http
            .get(self.url("/patients/profile"))
            .query(&[("patient_id", patient_id)])
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        Self::decode(response).await
    }
}
