use thiserror::Error;

/// Failures talking to the external MedMentor backend.
///
/// All three cases surface to the patient as a single bot-authored error
/// message in the conversation log; they stay distinguishable here for
/// logging and tests.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No response was received at all (connect failure, timeout, DNS).
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// The server answered with a non-success status.
    #[error("backend rejected request (status {status}): {detail}")]
    Rejected { status: u16, detail: String },

    /// The server answered 2xx but the payload is missing expected fields.
    #[error("malformed backend response: {0}")]
    Malformed(String),
}

impl BackendError {
    /// The fixed chat message appended to the log for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            BackendError::Unreachable(_) => "Error: Server not reachable.",
            BackendError::Rejected { .. } => "Error: The server could not process your request.",
            BackendError::Malformed(_) => "Error: The server returned an unexpected response.",
        }
    }
}

/// Failures acquiring the audio capture resource.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Hardware or permission denied; the recorder stays idle.
    #[error("audio capture unavailable: {0}")]
    Unavailable(String),
}
