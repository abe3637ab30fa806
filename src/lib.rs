pub mod audio;
pub mod auth;
pub mod backend;
pub mod config;
pub mod conversation;
pub mod error;
pub mod http;
pub mod profile;
pub mod recording;

pub use audio::{
    encode_wav, AudioChunk, AudioFile, CaptureConfig, CaptureDevice, ChannelCapture, FileCapture,
    RecordingPayload,
};
pub use auth::{AuthSession, User};
pub use backend::{
    ApiClient, ChatBackend, ChatReply, PatientsBackend, TranscriptionBackend, TranscriptionResult,
};
pub use config::Config;
pub use conversation::{ConversationSession, Message, MessageId, MessageLog, Sender};
pub use error::{BackendError, CaptureError};
pub use http::{create_router, AppState};
pub use profile::{MemoryProfileStore, ProfileStore};
pub use recording::{RecorderState, RecordingController};
