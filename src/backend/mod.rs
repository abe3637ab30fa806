//! Client for the external MedMentor backend
//!
//! The session core talks to the backend through the `ChatBackend` and
//! `TranscriptionBackend` traits so tests can inject fakes; `ApiClient`
//! is the real HTTP implementation. Wire shapes mirror the backend's JSON
//! contracts.

mod client;
pub mod types;

pub use client::{ApiClient, ChatBackend, PatientsBackend, TranscriptionBackend};
pub use types::{ChatReply, ChatRequest, LoginRequest, RegisterReply, RegisterRequest, TranscriptionResult};
