//! HTTP API server for the patient-facing frontend
//!
//! This module provides a REST API for driving conversation sessions:
//! - POST /sessions - Create a session
//! - GET /sessions/:id/messages - Message log
//! - POST /sessions/:id/chat - Send a chat message
//! - POST /sessions/:id/prompts/:message_id - Select a suggested question
//! - POST /sessions/:id/record/{start,frame,stop} - Recording control
//! - POST /sessions/:id/notes/upload - Upload a visit recording
//! - /auth/* - Registration, login and profile
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::{AppState, SessionEntry};
