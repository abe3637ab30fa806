//! Conversation session management
//!
//! This module provides the session core driving the chatbot and
//! clinical-notes flows:
//! - `MessageLog`: ordered, append-only chat history with placeholder
//!   replacement
//! - `ConversationSession`: optimistic appends reconciled against
//!   asynchronous backend results, exactly once per request

mod log;
mod message;
mod session;

pub use log::MessageLog;
pub use message::{Message, MessageId, Sender};
pub use session::{ConversationSession, PendingKind, GREETING, PROCESSING_MARKER};
