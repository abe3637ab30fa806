use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier for a message within one session, assigned at append time.
///
/// Ids are unique per session and never reused, which lets a pending
/// request keep a stable reference to its placeholder message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

/// Who authored a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// A single chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,

    pub sender: Sender,

    /// Text payload; may be multi-line (e.g. a full visit transcript).
    pub content: String,

    /// Marks a suggested follow-up question rendered as a clickable control
    /// rather than plain transcript text.
    pub is_prompt: bool,

    /// When this message was appended.
    pub timestamp: DateTime<Utc>,
}
