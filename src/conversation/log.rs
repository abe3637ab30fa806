use chrono::Utc;

use super::message::{Message, MessageId, Sender};

/// Ordered, append-only sequence of chat turns.
///
/// Insertion order is display order. Entries are only ever mutated through
/// `replace` (the placeholder-swap rule) or dropped through `remove_where`;
/// a message's id and sender are otherwise fixed at append time.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    next_id: u64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the end of the log, returning its assigned id.
    pub fn append(&mut self, sender: Sender, content: impl Into<String>) -> MessageId {
        self.push(sender, content, false)
    }

    /// Append a suggested follow-up question (bot-authored, clickable).
    pub fn append_prompt(&mut self, content: impl Into<String>) -> MessageId {
        self.push(Sender::Bot, content, true)
    }

    fn push(&mut self, sender: Sender, content: impl Into<String>, is_prompt: bool) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;

        self.messages.push(Message {
            id,
            sender,
            content: content.into(),
            is_prompt,
            timestamp: Utc::now(),
        });

        id
    }

    /// Overwrite the content (and optionally the sender) of the message with
    /// the given id.
    ///
    /// Returns false without touching the log when no such id exists, so a
    /// late replacement for an already-resolved placeholder stays a no-op.
    pub fn replace(
        &mut self,
        id: MessageId,
        content: impl Into<String>,
        sender: Option<Sender>,
    ) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.content = content.into();
                if let Some(sender) = sender {
                    message.sender = sender;
                }
                true
            }
            None => false,
        }
    }

    /// Remove all messages matching the predicate, returning how many were
    /// dropped. Safe to call when nothing matches.
    pub fn remove_where(&mut self, predicate: impl Fn(&Message) -> bool) -> usize {
        let before = self.messages.len();
        self.messages.retain(|m| !predicate(m));
        before - self.messages.len()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
