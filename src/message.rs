//! Chat message model and the in-memory conversation store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a message within one [`MessageList`].
///
/// Ids are handed out by the list from a counter, so a larger id always
/// belongs to a later message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn display_name(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Bot => "Driver's Friend",
        }
    }
}

/// One chat turn half, as shown in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    pub source: Option<String>,
    pub url: Option<String>,
}

impl Message {
    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }

    /// Source label together with its link, if the backend named one.
    pub fn attribution(&self) -> Option<(&str, Option<&str>)> {
        self.source
            .as_deref()
            .map(|source| (source, self.url.as_deref()))
    }
}

/// Ordered, append-only list of messages for the active session.
///
/// The only in-place mutation allowed is [`MessageList::replace_text`] on a bot
/// message, which the reveal uses to grow the placeholder.
#[derive(Debug, Clone, Default)]
pub struct MessageList {
    messages: Vec<Message>,
    next_id: u64,
}

impl MessageList {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(
        &mut self,
        sender: Sender,
        text: String,
        source: Option<String>,
        url: Option<String>,
    ) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;

        // A link without a label has nothing to hang off.
        let url = if source.is_some() { url } else { None };

        self.messages.push(Message {
            id,
            text,
            sender,
            timestamp: Utc::now(),
            source,
            url,
        });
        id
    }

    /// Append a user message
    pub fn push_user(&mut self, text: impl Into<String>) -> MessageId {
        self.push(Sender::User, text.into(), None, None)
    }

    /// Append a complete bot message
    pub fn push_bot(&mut self, text: impl Into<String>) -> MessageId {
        self.push(Sender::Bot, text.into(), None, None)
    }

    /// Append an empty bot message that a reveal will fill in
    pub fn push_placeholder(&mut self, source: Option<String>, url: Option<String>) -> MessageId {
        self.push(Sender::Bot, String::new(), source, url)
    }

    /// Replace the text of the bot message with the given id.
    ///
    /// Returns `false` (and changes nothing) when the id is unknown or names a
    /// user message.
    pub fn replace_text(&mut self, id: MessageId, text: impl Into<String>) -> bool {
        match self.messages.iter_mut().rev().find(|m| m.id == id) {
            Some(message) if message.is_bot() => {
                message.text = text.into();
                true
            }
            _ => false,
        }
    }

    /// Remove every message. Ids keep increasing across clears.
    pub fn clear(&mut self) {
        self.messages.clear();
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
