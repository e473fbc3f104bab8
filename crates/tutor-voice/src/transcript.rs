//! Append-only conversation transcript fed to the display layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One finalized exchange entry. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    /// Emotion tag carried by assistant replies; `None` for user messages
    /// and for error-indicator entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            emotion: None,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>, emotion: Option<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            emotion,
            timestamp: Utc::now(),
        }
    }
}

/// Ordered record of the session's messages. Append-only for the lifetime of
/// the session; never reordered.
#[derive(Debug, Default)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one message. O(1); insertion order is chronological order.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Full ordered copy for rendering. The display layer gets its own clone
    /// and cannot mutate the log through it.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order() {
        let mut log = ConversationLog::new();
        log.append(Message::user("hello"));
        log.append(Message::assistant("hi there", Some("happy".into())));
        log.append(Message::user("bye"));

        let snapshot = log.snapshot();
        assert_eq!(log.len(), 3);
        assert_eq!(snapshot[0].text, "hello");
        assert_eq!(snapshot[1].text, "hi there");
        assert_eq!(snapshot[2].text, "bye");
        assert_eq!(snapshot[0].role, Role::User);
        assert_eq!(snapshot[1].role, Role::Assistant);
    }

    #[test]
    fn snapshot_is_detached() {
        let mut log = ConversationLog::new();
        log.append(Message::user("one"));
        let mut snapshot = log.snapshot();
        snapshot.clear();
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn roles_serialize_lowercase() {
        let msg = Message::assistant("Good job!", Some("happy".into()));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["emotion"], "happy");
    }

    #[test]
    fn missing_emotion_is_omitted() {
        let json = serde_json::to_value(Message::user("hello")).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("emotion").is_none());
    }
}
