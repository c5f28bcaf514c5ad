use chrono::Utc;
use serde::{ Serialize, Deserialize };
use std::fmt;
use uuid::Uuid;

pub const DEFAULT_TITLE: &str = "New Chat";
const TITLE_MAX_CHARS: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A stored chat. Serialized with the same field names the browser client
/// used for its snapshot, so existing exports load unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Last `n` messages, oldest first.
    pub fn context_window(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn is_first_exchange(&self) -> bool {
        self.messages.len() == 2
    }

    /// Title from the first user message, cut at 50 characters.
    pub fn derive_title(&mut self) {
        let first = self.messages.iter().find(|m| m.role == Role::User);
        self.title = match first {
            Some(m) => title_from(&m.content),
            None => DEFAULT_TITLE.to_string(),
        };
    }
}

fn title_from(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return DEFAULT_TITLE.to_string();
    }
    if trimmed.chars().count() > TITLE_MAX_CHARS {
        let cut: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", cut)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_conversation_has_default_title() {
        let conv = Conversation::new();
        assert_eq!(conv.title, DEFAULT_TITLE);
        assert!(conv.messages.is_empty());
        assert_ne!(conv.id, Conversation::new().id);
    }

    #[test]
    fn title_is_truncated_to_fifty_chars() {
        let mut conv = Conversation::new();
        conv.push(Message::user("a".repeat(80)));
        conv.push(Message::assistant("ok"));
        conv.derive_title();
        assert_eq!(conv.title, format!("{}...", "a".repeat(50)));
    }

    #[test]
    fn short_title_is_kept_whole() {
        let mut conv = Conversation::new();
        conv.push(Message::user("What is photosynthesis?"));
        conv.push(Message::assistant("Let's think."));
        assert!(conv.is_first_exchange());
        conv.derive_title();
        assert_eq!(conv.title, "What is photosynthesis?");
    }

    #[test]
    fn context_window_takes_most_recent() {
        let mut conv = Conversation::new();
        for i in 0..5 {
            conv.push(Message::user(format!("m{}", i)));
        }
        let ctx: Vec<_> = conv.context_window(3).iter().map(|m| m.content.as_str()).collect();
        assert_eq!(ctx, vec!["m2", "m3", "m4"]);
        assert_eq!(conv.context_window(10).len(), 5);
    }

    #[test]
    fn snapshot_uses_created_at_camel_case() {
        let conv = Conversation::new();
        let json = serde_json::to_value(&conv).unwrap();
        assert!(json.get("createdAt").is_some());
        let msg = serde_json::to_value(Message::assistant("x")).unwrap();
        assert_eq!(msg["role"], "assistant");
    }
}
