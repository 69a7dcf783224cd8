//! Chat messages as they arrive from clients, and the history transcript.

use crate::error::{Result, SvarError};
use serde::{Deserialize, Serialize};

/// Who sent a message. Anything that is not `user` is treated as the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(other)]
    Assistant,
}

/// One part of a message. Only text parts carry meaning here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessagePart {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// A client message: a role and a list of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl ChatMessage {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![MessagePart::Text { text: text.into() }],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    fn text_parts(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            MessagePart::Text { text } => Some(text.as_str()),
            MessagePart::Other => None,
        })
    }

    /// All text parts joined by newlines.
    pub fn text(&self) -> String {
        self.text_parts().collect::<Vec<_>>().join("\n")
    }

    /// The first text part, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.text_parts().next()
    }
}

/// One turn of conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

impl From<&ChatMessage> for Turn {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role,
            text: message.text(),
        }
    }
}

/// Split a message list into prior history and the current question.
///
/// The question is the first text part of the last message, trimmed.
pub fn split_messages(messages: &[ChatMessage]) -> Result<(Vec<Turn>, String)> {
    let (last, earlier) = messages
        .split_last()
        .ok_or_else(|| SvarError::EmptyInput("No messages provided".to_string()))?;

    let question = last.first_text().map(str::trim).unwrap_or_default();
    if question.is_empty() {
        return Err(SvarError::EmptyInput("Empty question".to_string()));
    }

    Ok((earlier.iter().map(Turn::from).collect(), question.to_string()))
}

/// Render history as role-prefixed lines for the reformulator.
pub fn format_transcript(history: &[Turn]) -> String {
    history
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                Role::User => "Human",
                Role::Assistant => "Assistant",
            };
            format!("{}: {}", speaker, turn.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_deserialize_from_client_json() {
        let messages: Vec<ChatMessage> = serde_json::from_str(
            r#"[
                {"id": "1", "role": "user", "parts": [{"type": "text", "text": "Hi"}]},
                {"id": "2", "role": "assistant", "parts": [
                    {"type": "step-start"},
                    {"type": "text", "text": "Hello!"},
                    {"type": "text", "text": "How can I help?"}
                ]},
                {"id": "3", "role": "system", "parts": []}
            ]"#,
        )
        .unwrap();

        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].parts[0], MessagePart::Other);
        assert_eq!(messages[1].text(), "Hello!\nHow can I help?");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[2].first_text(), None);
    }

    #[test]
    fn test_transcript_format() {
        let history = vec![
            Turn::user("I want to study in Finland"),
            Turn::assistant("Great choice."),
        ];
        assert_eq!(
            format_transcript(&history),
            "Human: I want to study in Finland\nAssistant: Great choice."
        );
        assert_eq!(format_transcript(&[]), "");
    }

    #[test]
    fn test_split_messages() {
        let messages = vec![
            ChatMessage::user("Tell me about Finland"),
            ChatMessage::assistant("Finland has free tuition for some programs."),
            ChatMessage::user("  How much does it cost?  "),
        ];

        let (history, question) = split_messages(&messages).unwrap();
        assert_eq!(question, "How much does it cost?");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Assistant);
    }

    #[test]
    fn test_split_messages_rejects_empty_input() {
        let err = split_messages(&[]).unwrap_err();
        assert!(matches!(err, SvarError::EmptyInput(ref m) if m == "No messages provided"));

        let err = split_messages(&[ChatMessage::user("   ")]).unwrap_err();
        assert!(matches!(err, SvarError::EmptyInput(ref m) if m == "Empty question"));

        let no_text = ChatMessage {
            role: Role::User,
            parts: vec![MessagePart::Other],
        };
        assert!(split_messages(&[no_text]).is_err());
    }
}
