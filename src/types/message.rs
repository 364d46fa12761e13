use serde::{Deserialize, Serialize};

use super::attachment::Attachment;

/// A provider-neutral message with role and ordered content parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<ContentPart>,
}

/// One piece of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Attachment { attachment: Attachment },
}

impl Message {
    /// Create a new message with role and text content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Message {
            role,
            parts: vec![ContentPart::Text {
                text: content.into(),
            }],
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Add text content to this message.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(ContentPart::Text { text: text.into() });
        self
    }

    /// Add an attachment to this message.
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.parts.push(ContentPart::Attachment { attachment });
        self
    }

    /// Get the role of this message.
    pub fn role(&self) -> Role {
        self.role
    }

    /// All text parts joined with blank lines.
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::Attachment { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Attachments carried by this message, in order.
    pub fn attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.parts.iter().filter_map(|part| match part {
            ContentPart::Attachment { attachment } => Some(attachment),
            ContentPart::Text { .. } => None,
        })
    }

    /// Whether the message holds text only.
    pub fn is_text_only(&self) -> bool {
        self.parts
            .iter()
            .all(|part| matches!(part, ContentPart::Text { .. }))
    }
}

/// Role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Reason why generation finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
}

impl FinishReason {
    /// Normalize a vendor stop reason. Unknown reasons count as a normal stop.
    pub fn from_vendor(reason: &str) -> Self {
        match reason {
            "length" | "max_tokens" | "MAX_TOKENS" => FinishReason::Length,
            "content_filter" | "SAFETY" | "refusal" => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        }
    }
}
