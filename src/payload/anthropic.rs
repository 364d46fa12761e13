//! Anthropic Messages API content blocks.

use serde::Serialize;

use super::ensure_content;
use crate::{Attachment, ContentPart, Error, Message, Role};

/// Anthropic message format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnthropicMessage {
    pub role: String, // "user" or "assistant"
    pub content: Vec<AnthropicBlock>,
}

/// Anthropic content block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicBlock {
    Text { text: String },
    Image { source: Base64Source },
    Document { source: Base64Source },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Base64Source {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub media_type: String,
    pub data: String,
}

/// The system prompt travels outside the message list.
#[derive(Debug, Clone, PartialEq)]
pub struct AnthropicPayload {
    pub system: Option<String>,
    pub messages: Vec<AnthropicMessage>,
}

pub fn build(
    system: Option<&str>,
    history: &[Message],
    turn: &Message,
) -> Result<AnthropicPayload, Error> {
    ensure_content(turn)?;

    let messages = history
        .iter()
        .chain(std::iter::once(turn))
        .map(convert_message)
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(AnthropicPayload {
        system: system.filter(|s| !s.is_empty()).map(str::to_string),
        messages,
    })
}

fn convert_message(message: &Message) -> Result<AnthropicMessage, Error> {
    let role = match message.role {
        Role::Assistant => "assistant",
        Role::User | Role::System => "user",
    };

    let content = message
        .parts
        .iter()
        .map(|part| match part {
            ContentPart::Text { text } => Ok(AnthropicBlock::Text { text: text.clone() }),
            ContentPart::Attachment { attachment } => attachment_block(attachment),
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(AnthropicMessage {
        role: role.to_string(),
        content,
    })
}

fn attachment_block(attachment: &Attachment) -> Result<AnthropicBlock, Error> {
    let source = Base64Source {
        kind: "base64",
        media_type: attachment.mime_type()?.essence_str().to_string(),
        data: attachment.data().to_string(),
    };
    if attachment.is_image()? {
        Ok(AnthropicBlock::Image { source })
    } else {
        Ok(AnthropicBlock::Document { source })
    }
}
