//! Plain-text chat messages as used by Ollama.

use serde::{Deserialize, Serialize};

use super::ensure_content;
use crate::{ContentPart, Error, Message};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    /// Base64 images for vision models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

/// Only image attachments can be sent natively; documents need
/// extracted-text delivery.
pub fn build(
    system: Option<&str>,
    history: &[Message],
    turn: &Message,
) -> Result<Vec<ChatMessage>, Error> {
    ensure_content(turn)?;

    let mut messages = Vec::with_capacity(history.len() + 2);
    if let Some(system) = system.filter(|s| !s.is_empty()) {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: system.to_string(),
            images: None,
        });
    }
    for message in history.iter().chain(std::iter::once(turn)) {
        messages.push(convert_message(message)?);
    }
    Ok(messages)
}

fn convert_message(message: &Message) -> Result<ChatMessage, Error> {
    let mut images = Vec::new();
    for part in &message.parts {
        if let ContentPart::Attachment { attachment } = part {
            if !attachment.is_image()? {
                return Err(Error::invalid_input(format!(
                    "'{}' cannot be sent natively to a text chat model; use extracted-text delivery",
                    attachment.filename()
                )));
            }
            images.push(attachment.data().to_string());
        }
    }

    Ok(ChatMessage {
        role: message.role.as_str().to_string(),
        content: message.text_content(),
        images: (!images.is_empty()).then_some(images),
    })
}
