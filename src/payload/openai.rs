//! OpenAI-style multimodal chat messages (also used by OpenRouter and Cerebras).

use serde::{Deserialize, Serialize};

use super::ensure_content;
use crate::{Attachment, ContentPart, Error, Message};

/// One chat-completions message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAIMessage {
    pub role: String,
    pub content: OpenAIContent,
}

/// Plain string for text-only messages, a parts array otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpenAIContent {
    Text(String),
    Parts(Vec<OpenAIPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpenAIPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
    File { file: FileData },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileData {
    pub filename: String,
    /// `data:` URL carrying the base64 payload.
    pub file_data: String,
}

/// Build the full message list: system, history, then the new turn.
pub fn build(
    system: Option<&str>,
    history: &[Message],
    turn: &Message,
) -> Result<Vec<OpenAIMessage>, Error> {
    ensure_content(turn)?;

    let mut messages = Vec::with_capacity(history.len() + 2);
    if let Some(system) = system.filter(|s| !s.is_empty()) {
        messages.push(OpenAIMessage {
            role: "system".to_string(),
            content: OpenAIContent::Text(system.to_string()),
        });
    }
    for message in history.iter().chain(std::iter::once(turn)) {
        messages.push(convert_message(message)?);
    }
    Ok(messages)
}

fn convert_message(message: &Message) -> Result<OpenAIMessage, Error> {
    let content = if message.is_text_only() {
        OpenAIContent::Text(message.text_content())
    } else {
        let parts = message
            .parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => Ok(OpenAIPart::Text { text: text.clone() }),
                ContentPart::Attachment { attachment } => attachment_part(attachment),
            })
            .collect::<Result<Vec<_>, Error>>()?;
        OpenAIContent::Parts(parts)
    };

    Ok(OpenAIMessage {
        role: message.role.as_str().to_string(),
        content,
    })
}

fn attachment_part(attachment: &Attachment) -> Result<OpenAIPart, Error> {
    let url = attachment.data_url()?;
    if attachment.is_image()? {
        Ok(OpenAIPart::ImageUrl {
            image_url: ImageUrl { url },
        })
    } else {
        Ok(OpenAIPart::File {
            file: FileData {
                filename: attachment.filename().to_string(),
                file_data: url,
            },
        })
    }
}
