//! Provider-specific payload builders and user-turn resolution.
//!
//! Builders are pure: they take the system prompt, the prior history and the
//! already resolved user turn, and return the vendor's message list with the
//! new turn appended. History is borrowed and never modified.

pub mod anthropic;
pub mod chat;
pub mod google;
pub mod openai;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extract::DocumentExtractor;
use crate::{Attachment, ContentPart, Error, Message};

/// How attachments reach the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentDelivery {
    /// Send the file itself as an image or document part.
    #[default]
    NativeMultimodal,
    /// Convert the file to markdown first and send it as text.
    ExtractedText,
}

/// Per-adapter attachment handling.
#[derive(Clone, Default)]
pub struct AttachmentPolicy {
    pub delivery: ContentDelivery,
    extractor: Option<Arc<dyn DocumentExtractor>>,
}

impl std::fmt::Debug for AttachmentPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentPolicy")
            .field("delivery", &self.delivery)
            .field("extractor", &self.extractor.is_some())
            .finish()
    }
}

impl AttachmentPolicy {
    pub fn new(delivery: ContentDelivery, extractor: Option<Arc<dyn DocumentExtractor>>) -> Self {
        Self {
            delivery,
            extractor,
        }
    }

    /// Native delivery with no extractor.
    pub fn native() -> Self {
        Self::default()
    }

    /// Extracted-text delivery through `extractor`.
    pub fn extracted(extractor: Arc<dyn DocumentExtractor>) -> Self {
        Self::new(ContentDelivery::ExtractedText, Some(extractor))
    }

    /// Keep the delivery mode, swap the extractor.
    pub fn with_extractor(mut self, extractor: Option<Arc<dyn DocumentExtractor>>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Build the new user message from the caller's text and attachment.
    pub async fn user_turn(
        &self,
        text: Option<&str>,
        attachment: Option<&Attachment>,
        delivery: Option<ContentDelivery>,
    ) -> Result<Message, Error> {
        let text = text.filter(|text| !text.is_empty());
        let delivery = delivery.unwrap_or(self.delivery);

        let attachment = match attachment {
            None => {
                let text = text.ok_or_else(|| {
                    Error::invalid_input("Either text or an attachment is required")
                })?;
                return Ok(Message::user(text));
            }
            Some(attachment) => attachment,
        };

        match delivery {
            ContentDelivery::NativeMultimodal => {
                let message = Message {
                    role: crate::Role::User,
                    parts: Vec::new(),
                };
                let message = match text {
                    Some(text) => message.with_text(text),
                    None => message,
                };
                Ok(message.with_attachment(attachment.clone()))
            }
            ContentDelivery::ExtractedText => {
                let extractor = self.extractor.as_ref().ok_or_else(|| {
                    Error::config(
                        "Extracted-text delivery needs a document extractor (set DOCUMENT_EXTRACTOR_URL)",
                    )
                })?;
                debug!(
                    filename = attachment.filename(),
                    "Converting attachment to text"
                );
                let markdown = extractor.extract_markdown(attachment).await?;
                let file_block = format!("# File: {}\n\n{}", attachment.filename(), markdown);
                let merged = match text {
                    Some(text) => format!("{text}\n\n{file_block}"),
                    None => file_block,
                };
                Ok(Message::user(merged))
            }
        }
    }
}

/// A turn must carry non-empty text or an attachment.
pub(crate) fn ensure_content(turn: &Message) -> Result<(), Error> {
    let has_content = turn.parts.iter().any(|part| match part {
        ContentPart::Text { text } => !text.is_empty(),
        ContentPart::Attachment { .. } => true,
    });
    if has_content {
        Ok(())
    } else {
        Err(Error::invalid_input(
            "Either text or an attachment is required",
        ))
    }
}
