use serde::{Deserialize, Serialize};

use super::attachment::Attachment;
use super::config::Usage;
use super::message::{FinishReason, Message};
use super::prompt::UserInput;
use crate::payload::ContentDelivery;

pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// A single generation call in provider-neutral form.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub text: Option<String>,
    pub attachment: Option<Attachment>,
    /// Prior turns, without the system message.
    pub history: Vec<Message>,
    pub temperature: f32,
    /// Overrides the adapter's attachment delivery for this call.
    pub delivery: Option<ContentDelivery>,
    /// Parse the reply with [`parse_ai_response`](crate::parse_ai_response).
    pub json_output: bool,
    /// Overrides the adapter's output token ceiling.
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            text: None,
            attachment: None,
            history: Vec::new(),
            temperature: DEFAULT_TEMPERATURE,
            delivery: None,
            json_output: false,
            max_tokens: None,
        }
    }

    pub fn system(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Set text and attachment from a [`UserInput`].
    pub fn input(mut self, input: impl Into<UserInput>) -> Self {
        let input = input.into();
        self.text = input.text;
        self.attachment = input.attachment;
        self
    }

    pub fn history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn delivery(mut self, delivery: ContentDelivery) -> Self {
        self.delivery = Some(delivery);
        self
    }

    pub fn json_output(mut self, json_output: bool) -> Self {
        self.json_output = json_output;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Reply content: raw text, or the JSON value parsed out of it.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Json(serde_json::Value),
}

impl Content {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Content::Json(value) => Some(value),
            Content::Text(_) => None,
        }
    }
}

/// Result of a blocking generation.
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub content: Content,
    /// The request history plus the new user turn and the assistant reply.
    pub history: Vec<Message>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

impl GenerationResponse {
    /// The assistant reply as it was received, before any JSON parsing.
    pub fn raw_text(&self) -> &str {
        self.history
            .last()
            .and_then(|message| match message.parts.first() {
                Some(super::message::ContentPart::Text { text }) => Some(text.as_str()),
                _ => None,
            })
            .unwrap_or_default()
    }
}

/// Metadata about one model. Fields a vendor does not report stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_token_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_token_limit: Option<u32>,
}
