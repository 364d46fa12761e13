use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::types::*;
use crate::error::check_status;
use crate::extract::DocumentExtractor;
use crate::payload::{self, AttachmentPolicy, ContentDelivery};
use crate::provider::Provider;
use crate::sse_stream::SseStreamExt;
use crate::{
    Error, FinishReason, GenerationRequest, Message, ModelInfo, Response, StreamEvent, Usage,
};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude provider using the Messages API.
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    attachments: AttachmentPolicy,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, Error> {
        Ok(Self {
            client: crate::providers::http_client(crate::DEFAULT_TIMEOUT)?,
            api_key: api_key.into(),
            base_url: ANTHROPIC_BASE_URL.to_string(),
            attachments: AttachmentPolicy::native(),
        })
    }

    /// Create a new Anthropic provider with custom base URL (for testing).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, Error> {
        self.client = crate::providers::http_client(timeout)?;
        Ok(self)
    }

    pub fn with_delivery(mut self, delivery: ContentDelivery) -> Self {
        self.attachments.delivery = delivery;
        self
    }

    pub fn with_extractor(mut self, extractor: Option<Arc<dyn DocumentExtractor>>) -> Self {
        self.attachments = self.attachments.with_extractor(extractor);
        self
    }

    /// Convert a request and its resolved turn to Anthropic format.
    fn convert_request(
        &self,
        request: &GenerationRequest,
        turn: &Message,
    ) -> Result<AnthropicRequest, Error> {
        let payload = payload::anthropic::build(
            request.system_prompt.as_deref(),
            &request.history,
            turn,
        )?;

        Ok(AnthropicRequest {
            model: request.model.clone(),
            messages: payload.messages,
            max_tokens: request.max_tokens.unwrap_or(crate::providers::DEFAULT_MAX_TOKENS),
            system: payload.system,
            temperature: request.temperature,
            stream: true,
        })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
    }
}

/// Usage and stop reason are spread over `message_start` and `message_delta`.
#[derive(Debug, Default)]
struct StreamState {
    usage: Usage,
    stop_reason: Option<String>,
}

impl StreamState {
    fn convert_event(&mut self, event: AnthropicStreamEvent) -> Vec<StreamEvent> {
        match event {
            AnthropicStreamEvent::MessageStart { message } => {
                if let Some(usage) = message.usage {
                    self.usage = usage.into();
                }
                vec![]
            }
            AnthropicStreamEvent::ContentBlockStart { content_block } => match content_block {
                ResponseBlock::Text { text } if !text.is_empty() => {
                    vec![StreamEvent::ContentDelta { delta: text }]
                }
                _ => vec![],
            },
            AnthropicStreamEvent::ContentBlockDelta { delta } => match delta {
                ContentDelta::TextDelta { text } if !text.is_empty() => {
                    vec![StreamEvent::ContentDelta { delta: text }]
                }
                _ => vec![],
            },
            AnthropicStreamEvent::MessageDelta { delta, usage } => {
                if let Some(reason) = delta.stop_reason {
                    self.stop_reason = Some(reason);
                }
                if let Some(output_tokens) = usage.and_then(|u| u.output_tokens) {
                    self.usage.output_tokens = output_tokens;
                }
                vec![]
            }
            AnthropicStreamEvent::MessageStop => vec![StreamEvent::Done {
                finish_reason: self
                    .stop_reason
                    .as_deref()
                    .map(FinishReason::from_vendor)
                    .unwrap_or(FinishReason::Stop),
                usage: std::mem::take(&mut self.usage),
            }],
            AnthropicStreamEvent::Error { error } => vec![StreamEvent::Error {
                error: format!("{}: {}", error.kind, error.message),
            }],
            AnthropicStreamEvent::ContentBlockStop
            | AnthropicStreamEvent::Ping
            | AnthropicStreamEvent::Unknown => vec![],
        }
    }
}

fn model_info_from(model: AnthropicModel) -> ModelInfo {
    ModelInfo {
        id: model.id,
        display_name: model.display_name,
        created_at: model.created_at,
        ..ModelInfo::default()
    }
}

#[async_trait::async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn attachments(&self) -> &AttachmentPolicy {
        &self.attachments
    }

    async fn send(&self, request: &GenerationRequest, turn: &Message) -> Result<Response, Error> {
        let anthropic_request = self.convert_request(request, turn)?;

        debug!(
            provider = "anthropic",
            model = %anthropic_request.model,
            messages = anthropic_request.messages.len(),
            max_tokens = anthropic_request.max_tokens,
            "Sending messages request"
        );

        let response = self
            .authorized(self.client.post(format!("{}/v1/messages", self.base_url)))
            .json(&anthropic_request)
            .send()
            .await?;
        let response = check_status("anthropic", response).await?;

        let mut state = StreamState::default();
        let event_stream = response
            .bytes_stream()
            .sse_events()
            .map(move |sse_result| -> Vec<Result<StreamEvent, Error>> {
                match sse_result {
                    Ok(sse_event) => {
                        let data = sse_event.data.trim();
                        if data.is_empty() {
                            return vec![];
                        }
                        match serde_json::from_str::<AnthropicStreamEvent>(data) {
                            Ok(event) => state.convert_event(event).into_iter().map(Ok).collect(),
                            Err(e) => vec![Err(Error::provider(
                                "anthropic",
                                format!("Failed to parse SSE event: {e}"),
                            ))],
                        }
                    }
                    Err(e) => vec![Err(e)],
                }
            })
            .map(futures_util::stream::iter)
            .flatten();

        Ok(Response::from_stream(event_stream))
    }

    async fn list_models(&self) -> Result<Vec<String>, Error> {
        let response = self
            .authorized(self.client.get(format!("{}/v1/models", self.base_url)))
            .query(&[("limit", "1000")])
            .send()
            .await?;
        let models: ModelList = check_status("anthropic", response).await?.json().await?;
        Ok(models.data.into_iter().map(|model| model.id).collect())
    }

    async fn model_info(&self, model: &str) -> Result<ModelInfo, Error> {
        let response = self
            .authorized(self.client.get(format!("{}/v1/models/{model}", self.base_url)))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::ModelNotAvailable(model.to_string()));
        }
        let model: AnthropicModel = check_status("anthropic", response).await?.json().await?;
        Ok(model_info_from(model))
    }
}
