use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::types::{ChatCompletionChunk, ChatCompletionRequest, ModelList, ModelObject, StreamOptions};
use crate::error::check_status;
use crate::extract::DocumentExtractor;
use crate::payload::{self, AttachmentPolicy, ContentDelivery};
use crate::provider::Provider;
use crate::sse_stream::SseStreamExt;
use crate::{
    Error, FinishReason, GenerationRequest, Message, ModelInfo, Response, StreamEvent, Usage,
};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const CEREBRAS_BASE_URL: &str = "https://api.cerebras.ai/v1";

/// Which request field carries the output token ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenParam {
    MaxTokens,
    MaxCompletionTokens,
}

/// Chat Completions client shared by OpenAI, OpenRouter and Cerebras.
pub struct OpenAICompatProvider {
    name: String,
    client: Client,
    api_key: String,
    base_url: String,
    token_param: TokenParam,
    default_max_tokens: Option<u32>,
    include_usage: bool,
    attachments: AttachmentPolicy,
}

impl OpenAICompatProvider {
    /// Create a provider for any endpoint speaking the Chat Completions API.
    pub fn new(
        name: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, Error> {
        Ok(Self {
            name: name.into(),
            client: crate::providers::http_client(crate::DEFAULT_TIMEOUT)?,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token_param: TokenParam::MaxCompletionTokens,
            default_max_tokens: None,
            include_usage: false,
            attachments: AttachmentPolicy::native(),
        })
    }

    pub fn openai(api_key: impl Into<String>) -> Result<Self, Error> {
        let mut provider = Self::new("openai", api_key, OPENAI_BASE_URL)?;
        provider.include_usage = true;
        Ok(provider)
    }

    pub fn openrouter(api_key: impl Into<String>) -> Result<Self, Error> {
        let mut provider = Self::new("openrouter", api_key, OPENROUTER_BASE_URL)?;
        provider.token_param = TokenParam::MaxTokens;
        Ok(provider)
    }

    /// Cerebras needs an explicit ceiling and has no file inputs.
    pub fn cerebras(api_key: impl Into<String>) -> Result<Self, Error> {
        let mut provider = Self::new("cerebras", api_key, CEREBRAS_BASE_URL)?;
        provider.default_max_tokens = Some(crate::providers::DEFAULT_MAX_TOKENS);
        provider.attachments = AttachmentPolicy::new(ContentDelivery::ExtractedText, None);
        Ok(provider)
    }

    /// Point the provider at another endpoint (proxies, mock servers).
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

    /// Convert a request and its resolved turn to the wire format.
    fn convert_request(
        &self,
        request: &GenerationRequest,
        turn: &Message,
    ) -> Result<ChatCompletionRequest, Error> {
        let messages = payload::openai::build(
            request.system_prompt.as_deref(),
            &request.history,
            turn,
        )?;

        let ceiling = request.max_tokens.or(self.default_max_tokens);
        let (max_tokens, max_completion_tokens) = match self.token_param {
            TokenParam::MaxTokens => (ceiling, None),
            TokenParam::MaxCompletionTokens => (None, ceiling),
        };

        Ok(ChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens,
            max_completion_tokens,
            stream: true,
            stream_options: self.include_usage.then_some(StreamOptions {
                include_usage: true,
            }),
        })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header("Authorization", format!("Bearer {}", self.api_key))
    }
}

/// Finish reason and usage seen so far; both may arrive in different chunks.
#[derive(Debug, Default)]
struct StreamState {
    finish_reason: Option<FinishReason>,
    usage: Usage,
    done: bool,
}

impl StreamState {
    fn convert_chunk(&mut self, chunk: ChatCompletionChunk) -> Vec<StreamEvent> {
        if let Some(error) = chunk.error {
            return vec![StreamEvent::Error {
                error: error.message,
            }];
        }

        let mut events = Vec::new();
        for choice in chunk.choices {
            if let Some(delta) = choice.delta.content {
                if !delta.is_empty() {
                    events.push(StreamEvent::ContentDelta { delta });
                }
            }
            if let Some(reason) = choice.finish_reason {
                self.finish_reason = Some(FinishReason::from_vendor(&reason));
            }
        }
        if let Some(usage) = chunk.usage {
            self.usage = usage.into();
        }
        events
    }

    fn finish(&mut self) -> Vec<StreamEvent> {
        if self.done {
            return vec![];
        }
        self.done = true;
        vec![StreamEvent::Done {
            finish_reason: self.finish_reason.clone().unwrap_or(FinishReason::Stop),
            usage: std::mem::take(&mut self.usage),
        }]
    }
}

fn model_info_from(model: ModelObject) -> ModelInfo {
    ModelInfo {
        id: model.id,
        display_name: model.name,
        created_at: model.created.map(|ts| ts.to_string()),
        owned_by: model.owned_by,
        input_token_limit: model.context_length,
        ..ModelInfo::default()
    }
}

#[async_trait::async_trait]
impl Provider for OpenAICompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn attachments(&self) -> &AttachmentPolicy {
        &self.attachments
    }

    async fn send(&self, request: &GenerationRequest, turn: &Message) -> Result<Response, Error> {
        let body = self.convert_request(request, turn)?;

        debug!(
            provider = %self.name,
            model = %body.model,
            messages = body.messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .authorized(self.client.post(format!("{}/chat/completions", self.base_url)))
            .json(&body)
            .send()
            .await?;
        let response = check_status(&self.name, response).await?;

        let provider = self.name.clone();
        let mut state = StreamState::default();
        let event_stream = response
            .bytes_stream()
            .sse_events()
            .map(move |sse_result| -> Vec<Result<StreamEvent, Error>> {
                match sse_result {
                    Ok(sse_event) => {
                        if sse_event.is_done() {
                            return state.finish().into_iter().map(Ok).collect();
                        }
                        match serde_json::from_str::<ChatCompletionChunk>(&sse_event.data) {
                            Ok(chunk) => state.convert_chunk(chunk).into_iter().map(Ok).collect(),
                            Err(e) => vec![Err(Error::provider(
                                provider.as_str(),
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
            .authorized(self.client.get(format!("{}/models", self.base_url)))
            .send()
            .await?;
        let models: ModelList = check_status(&self.name, response).await?.json().await?;
        Ok(models.data.into_iter().map(|model| model.id).collect())
    }

    async fn model_info(&self, model: &str) -> Result<ModelInfo, Error> {
        let response = self
            .authorized(self.client.get(format!("{}/models/{model}", self.base_url)))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::ModelNotAvailable(model.to_string()));
        }
        let object: ModelObject = check_status(&self.name, response).await?.json().await?;
        Ok(model_info_from(object))
    }
}
