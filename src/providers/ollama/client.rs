use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::types::*;
use crate::error::check_status;
use crate::extract::DocumentExtractor;
use crate::ndjson_stream::JsonLines;
use crate::payload::{self, AttachmentPolicy, ContentDelivery};
use crate::provider::Provider;
use crate::{Error, FinishReason, GenerationRequest, Message, ModelInfo, Response, StreamEvent};

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const START_HINT: &str = "Start it with `ollama serve` or point OLLAMA_HOST at a running server.";

/// Local inference through an Ollama server.
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    attachments: AttachmentPolicy,
}

impl OllamaProvider {
    /// Local models rarely read files, so attachments default to extracted text.
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        Ok(Self {
            client: crate::providers::http_client(crate::DEFAULT_TIMEOUT)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            attachments: AttachmentPolicy::new(ContentDelivery::ExtractedText, None),
        })
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

    fn convert_request(
        &self,
        request: &GenerationRequest,
        turn: &Message,
    ) -> Result<OllamaChatRequest, Error> {
        let messages =
            payload::chat::build(request.system_prompt.as_deref(), &request.history, turn)?;

        Ok(OllamaChatRequest {
            model: request.model.clone(),
            messages,
            stream: true,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        })
    }

    fn unavailable(&self, reason: String) -> Error {
        warn!(location = %self.base_url, %reason, "Ollama server unavailable");
        Error::ServerUnavailable {
            location: self.base_url.clone(),
            reason,
            hint: START_HINT.to_string(),
        }
    }

    async fn tags(&self) -> Result<TagList, Error> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await?;
        Ok(check_status("ollama", response).await?.json().await?)
    }
}

fn convert_chunk(chunk: OllamaChatChunk) -> Vec<StreamEvent> {
    if let Some(error) = chunk.error {
        return vec![StreamEvent::Error { error }];
    }

    let mut events = Vec::new();
    let usage = chunk.usage();
    if let Some(message) = chunk.message {
        if !message.content.is_empty() {
            events.push(StreamEvent::ContentDelta {
                delta: message.content,
            });
        }
    }
    if chunk.done {
        events.push(StreamEvent::Done {
            finish_reason: chunk
                .done_reason
                .as_deref()
                .map(FinishReason::from_vendor)
                .unwrap_or(FinishReason::Stop),
            usage,
        });
    }
    events
}

#[async_trait::async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn attachments(&self) -> &AttachmentPolicy {
        &self.attachments
    }

    /// Probe `/api/tags` so a stopped server fails fast with a clear message.
    async fn ready(&self) -> Result<(), Error> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_server_error() => Err(
                self.unavailable(format!("Ollama server returned {}", response.status())),
            ),
            Ok(_) => Ok(()),
            Err(e) if e.is_timeout() => {
                Err(self.unavailable("Ollama server did not answer in time".to_string()))
            }
            Err(e) => Err(self.unavailable(format!("Ollama server is not reachable ({e})"))),
        }
    }

    async fn send(&self, request: &GenerationRequest, turn: &Message) -> Result<Response, Error> {
        let body = self.convert_request(request, turn)?;

        debug!(
            provider = "ollama",
            model = %body.model,
            messages = body.messages.len(),
            "Sending chat request"
        );

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await?;
        let response = check_status("ollama", response).await?;

        let event_stream = JsonLines::new(response.bytes_stream())
            .map(|line| -> Vec<Result<StreamEvent, Error>> {
                match line {
                    Ok(line) => match serde_json::from_str::<OllamaChatChunk>(&line) {
                        Ok(chunk) => convert_chunk(chunk).into_iter().map(Ok).collect(),
                        Err(e) => vec![Err(Error::provider(
                            "ollama",
                            format!("Failed to parse chat chunk: {e}"),
                        ))],
                    },
                    Err(e) => vec![Err(e)],
                }
            })
            .map(futures_util::stream::iter)
            .flatten();

        Ok(Response::from_stream(event_stream))
    }

    async fn list_models(&self) -> Result<Vec<String>, Error> {
        self.ready().await?;
        Ok(self
            .tags()
            .await?
            .models
            .into_iter()
            .map(|model| model.name)
            .collect())
    }

    async fn model_info(&self, model: &str) -> Result<ModelInfo, Error> {
        self.ready().await?;
        let response = self
            .client
            .post(format!("{}/api/show", self.base_url))
            .json(&ShowRequest { model })
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::ModelNotAvailable(model.to_string()));
        }
        let show: ShowResponse = check_status("ollama", response).await?.json().await?;

        let size = self
            .tags()
            .await?
            .models
            .into_iter()
            .find(|local| local.name == model || local.name == format!("{model}:latest"))
            .and_then(|local| local.size);

        let input_token_limit = show.context_length();
        let details = show.details.unwrap_or(ModelDetails {
            family: None,
            parameter_size: None,
        });

        Ok(ModelInfo {
            id: model.to_string(),
            display_name: details.family,
            modified_at: show.modified_at,
            size,
            parameters: details.parameter_size,
            input_token_limit,
            ..ModelInfo::default()
        })
    }
}
