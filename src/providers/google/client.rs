use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use gcp_auth::TokenProvider;
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::debug;

use super::types::*;
use crate::error::check_status;
use crate::extract::DocumentExtractor;
use crate::payload::google::GooglePart;
use crate::payload::{self, AttachmentPolicy, ContentDelivery};
use crate::provider::Provider;
use crate::sse_stream::SseStreamExt;
use crate::{Error, FinishReason, GenerationRequest, Message, ModelInfo, Response, StreamEvent};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Authentication method for Google provider.
#[derive(Debug, Clone)]
pub enum GoogleAuth {
    /// Gemini Developer API key
    ApiKey(String),
    /// Vertex AI access token (passed as Bearer header)
    AccessToken(String),
    /// Vertex AI with Application Default Credentials (ADC)
    ApplicationDefault,
}

/// Google Gemini provider, via the Gemini API or Vertex AI.
pub struct GoogleProvider {
    client: Client,
    auth: GoogleAuth,
    auth_manager: Option<Arc<dyn TokenProvider>>,
    project_id: Option<String>,
    location: String,
    base_url: String,
    attachments: AttachmentPolicy,
}

impl GoogleProvider {
    /// Create a provider for the Gemini Developer API.
    pub fn gemini(api_key: impl Into<String>) -> Result<Self, Error> {
        Ok(Self {
            client: crate::providers::http_client(crate::DEFAULT_TIMEOUT)?,
            auth: GoogleAuth::ApiKey(api_key.into()),
            auth_manager: None,
            project_id: None,
            location: crate::DEFAULT_GOOGLE_REGION.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            attachments: AttachmentPolicy::native(),
        })
    }

    /// Create a Vertex AI provider with access token authentication.
    pub fn vertex(
        project_id: impl Into<String>,
        location: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, Error> {
        let location = location.into();
        Ok(Self {
            client: crate::providers::http_client(crate::DEFAULT_TIMEOUT)?,
            auth: GoogleAuth::AccessToken(access_token.into()),
            auth_manager: None,
            project_id: Some(project_id.into()),
            base_url: vertex_base_url(&location),
            location,
            attachments: AttachmentPolicy::native(),
        })
    }

    /// Create a Vertex AI provider with Application Default Credentials.
    pub async fn vertex_with_adc(
        project_id: impl Into<String>,
        location: impl Into<String>,
    ) -> Result<Self, Error> {
        let auth_manager = gcp_auth::provider()
            .await
            .map_err(|e| Error::auth(format!("Failed to load Google credentials: {e}")))?;

        let location = location.into();
        Ok(Self {
            client: crate::providers::http_client(crate::DEFAULT_TIMEOUT)?,
            auth: GoogleAuth::ApplicationDefault,
            auth_manager: Some(auth_manager),
            project_id: Some(project_id.into()),
            base_url: vertex_base_url(&location),
            location,
            attachments: AttachmentPolicy::native(),
        })
    }

    /// Create a new Google provider with custom base URL (for testing).
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

    fn is_vertex(&self) -> bool {
        !matches!(self.auth, GoogleAuth::ApiKey(_))
    }

    /// Convert a request and its resolved turn to Google format.
    fn convert_request(
        &self,
        request: &GenerationRequest,
        turn: &Message,
    ) -> Result<GoogleRequest, Error> {
        let payload = payload::google::build(
            request.system_prompt.as_deref(),
            &request.history,
            turn,
        )?;

        Ok(GoogleRequest {
            contents: payload.contents,
            generation_config: GoogleGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
            system_instruction: payload.system_instruction,
        })
    }

    /// Get the streaming endpoint for a model.
    fn stream_endpoint(&self, model: &str) -> String {
        match &self.project_id {
            Some(project_id) if self.is_vertex() => format!(
                "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:streamGenerateContent?alt=sse",
                self.base_url, project_id, self.location, model
            ),
            _ => format!(
                "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
                self.base_url, model
            ),
        }
    }

    fn models_endpoint(&self) -> String {
        if self.is_vertex() {
            format!("{}/v1beta1/publishers/google/models", self.base_url)
        } else {
            format!("{}/v1beta/models", self.base_url)
        }
    }

    /// Add authentication based on the method.
    async fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, Error> {
        let builder = match &self.auth {
            GoogleAuth::ApiKey(key) => builder.header("x-goog-api-key", key),
            GoogleAuth::AccessToken(token) => {
                builder.header("Authorization", format!("Bearer {token}"))
            }
            GoogleAuth::ApplicationDefault => {
                let auth_manager = self
                    .auth_manager
                    .as_ref()
                    .ok_or_else(|| Error::auth("Auth manager not initialized for ADC"))?;
                let token = auth_manager
                    .token(&[CLOUD_PLATFORM_SCOPE])
                    .await
                    .map_err(|e| Error::auth(format!("Failed to get ADC token: {e}")))?;
                let builder = builder.header("Authorization", format!("Bearer {}", token.as_str()));
                match &self.project_id {
                    Some(project_id) => builder.header("x-goog-user-project", project_id),
                    None => builder,
                }
            }
        };
        Ok(builder)
    }
}

fn vertex_base_url(location: &str) -> String {
    if location == "global" {
        "https://aiplatform.googleapis.com".to_string()
    } else {
        format!("https://{location}-aiplatform.googleapis.com")
    }
}

/// Text deltas of one chunk, plus `Done` when the candidate has finished.
fn convert_response(response: GoogleResponse) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    let Some(candidate) = response.candidates.into_iter().next() else {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            events.push(StreamEvent::Error {
                error: format!("Prompt blocked: {reason}"),
            });
        }
        return events;
    };

    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if let GooglePart::Text { text } = part {
            if !text.is_empty() {
                events.push(StreamEvent::ContentDelta { delta: text });
            }
        }
    }

    if let Some(reason) = candidate.finish_reason {
        events.push(StreamEvent::Done {
            finish_reason: FinishReason::from_vendor(&reason),
            usage: response.usage_metadata.map(Into::into).unwrap_or_default(),
        });
    }

    events
}

#[async_trait::async_trait]
impl Provider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn attachments(&self) -> &AttachmentPolicy {
        &self.attachments
    }

    async fn send(&self, request: &GenerationRequest, turn: &Message) -> Result<Response, Error> {
        let google_request = self.convert_request(request, turn)?;

        debug!(
            provider = "google",
            model = %request.model,
            messages = google_request.contents.len(),
            vertex = self.is_vertex(),
            "Sending generateContent request"
        );

        let response = self
            .authorized(self.client.post(self.stream_endpoint(&request.model)))
            .await?
            .json(&google_request)
            .send()
            .await?;
        let response = check_status("google", response).await?;

        let event_stream = response
            .bytes_stream()
            .sse_events()
            .map(|sse_result| -> Vec<Result<StreamEvent, Error>> {
                match sse_result {
                    Ok(sse_event) => {
                        let data = sse_event.data.trim();
                        if data.is_empty() || sse_event.is_done() {
                            return vec![];
                        }
                        match serde_json::from_str::<GoogleResponse>(data) {
                            Ok(chunk) => convert_response(chunk).into_iter().map(Ok).collect(),
                            Err(e) => vec![Err(Error::provider(
                                "google",
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
            .authorized(self.client.get(self.models_endpoint()))
            .await?
            .query(&[("pageSize", "1000")])
            .send()
            .await?;
        let response = check_status("google", response).await?;

        let names: Vec<String> = if self.is_vertex() {
            let list: PublisherModelList = response.json().await?;
            list.publisher_models.into_iter().map(|m| m.name).collect()
        } else {
            let list: GeminiModelList = response.json().await?;
            list.models.into_iter().map(|m| m.name).collect()
        };

        Ok(names.into_iter().map(|name| short_model_name(&name)).collect())
    }

    async fn model_info(&self, model: &str) -> Result<ModelInfo, Error> {
        let response = self
            .authorized(
                self.client
                    .get(format!("{}/{}", self.models_endpoint(), short_model_name(model))),
            )
            .await?
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::ModelNotAvailable(model.to_string()));
        }
        let response = check_status("google", response).await?;

        if self.is_vertex() {
            let found: PublisherModel = response.json().await?;
            Ok(ModelInfo {
                id: short_model_name(&found.name),
                display_name: found.version_id.map(|v| format!("{} ({v})", short_model_name(&found.name))),
                owned_by: Some("google".to_string()),
                ..ModelInfo::default()
            })
        } else {
            let found: GeminiModel = response.json().await?;
            Ok(ModelInfo {
                id: short_model_name(&found.name),
                display_name: found.display_name,
                input_token_limit: found.input_token_limit,
                output_token_limit: found.output_token_limit,
                ..ModelInfo::default()
            })
        }
    }
}

/// "models/gemini-2.0-flash" and "publishers/google/models/gemini-2.0-flash"
/// both become "gemini-2.0-flash".
fn short_model_name(name: &str) -> String {
    name.rsplit_once("models/")
        .map(|(_, short)| short)
        .unwrap_or(name)
        .to_string()
}
