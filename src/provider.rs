use tracing::{debug, Instrument};
use uuid::Uuid;

use crate::payload::AttachmentPolicy;
use crate::{
    parse_ai_response, Content, Error, GenerationRequest, GenerationResponse, Message, ModelInfo,
    Response, TextStream,
};

/// A backend that can answer prompts.
///
/// Adapters implement the vendor call in [`send`](Provider::send); the
/// default [`generate`](Provider::generate) and [`stream`](Provider::stream)
/// resolve the user turn, call `send`, and shape the result. All responses
/// are internally streamed.
#[async_trait::async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Registry key, e.g. `"openai"`.
    fn name(&self) -> &str;

    /// Attachment handling for this adapter.
    fn attachments(&self) -> &AttachmentPolicy;

    /// Check the backend before each call.
    async fn ready(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Send `request.history` followed by `turn` and stream the reply.
    async fn send(&self, request: &GenerationRequest, turn: &Message) -> Result<Response, Error>;

    /// Model identifiers offered by the backend.
    async fn list_models(&self) -> Result<Vec<String>, Error>;

    /// Metadata for one model.
    async fn model_info(&self, model: &str) -> Result<ModelInfo, Error>;

    /// Run one turn to completion and return the reply with the updated history.
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, Error> {
        let span = tracing::debug_span!(
            "generate",
            provider = self.name(),
            model = %request.model,
            request_id = %Uuid::new_v4()
        );

        async {
            self.ready().await?;
            let turn = self.resolve_turn(request).await?;
            let complete = self.send(request, &turn).await?.buffer().await?;

            debug!(
                output_tokens = complete.usage.output_tokens,
                finish_reason = ?complete.finish_reason,
                "Generation finished"
            );

            let content = if request.json_output {
                Content::Json(parse_ai_response(&complete.content)?)
            } else {
                Content::Text(complete.content.clone())
            };

            let mut history = Vec::with_capacity(request.history.len() + 2);
            history.extend(request.history.iter().cloned());
            history.push(turn);
            history.push(Message::assistant(complete.content));

            Ok::<_, Error>(GenerationResponse {
                content,
                history,
                finish_reason: complete.finish_reason,
                usage: complete.usage,
            })
        }
        .instrument(span)
        .await
    }

    /// Stream the reply text. History is not updated.
    async fn stream(&self, request: &GenerationRequest) -> Result<TextStream, Error> {
        let span = tracing::debug_span!(
            "stream",
            provider = self.name(),
            model = %request.model,
            request_id = %Uuid::new_v4()
        );

        async {
            self.ready().await?;
            let turn = self.resolve_turn(request).await?;
            Ok::<_, Error>(self.send(request, &turn).await?.text_stream())
        }
        .instrument(span)
        .await
    }

    /// Build the new user message under this adapter's attachment policy.
    async fn resolve_turn(&self, request: &GenerationRequest) -> Result<Message, Error> {
        self.attachments()
            .user_turn(
                request.text.as_deref(),
                request.attachment.as_ref(),
                request.delivery,
            )
            .await
    }
}
