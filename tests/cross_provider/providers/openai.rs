use super::*;
use multi_ai_handler::{OpenAICompatProvider, Provider};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct OpenAITestSetup;

#[async_trait::async_trait]
impl ProviderTestSetup for OpenAITestSetup {
    fn get_config() -> ProviderConfig {
        ProviderConfig {
            name: "OpenAI",
            model: "gpt-4o-mini",
        }
    }

    fn create_provider(base_url: &str) -> Arc<dyn Provider> {
        let provider = OpenAICompatProvider::openai("test-api-key")
            .expect("Failed to create OpenAI provider")
            .with_base_url(base_url);
        Arc::new(provider)
    }

    async fn mount_conversation_mocks(
        mock_server: &MockServer,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let initial_request_payload = json!({
            "model": "gpt-4o-mini",
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": FIRST_QUESTION}
            ],
            "temperature": TEMPERATURE,
            "max_completion_tokens": MAX_TOKENS,
            "stream": true,
            "stream_options": {"include_usage": true}
        });

        let followup_request_payload = json!({
            "model": "gpt-4o-mini",
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": FIRST_QUESTION},
                {"role": "assistant", "content": FIRST_ANSWER},
                {"role": "user", "content": FOLLOWUP_QUESTION}
            ],
            "temperature": TEMPERATURE,
            "max_completion_tokens": MAX_TOKENS,
            "stream": true,
            "stream_options": {"include_usage": true}
        });

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-api-key"))
            .and(body_json(initial_request_payload))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(load_fixture("openai/weather_response.sse"))
                    .insert_header("content-type", "text/event-stream"),
            )
            .expect(1)
            .mount(mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_json(followup_request_payload))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(load_fixture("openai/followup_response.sse"))
                    .insert_header("content-type", "text/event-stream"),
            )
            .expect(1)
            .mount(mock_server)
            .await;

        Ok(())
    }
}
