use super::*;
use multi_ai_handler::{AnthropicProvider, Provider};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct AnthropicTestSetup;

#[async_trait::async_trait]
impl ProviderTestSetup for AnthropicTestSetup {
    fn get_config() -> ProviderConfig {
        ProviderConfig {
            name: "Anthropic",
            model: "claude-sonnet-4-20250514",
        }
    }

    fn create_provider(base_url: &str) -> Arc<dyn Provider> {
        let provider = AnthropicProvider::new("test-api-key")
            .expect("Failed to create Anthropic provider")
            .with_base_url(base_url);
        Arc::new(provider)
    }

    async fn mount_conversation_mocks(
        mock_server: &MockServer,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let initial_request_payload = json!({
            "model": "claude-sonnet-4-20250514",
            "messages": [
                {
                    "role": "user",
                    "content": [{"type": "text", "text": FIRST_QUESTION}]
                }
            ],
            "max_tokens": MAX_TOKENS,
            "system": SYSTEM_PROMPT,
            "temperature": TEMPERATURE,
            "stream": true
        });

        let followup_request_payload = json!({
            "model": "claude-sonnet-4-20250514",
            "messages": [
                {
                    "role": "user",
                    "content": [{"type": "text", "text": FIRST_QUESTION}]
                },
                {
                    "role": "assistant",
                    "content": [{"type": "text", "text": FIRST_ANSWER}]
                },
                {
                    "role": "user",
                    "content": [{"type": "text", "text": FOLLOWUP_QUESTION}]
                }
            ],
            "max_tokens": MAX_TOKENS,
            "system": SYSTEM_PROMPT,
            "temperature": TEMPERATURE,
            "stream": true
        });

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-api-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_json(initial_request_payload))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(load_fixture("anthropic/weather_response.sse"))
                    .insert_header("content-type", "text/event-stream")
                    .insert_header("cache-control", "no-cache"),
            )
            .expect(1)
            .mount(mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_json(followup_request_payload))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(load_fixture("anthropic/followup_response.sse"))
                    .insert_header("content-type", "text/event-stream")
                    .insert_header("cache-control", "no-cache"),
            )
            .expect(1)
            .mount(mock_server)
            .await;

        Ok(())
    }
}
