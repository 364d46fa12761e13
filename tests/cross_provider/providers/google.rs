use super::*;
use multi_ai_handler::{GoogleProvider, Provider};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct GoogleTestSetup;

#[async_trait::async_trait]
impl ProviderTestSetup for GoogleTestSetup {
    fn get_config() -> ProviderConfig {
        ProviderConfig {
            name: "Google",
            model: "gemini-2.0-flash",
        }
    }

    fn create_provider(base_url: &str) -> Arc<dyn Provider> {
        let provider = GoogleProvider::gemini("test-api-key")
            .expect("Failed to create Google provider")
            .with_base_url(base_url);
        Arc::new(provider)
    }

    async fn mount_conversation_mocks(
        mock_server: &MockServer,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let initial_request_payload = json!({
            "contents": [
                {"role": "user", "parts": [{"text": FIRST_QUESTION}]}
            ],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "maxOutputTokens": MAX_TOKENS
            },
            "systemInstruction": {"parts": [{"text": SYSTEM_PROMPT}]}
        });

        let followup_request_payload = json!({
            "contents": [
                {"role": "user", "parts": [{"text": FIRST_QUESTION}]},
                {"role": "model", "parts": [{"text": FIRST_ANSWER}]},
                {"role": "user", "parts": [{"text": FOLLOWUP_QUESTION}]}
            ],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "maxOutputTokens": MAX_TOKENS
            },
            "systemInstruction": {"parts": [{"text": SYSTEM_PROMPT}]}
        });

        let endpoint = "/v1beta/models/gemini-2.0-flash:streamGenerateContent";

        Mock::given(method("POST"))
            .and(path(endpoint))
            .and(query_param("alt", "sse"))
            .and(header("x-goog-api-key", "test-api-key"))
            .and(body_json(initial_request_payload))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(load_fixture("google/weather_response.sse"))
                    .insert_header("content-type", "text/event-stream"),
            )
            .expect(1)
            .mount(mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path(endpoint))
            .and(query_param("alt", "sse"))
            .and(body_json(followup_request_payload))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(load_fixture("google/followup_response.sse"))
                    .insert_header("content-type", "text/event-stream"),
            )
            .expect(1)
            .mount(mock_server)
            .await;

        Ok(())
    }
}
