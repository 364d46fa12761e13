use super::*;
use multi_ai_handler::{OllamaProvider, Provider};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct OllamaTestSetup;

#[async_trait::async_trait]
impl ProviderTestSetup for OllamaTestSetup {
    fn get_config() -> ProviderConfig {
        ProviderConfig {
            name: "Ollama",
            model: "llama3.2",
        }
    }

    fn create_provider(base_url: &str) -> Arc<dyn Provider> {
        let provider = OllamaProvider::new(base_url).expect("Failed to create Ollama provider");
        Arc::new(provider)
    }

    async fn mount_conversation_mocks(
        mock_server: &MockServer,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let initial_request_payload = json!({
            "model": "llama3.2",
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": FIRST_QUESTION}
            ],
            "stream": true,
            "options": {"temperature": TEMPERATURE, "num_predict": MAX_TOKENS}
        });

        let followup_request_payload = json!({
            "model": "llama3.2",
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": FIRST_QUESTION},
                {"role": "assistant", "content": FIRST_ANSWER},
                {"role": "user", "content": FOLLOWUP_QUESTION}
            ],
            "stream": true,
            "options": {"temperature": TEMPERATURE, "num_predict": MAX_TOKENS}
        });

        // Readiness probe before every call
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
            .mount(mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_json(initial_request_payload))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(load_fixture("ollama/weather_response.ndjson"))
                    .insert_header("content-type", "application/x-ndjson"),
            )
            .expect(1)
            .mount(mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_json(followup_request_payload))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(load_fixture("ollama/followup_response.ndjson"))
                    .insert_header("content-type", "application/x-ndjson"),
            )
            .expect(1)
            .mount(mock_server)
            .await;

        Ok(())
    }
}
