pub mod anthropic;
pub mod google;
pub mod ollama;
pub mod openai;

use multi_ai_handler::Provider;
use std::sync::Arc;
use wiremock::MockServer;

pub const SYSTEM_PROMPT: &str = "You are a concise travel assistant.";
pub const FIRST_QUESTION: &str = "What's the weather like in Paris?";
pub const FIRST_ANSWER: &str = "It is sunny in Paris today.";
pub const FOLLOWUP_QUESTION: &str = "And tomorrow?";
pub const FOLLOWUP_ANSWER: &str = "Rain is expected tomorrow.";
pub const TEMPERATURE: f32 = 0.5;
pub const MAX_TOKENS: u32 = 150;

/// Load a test fixture relative to this suite.
pub fn load_fixture(filename: &str) -> String {
    let path = format!(
        "{}/tests/cross_provider/fixtures/{filename}",
        env!("CARGO_MANIFEST_DIR")
    );
    std::fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Failed to load test fixture: {path}"))
}

/// Provider configuration for cross-provider testing
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: &'static str,
    pub model: &'static str,
}

/// Trait for provider-specific test setup
#[async_trait::async_trait]
pub trait ProviderTestSetup {
    /// Get the provider configuration
    fn get_config() -> ProviderConfig;

    /// Create the provider instance pointed at the mock server
    fn create_provider(base_url: &str) -> Arc<dyn Provider>;

    /// Mount mocks for the two-turn conversation, matching exact payloads
    async fn mount_conversation_mocks(
        mock_server: &MockServer,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
