//! Provider implementations for different LLM services.

use std::time::Duration;

use reqwest::Client;

use crate::Error;

pub mod anthropic;
pub mod google;
pub mod ollama;
pub mod openai;

// Re-export commonly used provider types
pub use anthropic::AnthropicProvider;
pub use google::{GoogleAuth, GoogleProvider};
pub use ollama::OllamaProvider;
pub use openai::OpenAICompatProvider;

/// Output token ceiling sent to vendors that require one.
pub const DEFAULT_MAX_TOKENS: u32 = 20_000;

pub(crate) fn http_client(timeout: Duration) -> Result<Client, Error> {
    Ok(Client::builder().timeout(timeout).build()?)
}
