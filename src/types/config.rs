use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Error;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_GOOGLE_REGION: &str = "europe-west1";

/// Credentials and endpoints handed to provider factories.
///
/// Built once at startup, usually with [`Settings::from_env`], and shared by
/// every adapter the [`Manager`](crate::Manager) constructs.
#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    /// Overrides the OpenAI base URL (proxies, Azure-style gateways).
    pub openai_base_url: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub cerebras_api_key: Option<String>,
    /// Gemini Developer API key. Takes precedence over Vertex AI.
    pub gemini_api_key: Option<String>,
    pub google_cloud_project: Option<String>,
    pub google_cloud_region: String,
    /// Static Vertex AI token; Application Default Credentials are used when absent.
    pub vertex_access_token: Option<String>,
    pub ollama_base_url: String,
    /// Document-conversion service used for extracted-text delivery.
    pub extractor_url: Option<String>,
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: None,
            openrouter_api_key: None,
            anthropic_api_key: None,
            cerebras_api_key: None,
            gemini_api_key: None,
            google_cloud_project: None,
            google_cloud_region: DEFAULT_GOOGLE_REGION.to_string(),
            vertex_access_token: None,
            ollama_base_url: DEFAULT_OLLAMA_URL.to_string(),
            extractor_url: None,
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Settings {
    /// Create settings from environment variables.
    pub fn from_env() -> Result<Self, Error> {
        let var = |name: &str| env::var(name).ok().filter(|value| !value.is_empty());

        let request_timeout = match var("MULTI_AI_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(value.parse().map_err(|_| {
                Error::config(format!(
                    "MULTI_AI_TIMEOUT_SECS must be a whole number of seconds, got '{value}'"
                ))
            })?),
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            openai_api_key: var("OPENAI_API_KEY"),
            openai_base_url: var("OPENAI_BASE_URL"),
            openrouter_api_key: var("OPENROUTER_API_KEY"),
            anthropic_api_key: var("ANTHROPIC_API_KEY"),
            cerebras_api_key: var("CEREBRAS_API_KEY"),
            gemini_api_key: var("GEMINI_API_KEY").or_else(|| var("GOOGLE_API_KEY")),
            google_cloud_project: var("GOOGLE_CLOUD_PROJECT"),
            google_cloud_region: var("GOOGLE_CLOUD_REGION")
                .or_else(|| var("GOOGLE_CLOUD_LOCATION"))
                .unwrap_or_else(|| DEFAULT_GOOGLE_REGION.to_string()),
            vertex_access_token: var("VERTEX_ACCESS_TOKEN"),
            ollama_base_url: var("OLLAMA_HOST").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            extractor_url: var("DOCUMENT_EXTRACTOR_URL"),
            request_timeout,
        })
    }

    /// Load a `.env` file if one exists, then read the environment.
    pub fn from_dotenv() -> Result<Self, Error> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(Error::config(format!("Failed to load .env file: {e}")));
            }
        }
        Self::from_env()
    }

    /// Fetch a required credential or fail with a configuration error.
    pub(crate) fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, Error> {
        value
            .as_deref()
            .ok_or_else(|| Error::config(format!("{name} is required for this provider")))
    }
}

/// Token usage information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cached_tokens: Option<u32>,
}
