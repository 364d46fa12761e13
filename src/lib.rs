//! A unified facade over multiple LLM providers.
//!
//! One provider-neutral request shape ([`GenerationRequest`]) is translated to
//! Google Gemini / Vertex AI, Anthropic, OpenAI, OpenRouter, Cerebras and a
//! local Ollama server. Replies can be buffered, streamed as text chunks, or
//! parsed as JSON. File attachments are sent natively or converted to markdown
//! by a [`DocumentExtractor`] first.
//!
//! ```no_run
//! use multi_ai_handler::{GenerationRequest, Manager};
//!
//! # async fn run() -> Result<(), multi_ai_handler::Error> {
//! let manager = Manager::from_env()?;
//! let request = GenerationRequest::new("gpt-4o-mini").input("Hello!");
//! let response = manager.generate("openai", &request).await?;
//! println!("{:?}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod accumulator;
pub mod blocking;
pub mod conversation;
pub mod error;
pub mod extract;
pub mod manager;
pub mod ndjson_stream;
pub mod parse;
pub mod payload;
pub mod provider;
pub mod providers;
pub mod response;
pub mod sse_stream;
pub mod types;

// Re-export core types for easy usage
pub use accumulator::*;
pub use conversation::Conversation;
pub use error::Error;
pub use extract::{DocumentExtractor, HttpExtractor};
pub use manager::{FnFactory, Manager, ProviderFactory, ProviderKind};
pub use parse::parse_ai_response;
pub use payload::{AttachmentPolicy, ContentDelivery};
pub use provider::Provider;
pub use providers::*;
pub use response::*;
pub use sse_stream::SseEvent;
pub use types::*;
