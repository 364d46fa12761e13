mod client;
mod types;

pub use client::{AnthropicProvider, ANTHROPIC_BASE_URL, ANTHROPIC_VERSION};
