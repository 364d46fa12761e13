//! OpenAI Chat Completions and compatible endpoints.

mod client;
mod types;

pub use client::{OpenAICompatProvider, CEREBRAS_BASE_URL, OPENAI_BASE_URL, OPENROUTER_BASE_URL};
