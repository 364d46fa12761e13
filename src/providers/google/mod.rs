mod client;
mod types;

pub use client::{GoogleAuth, GoogleProvider, GEMINI_BASE_URL};
