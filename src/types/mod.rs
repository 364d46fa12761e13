//! Core types used throughout the library.

pub mod attachment;
pub mod config;
pub mod message;
pub mod prompt;
pub mod request;
pub mod streaming;

// Re-export commonly used types
pub use attachment::*;
pub use config::*;
pub use message::*;
pub use prompt::*;
pub use request::*;
pub use streaming::*;
