//! Types for streaming responses.

use crate::types::{FinishReason, Usage};

/// Events that can be emitted during streaming.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A chunk of content was received.
    ContentDelta { delta: String },
    /// The stream has finished.
    Done {
        finish_reason: FinishReason,
        usage: Usage,
    },
    /// The vendor reported an error in the middle of the stream.
    Error { error: String },
}
