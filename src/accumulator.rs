//! Delta accumulation logic for streaming responses.

use crate::types::{FinishReason, StreamEvent, Usage};
use crate::CompleteResponse;
use crate::Error;

/// Accumulates streaming deltas into a complete response.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    /// Text received so far.
    content: String,
    /// Final finish reason (if received).
    finish_reason: Option<FinishReason>,
    /// Final usage statistics (if received).
    usage: Option<Usage>,
}

impl ResponseAccumulator {
    /// Create a new response accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a stream event and update the accumulation.
    pub fn process_event(&mut self, event: StreamEvent) -> Result<(), Error> {
        match event {
            StreamEvent::ContentDelta { delta } => {
                self.content.push_str(&delta);
            }
            StreamEvent::Done {
                finish_reason,
                usage,
            } => {
                self.finish_reason = Some(finish_reason);
                self.usage = Some(usage);
            }
            StreamEvent::Error { error } => {
                return Err(Error::streaming(error));
            }
        }

        Ok(())
    }

    /// Whether a `Done` event has been seen.
    pub fn is_done(&self) -> bool {
        self.finish_reason.is_some()
    }

    /// Get the current accumulated content.
    pub fn current_content(&self) -> &str {
        &self.content
    }

    /// Finalize and return the complete response.
    pub fn finalize(self) -> CompleteResponse {
        CompleteResponse {
            content: self.content,
            finish_reason: self.finish_reason.unwrap_or(FinishReason::Stop),
            usage: self.usage.unwrap_or_default(),
        }
    }
}
