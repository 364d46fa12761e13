//! Response handling for LLM generations.

use crate::{Error, FinishReason, StreamEvent, Usage};
use futures::stream::BoxStream;
use futures_util::stream::Stream;
use futures_util::StreamExt;
use std::pin::Pin;

/// Incremental text chunks of a streamed reply.
pub type TextStream = BoxStream<'static, Result<String, Error>>;

/// A complete response from an LLM provider.
#[derive(Debug, Clone)]
pub struct CompleteResponse {
    pub content: String,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

/// Response from an LLM generation that can be streamed or buffered.
/// All responses are internally streaming.
pub struct Response {
    stream: Pin<Box<dyn Stream<Item = Result<StreamEvent, Error>> + Send>>,
}

impl Response {
    /// Create a new response from a stream of events.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<StreamEvent, Error>> + Send + 'static,
    {
        Self {
            stream: Box::pin(stream),
        }
    }

    /// Buffer the entire response by consuming the stream.
    pub async fn buffer(self) -> Result<CompleteResponse, Error> {
        let mut stream = self.stream;
        let mut accumulator = crate::accumulator::ResponseAccumulator::new();

        while let Some(event_result) = stream.next().await {
            accumulator.process_event(event_result?)?;
            if accumulator.is_done() {
                break;
            }
        }

        Ok(accumulator.finalize())
    }

    /// Get just the text content (convenience method).
    pub async fn text(self) -> Result<String, Error> {
        Ok(self.buffer().await?.content)
    }

    /// Stream the response events.
    pub fn stream(self) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, Error>> + Send>> {
        self.stream
    }

    /// Stream only the non-empty text deltas; error events become errors.
    pub fn text_stream(self) -> TextStream {
        self.stream
            .filter_map(|event| async move {
                match event {
                    Ok(StreamEvent::ContentDelta { delta }) if !delta.is_empty() => Some(Ok(delta)),
                    Ok(StreamEvent::Error { error }) => Some(Err(Error::streaming(error))),
                    Ok(_) => None,
                    Err(e) => Some(Err(e)),
                }
            })
            .boxed()
    }
}
