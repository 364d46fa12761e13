//! Stream adapter for newline-delimited JSON bodies (one object per line).

use futures_util::{Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use crate::Error;

const MAX_LINE: usize = 1_000_000;

/// Splits a byte stream into complete, non-blank lines.
pub struct JsonLines<S> {
    inner: S,
    buffer: Vec<u8>,
    lines: VecDeque<String>,
}

impl<S> JsonLines<S> {
    pub fn new(stream: S) -> Self {
        Self {
            inner: stream,
            buffer: Vec::new(),
            lines: VecDeque::new(),
        }
    }

    fn split_lines(&mut self) -> Result<(), Error> {
        let mut start = 0;
        while let Some(pos) = memchr::memchr(b'\n', &self.buffer[start..]) {
            let end = start + pos;
            self.push_line(start, end)?;
            start = end + 1;
        }
        if start > 0 {
            self.buffer.drain(..start);
        }
        Ok(())
    }

    fn push_line(&mut self, start: usize, end: usize) -> Result<(), Error> {
        let line = std::str::from_utf8(&self.buffer[start..end])
            .map_err(|e| Error::streaming(format!("Invalid UTF-8 in JSON line: {e}")))?
            .trim();
        if !line.is_empty() {
            self.lines.push_back(line.to_string());
        }
        Ok(())
    }
}

impl<S, E> Stream for JsonLines<S>
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Unpin,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Item = Result<String, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(line) = self.lines.pop_front() {
                return Poll::Ready(Some(Ok(line)));
            }

            match ready!(self.inner.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => {
                    self.buffer.extend_from_slice(&chunk);
                    if let Err(e) = self.split_lines() {
                        return Poll::Ready(Some(Err(e)));
                    }
                    // Only the unterminated tail is left in the buffer
                    if self.buffer.len() > MAX_LINE {
                        self.buffer.clear();
                        return Poll::Ready(Some(Err(Error::streaming(
                            "JSON line exceeded maximum size",
                        ))));
                    }
                }
                Some(Err(e)) => {
                    return Poll::Ready(Some(Err(Error::streaming(format!(
                        "Stream error: {}",
                        e.into()
                    )))));
                }
                None => {
                    if self.buffer.is_empty() {
                        return Poll::Ready(None);
                    }
                    let end = self.buffer.len();
                    let result = self.push_line(0, end);
                    self.buffer.clear();
                    if let Err(e) = result {
                        return Poll::Ready(Some(Err(e)));
                    }
                }
            }
        }
    }
}
