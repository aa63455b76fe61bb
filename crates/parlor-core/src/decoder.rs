//! Stream decoder: turns a chunked response body into complete lines.
//!
//! Chunk boundaries carry no meaning. A chunk may end in the middle of a line,
//! in the middle of a JSON payload, or in the middle of a multi-byte UTF-8
//! sequence. The decoder keeps at most one partial line (plus at most three
//! undecoded bytes) between reads and only hands out lines that were
//! terminated by `\n`.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;

use crate::error::{ClientError, ClientResult};

/// Streaming UTF-8 decoder.
///
/// Incomplete trailing sequences are held back until the next chunk arrives.
/// Invalid sequences decode to U+FFFD and decoding continues.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes the next chunk, returning all text that is complete so far.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let input: Cow<'_, [u8]> = if self.pending.is_empty() {
            Cow::Borrowed(chunk)
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(chunk);
            Cow::Owned(joined)
        };

        let mut out = String::with_capacity(input.len());
        let mut rest: &[u8] = &input;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    if let Some(invalid_len) = err.error_len() {
                        out.push(char::REPLACEMENT_CHARACTER);
                        rest = &rest[valid + invalid_len..];
                    } else {
                        // Truncated sequence at the end of the chunk.
                        self.pending.extend_from_slice(&rest[valid..]);
                        break;
                    }
                }
            }
        }
        out
    }

    /// Returns true if bytes of an unfinished sequence are held back.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drops any held-back bytes, returning how many were dropped.
    pub fn reset(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}

/// Incremental line splitter over raw chunks.
///
/// Lines are split on `\n` only; a trailing `\r` is left in place for the
/// event parser, which trims each line anyway.
#[derive(Debug, Default)]
pub struct LineDecoder {
    utf8: Utf8Decoder,
    buffer: String,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.utf8.decode(chunk);
        if text.is_empty() {
            return Vec::new();
        }

        // The buffer never holds a newline between calls, so only the new
        // text needs scanning for the first terminator.
        let old_len = self.buffer.len();
        self.buffer.push_str(&text);
        let Some(first) = self.buffer[old_len..].find('\n') else {
            return Vec::new();
        };

        let mut lines = Vec::new();
        let mut start = 0;
        let mut end = old_len + first;
        loop {
            lines.push(self.buffer[start..end].to_string());
            start = end + 1;
            match self.buffer[start..].find('\n') {
                Some(pos) => end = start + pos,
                None => break,
            }
        }
        self.buffer.drain(..start);
        lines
    }

    /// The current partial line (text after the last newline).
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Ends the stream.
    ///
    /// Residual content is not a complete line and is never interpreted; it is
    /// returned only so callers can log what was dropped.
    pub fn finish(&mut self) -> Option<String> {
        let dropped_bytes = self.utf8.reset();
        let residual = std::mem::take(&mut self.buffer);
        if residual.is_empty() && dropped_bytes == 0 {
            None
        } else {
            Some(residual)
        }
    }
}

/// Adapts a chunked byte stream into a stream of complete lines.
///
/// A transport error is yielded once as [`ClientError`] of kind `Transport`,
/// after which the stream is exhausted. The unterminated tail of the body is
/// discarded at end of stream.
pub struct LineStream<S> {
    inner: S,
    decoder: LineDecoder,
    ready: VecDeque<String>,
    finished: bool,
}

impl<S> LineStream<S> {
    pub fn new(stream: S) -> Self {
        Self {
            inner: stream,
            decoder: LineDecoder::new(),
            ready: VecDeque::new(),
            finished: false,
        }
    }
}

impl<S, E> Stream for LineStream<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: fmt::Display,
{
    type Item = ClientResult<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(line) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(line)));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    this.ready.extend(this.decoder.push(&chunk));
                }
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    if let Some(partial) = this.decoder.finish() {
                        tracing::debug!(bytes = partial.len(), "dropping partial line after transport error");
                    }
                    return Poll::Ready(Some(Err(ClientError::transport(format!(
                        "Stream read error: {e}"
                    )))));
                }
                Poll::Ready(None) => {
                    this.finished = true;
                    if let Some(residual) = this.decoder.finish() {
                        tracing::debug!(
                            bytes = residual.len(),
                            "discarding unterminated line at end of stream"
                        );
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
