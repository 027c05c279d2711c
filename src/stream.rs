use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::StreamExt;

use crate::error::LLMError;
use crate::http::HttpBodyStream;

/// One server-sent event frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// A `data:` payload, with the optional `event:` name that preceded it.
    Data { event: Option<String>, data: String },
    /// The OpenAI-style `[DONE]` sentinel.
    Done,
}

/// Splits a raw HTTP body into [`SseFrame`] values.
///
/// Frames are yielded strictly in arrival order; a frame is complete once its blank
/// separator line arrives or the body ends.
pub struct SseDecoder {
    body: HttpBodyStream,
    buffer: Vec<u8>,
    event_name: Option<String>,
    data_lines: Vec<Vec<u8>>,
    pending: VecDeque<SseFrame>,
    schema: &'static str,
    body_finished: bool,
    done_received: bool,
}

impl SseDecoder {
    pub fn new(body: HttpBodyStream, schema: &'static str) -> Self {
        Self {
            body,
            buffer: Vec::new(),
            event_name: None,
            data_lines: Vec::new(),
            pending: VecDeque::new(),
            schema,
            body_finished: false,
            done_received: false,
        }
    }

    fn handle_line(&mut self, line: &[u8]) -> Result<(), LLMError> {
        if line.is_empty() {
            return self.flush_frame();
        }
        if let Some(rest) = line.strip_prefix(b"data:") {
            let rest = rest.strip_prefix(b" ").unwrap_or(rest);
            self.data_lines.push(rest.to_vec());
        } else if let Some(rest) = line.strip_prefix(b"event:") {
            let name = String::from_utf8_lossy(rest).trim().to_string();
            self.event_name = (!name.is_empty()).then_some(name);
        }
        Ok(())
    }

    fn flush_frame(&mut self) -> Result<(), LLMError> {
        let event = self.event_name.take();
        if self.data_lines.is_empty() {
            return Ok(());
        }
        let joined = self.data_lines.drain(..).collect::<Vec<_>>().join(&b'\n');
        let data = String::from_utf8(joined).map_err(|err| {
            LLMError::provider(self.schema, format!("invalid UTF-8 in stream chunk: {err}"))
        })?;

        if data.trim() == "[DONE]" {
            if !self.done_received {
                self.done_received = true;
                self.pending.push_back(SseFrame::Done);
            }
        } else if !data.trim().is_empty() {
            self.pending.push_back(SseFrame::Data { event, data });
        }
        Ok(())
    }

    fn drain_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
        let pos = buffer.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = buffer.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }
}

impl Stream for SseDecoder {
    type Item = Result<SseFrame, LLMError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(frame) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(frame)));
            }
            if this.body_finished || this.done_received {
                return Poll::Ready(None);
            }

            match this.body.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.buffer.extend_from_slice(&bytes);
                    while let Some(line) = Self::drain_line(&mut this.buffer) {
                        if let Err(err) = this.handle_line(&line) {
                            return Poll::Ready(Some(Err(err)));
                        }
                    }
                }
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Some(Err(err))),
                Poll::Ready(None) => {
                    this.body_finished = true;
                    let rest = std::mem::take(&mut this.buffer);
                    let flushed = if rest.is_empty() {
                        Ok(())
                    } else {
                        this.handle_line(&rest)
                    }
                    .and_then(|()| this.flush_frame());
                    if let Err(err) = flushed {
                        return Poll::Ready(Some(Err(err)));
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Drains an error body that arrived on a streaming request.
pub(crate) async fn collect_stream_text(
    mut body: HttpBodyStream,
    schema: &'static str,
) -> Result<String, LLMError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        bytes.extend_from_slice(&chunk?);
    }
    String::from_utf8(bytes).map_err(|err| {
        LLMError::provider(schema, format!("failed to decode stream error body: {err}"))
    })
}
