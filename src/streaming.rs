//! Streamed completions.
//!
//! The API re-sends the whole state of the generation with every frame: each item of a
//! [StreamingCompletion] is a complete [CompletionResult] snapshot, not a delta. The last
//! snapshot of a well-behaved stream has a final status.
//!
//! Example Usage:
//! ```rust
//! use futures::StreamExt;
//!
//! let mut stream = client.complete_streaming(request).await?;
//! while let Some(snapshot) = stream.next().await {
//!     let snapshot = snapshot?;
//!     println!("{}", snapshot.text().unwrap_or_default());
//! }
//! ```

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tracing_futures::{Instrument, Instrumented};

use crate::completion::CompletionResult;
use crate::decoders::json_stream::JsonStreamDecoder;
use crate::error::Result;
use crate::http_client::ByteStream;
use crate::response::decode_result;

/// A lazily consumed stream of completion snapshots, one per frame sent by the server.
///
/// Frames are only read when the stream is polled. The stream cannot be restarted; dropping it
/// drops the underlying response body.
pub struct StreamingCompletion {
    inner: Instrumented<JsonStreamDecoder<ByteStream, CompletionResult>>,
    received: usize,
    saw_final: bool,
    ended: bool,
}

impl StreamingCompletion {
    pub(crate) fn new(body: ByteStream, span: tracing::Span) -> Self {
        Self {
            inner: JsonStreamDecoder::new(body, decode_result::<CompletionResult>).instrument(span),
            received: 0,
            saw_final: false,
            ended: false,
        }
    }

    /// Drain the stream and return the last snapshot, which holds the whole answer. `None` if the
    /// server closed the stream without sending anything.
    pub async fn last(mut self) -> Result<Option<CompletionResult>> {
        let mut last = None;
        while let Some(snapshot) = self.next().await {
            last = Some(snapshot?);
        }
        Ok(last)
    }

    fn finish(&mut self) {
        if std::mem::replace(&mut self.ended, true) {
            return;
        }

        let _guard = self.inner.span().enter();
        if self.saw_final {
            tracing::debug!(target: "yafm::completions", frames = self.received, "Stream finished");
        } else {
            tracing::warn!(
                target: "yafm::completions",
                frames = self.received,
                "Stream ended without a final alternative status"
            );
        }
    }
}

impl Stream for StreamingCompletion {
    type Item = Result<CompletionResult>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.ended {
            return Poll::Ready(None);
        }

        match self.inner.poll_next_unpin(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(snapshot))) => {
                self.received += 1;
                self.saw_final = snapshot.is_final();
                if self.saw_final {
                    let span = self.inner.span();
                    span.record("gen_ai.usage.input_tokens", snapshot.usage.input_text_tokens);
                    span.record("gen_ai.usage.output_tokens", snapshot.usage.completion_tokens);
                    span.record("gen_ai.response.model", snapshot.model_version.as_str());
                }
                Poll::Ready(Some(Ok(snapshot)))
            }
            Poll::Ready(Some(Err(err))) => {
                self.ended = true;
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                self.finish();
                Poll::Ready(None)
            }
        }
    }
}
