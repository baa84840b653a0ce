//! Decoding of streamed JSON bodies.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;

use crate::decoders::frames::FrameSplitter;
use crate::error::{DecodeError, Error};
use crate::http_client;

/// Turns the raw bytes of one complete frame into a value.
pub type FrameDecoder<T> = fn(&[u8]) -> Result<T, DecodeError>;

pin_project! {
    /// Decoder for a body of JSON objects, one per frame, usually one per line.
    ///
    /// Bytes from the inner stream are split into frames and every frame is handed, untouched, to
    /// the frame decoder. The first failure, be it a transport error or an undecodable frame, is
    /// yielded once and ends the stream.
    pub struct JsonStreamDecoder<S, T> {
        #[pin]
        stream: S,
        splitter: FrameSplitter,
        decode_frame: FrameDecoder<T>,
        buffer: VecDeque<T>,
        error: Option<Error>,
        finished: bool,
    }
}

impl<S, T> JsonStreamDecoder<S, T>
where
    S: Stream<Item = http_client::Result<Bytes>>,
{
    pub fn new(stream: S, decode_frame: FrameDecoder<T>) -> Self {
        Self {
            stream,
            splitter: FrameSplitter::new(),
            decode_frame,
            buffer: VecDeque::new(),
            error: None,
            finished: false,
        }
    }
}

fn decode_frames<T>(
    frames: Vec<Bytes>,
    decode_frame: FrameDecoder<T>,
    buffer: &mut VecDeque<T>,
) -> Result<(), DecodeError> {
    for frame in frames {
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!(
                target: "yafm::completions",
                frame = %String::from_utf8_lossy(&frame),
                "Received stream frame"
            );
        }

        buffer.push_back(decode_frame(&frame)?);
    }

    Ok(())
}

impl<S, T> Stream for JsonStreamDecoder<S, T>
where
    S: Stream<Item = http_client::Result<Bytes>>,
{
    type Item = Result<T, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(item) = this.buffer.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }

            if let Some(err) = this.error.take() {
                return Poll::Ready(Some(Err(err)));
            }

            if *this.finished {
                return Poll::Ready(None);
            }

            let frames = match this.stream.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(chunk))) => this.splitter.decode(&chunk),
                Poll::Ready(Some(Err(err))) => {
                    *this.finished = true;
                    return Poll::Ready(Some(Err(Error::Http(err))));
                }
                Poll::Ready(None) => {
                    *this.finished = true;
                    this.splitter.flush()
                }
            };

            // frames decoded ahead of a broken one are still delivered, then the error
            if let Err(err) = decode_frames(frames, *this.decode_frame, this.buffer) {
                *this.error = Some(Error::Decode(err));
                *this.finished = true;
            }
        }
    }
}
