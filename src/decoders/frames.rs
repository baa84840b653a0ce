//! Splitting of a streamed body into JSON frames.

use bytes::Bytes;
use serde::de::IgnoredAny;

/// An incremental splitter for a body made of concatenated JSON values.
///
/// Frames may be separated by newlines (`\n`, `\r\n`, `\r`), by other whitespace or by nothing at
/// all, and both a frame and a multi-byte UTF-8 sequence may be cut across chunks. Bytes are
/// buffered until a whole value is available. Frames are handed out as raw bytes; nothing is
/// decoded or re-encoded here.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    buffer: Vec<u8>,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return the frames it completes.
    ///
    /// Malformed input is not an error here: it is returned as the last frame, together with
    /// everything buffered after it, so that decoding it reports the failure.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(chunk);

        let (frames, consumed) = {
            let mut frames = Vec::new();
            let mut consumed = 0;
            let mut values =
                serde_json::Deserializer::from_slice(&self.buffer).into_iter::<IgnoredAny>();

            loop {
                match values.next() {
                    Some(Ok(_)) => {
                        let end = values.byte_offset();
                        frames.extend(frame(&self.buffer, consumed, end));
                        consumed = end;
                    }
                    // only whitespace left
                    None => {
                        consumed = self.buffer.len();
                        break;
                    }
                    // the transport cut a frame, wait for the rest
                    Some(Err(err)) if err.is_eof() => break,
                    Some(Err(_)) => {
                        frames.extend(frame(&self.buffer, consumed, self.buffer.len()));
                        consumed = self.buffer.len();
                        break;
                    }
                }
            }

            (frames, consumed)
        };

        self.buffer.drain(..consumed);
        frames
    }

    /// Flush the unfinished tail once the input has ended. A non-blank tail is a truncated
    /// frame and is returned as is.
    pub fn flush(&mut self) -> Vec<Bytes> {
        let rest = std::mem::take(&mut self.buffer);
        frame(&rest, 0, rest.len()).into_iter().collect()
    }
}

fn frame(buffer: &[u8], start: usize, end: usize) -> Option<Bytes> {
    buffer
        .get(start..end)
        .map(<[u8]>::trim_ascii)
        .filter(|frame| !frame.is_empty())
        .map(Bytes::copy_from_slice)
}

/// Split multiple chunks, with an option to flush
pub fn decode_chunks(chunks: &[&[u8]], flush: bool) -> Vec<Bytes> {
    let mut splitter = FrameSplitter::new();
    let mut frames = Vec::new();

    for chunk in chunks {
        frames.extend(splitter.decode(chunk));
    }

    if flush {
        frames.extend(splitter.flush());
    }

    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(chunks: &[&str], flush: bool) -> Vec<String> {
        let byte_chunks: Vec<&[u8]> = chunks.iter().map(|s| s.as_bytes()).collect();
        decode_chunks(&byte_chunks, flush)
            .into_iter()
            .map(|frame| String::from_utf8(frame.to_vec()).unwrap())
            .collect()
    }

    #[test]
    fn test_newline_delimited() {
        assert_eq!(
            split(&["{\"n\":1}\n{\"n\":2}\n"], false),
            vec!["{\"n\":1}", "{\"n\":2}"]
        );
        assert_eq!(
            split(&["{\"n\":1}\r\n", "{\"n\":2}\r{\"n\":3}"], false),
            vec!["{\"n\":1}", "{\"n\":2}", "{\"n\":3}"]
        );
    }

    #[test]
    fn test_back_to_back_objects() {
        assert_eq!(
            split(&["{\"n\":1}{\"n\":2}", "{\"n\":3}"], false),
            vec!["{\"n\":1}", "{\"n\":2}", "{\"n\":3}"]
        );
    }

    #[test]
    fn test_frame_split_across_chunks() {
        // the second frame is not complete yet
        assert_eq!(split(&["{\"n\":1}\n{\"n\"", ":2"], false), vec!["{\"n\":1}"]);
        assert_eq!(
            split(&["{\"n\":1}\n{\"n\"", ":2", "}"], false),
            vec!["{\"n\":1}", "{\"n\":2}"]
        );
    }

    #[test]
    fn test_escaped_braces_and_new_lines() {
        assert_eq!(
            split(&["{\"text\":\"a}\\n{b\"}", "\n"], false),
            vec!["{\"text\":\"a}\\n{b\"}"]
        );
    }

    #[test]
    fn test_multi_byte_characters_across_chunks() {
        let mut splitter = FrameSplitter::new();
        let frame = "{\"text\":\"известни\"}".as_bytes();
        let (head, tail) = frame.split_at(12);

        assert!(splitter.decode(head).is_empty());
        assert_eq!(splitter.decode(tail), vec![Bytes::copy_from_slice(frame)]);
    }

    #[test]
    fn test_invalid_utf8_is_kept_verbatim() {
        let frames = decode_chunks(&[b"{\"text\":\"ok \xff\"}\n".as_slice()], false);
        assert_eq!(frames, vec![Bytes::from_static(b"{\"text\":\"ok \xff\"}")]);
    }

    #[test]
    fn test_malformed_input_is_returned_whole() {
        assert_eq!(
            split(&["{\"n\":1}\n[1,,]\n{\"n\":3}"], false),
            vec!["{\"n\":1}", "[1,,]\n{\"n\":3}"]
        );
    }

    #[test]
    fn test_flushing() {
        assert!(split(&[], true).is_empty());
        assert!(split(&["\n", " \r\n"], true).is_empty());
        assert_eq!(split(&["{\"n\":1}\n{\"n\""], true), vec!["{\"n\":1}", "{\"n\""]);
    }
}
