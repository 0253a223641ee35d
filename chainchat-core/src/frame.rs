//! Frame reassembly for the chat event stream.
//!
//! Contract:
//! - Chunk boundaries carry no meaning: a frame may span many chunks and
//!   one chunk may carry many frames.
//! - A frame is emitted exactly once, only after its closing blank line
//!   has been seen; a frame that never closed is never emitted.
//! - Segments missing an `event:` or `data:` line (keep-alives, comments)
//!   yield nothing and are not an error.

use bytes::Bytes;
use futures_util::stream::Stream;

use crate::error::{ChainChatError, CoreResult};

/// Cap on text buffered while waiting for a frame separator. A peer that
/// never sends a blank line would otherwise grow the buffer forever.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 256 * 1024;

const EVENT_PREFIX: &str = "event:";
const DATA_PREFIX: &str = "data:";

/// One complete wire frame: an event label plus its raw payload text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event: String,
    pub data: String,
}

/// Boxed stream of raw body chunks, as handed over by the transport layer.
pub type ByteStream = futures::stream::BoxStream<'static, CoreResult<Bytes>>;

/// Reassembles blank-line-delimited frames from a chunked byte stream.
///
/// Bytes are decoded incrementally: an undecoded tail is carried between
/// chunks so a multi-byte character split at a chunk boundary survives
/// intact. CRLF pairs are folded to LF, including pairs split across
/// chunks.
pub struct FrameStream {
    inner: ByteStream,
    pending: Vec<u8>,
    buf: String,
    max_frame_bytes: usize,
    done: bool,
}

impl FrameStream {
    pub fn new(inner: ByteStream) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            buf: String::new(),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            done: false,
        }
    }

    /// Overrides the buffered-segment cap (see [`DEFAULT_MAX_FRAME_BYTES`]).
    pub fn with_max_frame_bytes(mut self, limit: usize) -> Self {
        self.max_frame_bytes = limit;
        self
    }

    fn append_chunk(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        self.pending.extend_from_slice(chunk);
        let mut text = String::new();
        drain_utf8(&mut self.pending, &mut text);
        if text.is_empty() {
            return;
        }
        // A CRLF pair may arrive split across two chunks.
        if self.buf.ends_with('\r') && text.starts_with('\n') {
            self.buf.pop();
        }
        if text.contains('\r') {
            self.buf.push_str(&text.replace("\r\n", "\n"));
        } else {
            self.buf.push_str(&text);
        }
    }
}

impl Stream for FrameStream {
    type Item = CoreResult<Frame>;

    fn poll_next(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;
        let this = self.get_mut();
        loop {
            if this.done {
                return Poll::Ready(None);
            }

            // Extract every complete segment already in the buffer, always
            // leaving the trailing (possibly incomplete) segment behind.
            while let Some(idx) = this.buf.find("\n\n") {
                let segment: String = this.buf.drain(..idx + 2).collect();
                if let Some(frame) = parse_segment(&segment[..idx]) {
                    return Poll::Ready(Some(Ok(frame)));
                }
            }

            if this.buf.len() > this.max_frame_bytes {
                this.done = true;
                return Poll::Ready(Some(Err(ChainChatError::FrameTooLarge {
                    limit: this.max_frame_bytes,
                })));
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    this.append_chunk(&chunk);
                    continue;
                }
                Poll::Ready(Some(Err(e))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    // A frame that never closed is never emitted.
                    this.done = true;
                    this.pending.clear();
                    this.buf.clear();
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Moves every byte that forms complete UTF-8 out of `pending` into `out`,
/// keeping an incomplete trailing sequence for the next chunk. Invalid
/// sequences decode to U+FFFD.
fn drain_utf8(pending: &mut Vec<u8>, out: &mut String) {
    loop {
        match std::str::from_utf8(pending) {
            Ok(s) => {
                out.push_str(s);
                pending.clear();
                return;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                // `valid_up_to` guarantees the prefix is UTF-8.
                out.push_str(std::str::from_utf8(&pending[..valid]).unwrap());
                match e.error_len() {
                    None => {
                        pending.drain(..valid);
                        return;
                    }
                    Some(n) => {
                        out.push('\u{FFFD}');
                        pending.drain(..valid + n);
                    }
                }
            }
        }
    }
}

/// Parses one separator-terminated segment into a frame. The first
/// `event:` line supplies the label, the first `data:` line the payload;
/// anything else is ignored. Returns `None` when either part is missing
/// or empty.
fn parse_segment(segment: &str) -> Option<Frame> {
    let mut event: Option<&str> = None;
    let mut data: Option<&str> = None;
    for line in segment.lines() {
        if event.is_none()
            && let Some(rest) = line.strip_prefix(EVENT_PREFIX)
        {
            let rest = rest.trim();
            if !rest.is_empty() {
                event = Some(rest);
            }
        } else if data.is_none()
            && let Some(rest) = line.strip_prefix(DATA_PREFIX)
        {
            let rest = rest.strip_prefix(' ').unwrap_or(rest);
            if !rest.is_empty() {
                data = Some(rest);
            }
        }
    }
    match (event, data) {
        (Some(event), Some(data)) => Some(Frame {
            event: event.to_string(),
            data: data.to_string(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    const WIRE: &str = concat!(
        "event: step\n",
        "data: {\"step\":\"intent\",\"status\":\"running\",\"label\":\"Classifying\"}\n",
        "\n",
        "event: step\n",
        "data: {\"step\":\"intent\",\"status\":\"complete\",\"label\":\"Classified\"}\n",
        "\n",
        "event: result\n",
        "data: {\"reply\":\"héllo ✂ über\",\"response_id\":\"r1\"}\n",
        "\n",
    );

    async fn collect(chunks: Vec<Bytes>) -> CoreResult<Vec<Frame>> {
        let items: Vec<CoreResult<Bytes>> = chunks.into_iter().map(Ok).collect();
        let inner: ByteStream = Box::pin(futures_util::stream::iter(items));
        let mut stream = FrameStream::new(inner);
        let mut out = Vec::new();
        while let Some(frame) = stream.next().await {
            out.push(frame?);
        }
        Ok(out)
    }

    fn split_every(input: &str, n: usize) -> Vec<Bytes> {
        input
            .as_bytes()
            .chunks(n)
            .map(Bytes::copy_from_slice)
            .collect()
    }

    #[tokio::test]
    async fn one_chunk_per_frame() {
        let frames = collect(split_every(WIRE, WIRE.len())).await.unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].event, "step");
        assert_eq!(frames[2].event, "result");
        assert!(frames[2].data.contains("héllo"));
    }

    #[tokio::test]
    async fn chunking_does_not_change_the_frame_sequence() {
        // WIRE contains multi-byte characters, so 1-byte chunks also prove
        // the decoder carries split characters across chunk boundaries.
        let reference = collect(split_every(WIRE, WIRE.len())).await.unwrap();
        for n in [1, 2, 3, 5, 7, 16, 64] {
            let frames = collect(split_every(WIRE, n)).await.unwrap();
            assert_eq!(frames, reference, "split size {n}");
        }
    }

    #[tokio::test]
    async fn many_frames_in_one_chunk_plus_partial_tail() {
        let input = format!("{WIRE}event: step\ndata: {{\"never\":");
        let frames = collect(vec![Bytes::from(input)]).await.unwrap();
        // The unterminated tail is discarded at end of stream.
        assert_eq!(frames.len(), 3);
    }

    #[tokio::test]
    async fn empty_frame_and_comment_lines_are_skipped() {
        let input = "\n\n: keep-alive\n\nevent: step\n\ndata: {}\n\nevent: step\ndata: {\"x\":1}\n\n";
        let frames = collect(vec![Bytes::from(input)]).await.unwrap();
        // Only the last segment carries both an event and a data line.
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "{\"x\":1}");
    }

    #[tokio::test]
    async fn empty_chunks_are_a_no_op() {
        let chunks = vec![
            Bytes::new(),
            Bytes::from("event: step\ndata: {\"x\":1}"),
            Bytes::new(),
            Bytes::from("\n\n"),
        ];
        let frames = collect(chunks).await.unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[tokio::test]
    async fn crlf_separators_parse_even_when_split() {
        let input = "event: step\r\ndata: {\"x\":1}\r\n\r\n";
        let reference = collect(vec![Bytes::from(input)]).await.unwrap();
        assert_eq!(reference.len(), 1);
        assert_eq!(reference[0].data, "{\"x\":1}");
        for n in [1, 2, 3] {
            let frames = collect(split_every(input, n)).await.unwrap();
            assert_eq!(frames, reference, "split size {n}");
        }
    }

    #[tokio::test]
    async fn transport_error_terminates_the_stream() {
        let chunks: Vec<CoreResult<Bytes>> = vec![
            Ok(Bytes::from("event: step\ndata: {\"x\":1}\n\n")),
            Err(ChainChatError::Transport("connection reset".into())),
        ];
        let inner: ByteStream = Box::pin(futures_util::stream::iter(chunks));
        let mut stream = FrameStream::new(inner);
        assert!(stream.next().await.unwrap().is_ok());
        assert!(matches!(
            stream.next().await.unwrap(),
            Err(ChainChatError::Transport(_))
        ));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn oversized_segment_fails_distinctly() {
        let chunks: Vec<CoreResult<Bytes>> = vec![
            Ok(Bytes::from("data: ".to_string() + &"x".repeat(128))),
            Ok(Bytes::from("never a separator".to_string())),
        ];
        let inner: ByteStream = Box::pin(futures_util::stream::iter(chunks));
        let mut stream = FrameStream::new(inner).with_max_frame_bytes(64);
        assert!(matches!(
            stream.next().await.unwrap(),
            Err(ChainChatError::FrameTooLarge { limit: 64 })
        ));
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn segment_parsing_tolerates_order_and_noise() {
        let frame = parse_segment("id: 7\ndata: {\"a\":1}\nretry: 100\nevent: step").unwrap();
        assert_eq!(frame.event, "step");
        assert_eq!(frame.data, "{\"a\":1}");

        assert!(parse_segment("event: step").is_none());
        assert!(parse_segment("data: {}").is_none());
        assert!(parse_segment("event: \ndata: {}").is_none());
        assert!(parse_segment("event: step\ndata: ").is_none());
        assert!(parse_segment("").is_none());
    }

    #[test]
    fn data_keeps_inner_whitespace_but_drops_one_leading_space() {
        let frame = parse_segment("event: step\ndata:  {\"a\": 1} ").unwrap();
        assert_eq!(frame.data, " {\"a\": 1} ");
    }
}
