use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

const CHUNK_SIZE_BYTES: usize = 8192;

/// Byte bound on a single logical line before it is discarded.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// Outcome of one [`BoundedLineReader::next_event`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// One complete logical line with the trailing newline (and a trailing
    /// carriage return, if any) stripped.
    Line(Vec<u8>),
    /// A line exceeded the byte bound and was discarded whole.
    TooLong { observed_bytes: usize },
}

/// Line reader with bounded memory over any [`AsyncRead`].
///
/// A logical line that arrives split across read buffers is reassembled
/// before being emitted; partial segments are never surfaced as separate
/// lines. The partially accumulated line lives in the reader, so dropping a
/// pending `next_event` future (e.g. from a `select!`) loses nothing.
pub struct BoundedLineReader<R> {
    reader: R,
    max_line_bytes: usize,
    buffer: [u8; CHUNK_SIZE_BYTES],
    buffer_pos: usize,
    buffer_len: usize,
    current_line: Vec<u8>,
    observed_bytes: usize,
    discard_mode: bool,
    pending_too_long: bool,
    done: bool,
}

impl<R: AsyncRead + Unpin> BoundedLineReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_max_line_bytes(reader, DEFAULT_MAX_LINE_BYTES)
    }

    pub fn with_max_line_bytes(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader,
            max_line_bytes,
            buffer: [0u8; CHUNK_SIZE_BYTES],
            buffer_pos: 0,
            buffer_len: 0,
            current_line: Vec::new(),
            observed_bytes: 0,
            discard_mode: false,
            pending_too_long: false,
            done: false,
        }
    }

    /// Next complete line. `Ok(None)` is end of stream; a final line without
    /// a trailing newline is still emitted before that.
    pub async fn next_event(&mut self) -> io::Result<Option<LineEvent>> {
        if self.done {
            return Ok(None);
        }

        loop {
            if self.buffer_pos >= self.buffer_len {
                let n = self.reader.read(&mut self.buffer).await?;
                self.buffer_pos = 0;
                self.buffer_len = n;
                if n == 0 {
                    self.done = true;
                    if self.pending_too_long || !self.current_line.is_empty() {
                        return Ok(Some(self.finish_line()));
                    }
                    return Ok(None);
                }
            }

            let (newline_idx, slice_len) = {
                let slice = &self.buffer[self.buffer_pos..self.buffer_len];
                (slice.iter().position(|b| *b == b'\n'), slice.len())
            };

            let Some(newline_idx) = newline_idx else {
                self.observe_bytes(slice_len);
                if !self.discard_mode {
                    let slice = &self.buffer[self.buffer_pos..self.buffer_len];
                    self.current_line.extend_from_slice(slice);
                }
                self.buffer_pos = self.buffer_len;
                continue;
            };

            self.observe_bytes(newline_idx);
            if !self.discard_mode {
                let segment = &self.buffer[self.buffer_pos..self.buffer_pos + newline_idx];
                self.current_line.extend_from_slice(segment);
            }
            self.buffer_pos = self.buffer_pos + newline_idx + 1;
            return Ok(Some(self.finish_line()));
        }
    }

    fn finish_line(&mut self) -> LineEvent {
        if self.pending_too_long {
            let observed_bytes = self.observed_bytes;
            self.reset_line_state();
            return LineEvent::TooLong { observed_bytes };
        }

        let mut bytes = std::mem::take(&mut self.current_line);
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        self.reset_line_state();
        LineEvent::Line(bytes)
    }

    fn reset_line_state(&mut self) {
        self.current_line.clear();
        self.observed_bytes = 0;
        self.discard_mode = false;
        self.pending_too_long = false;
    }

    fn observe_bytes(&mut self, additional: usize) {
        self.observed_bytes = self.observed_bytes.saturating_add(additional);
        if self.observed_bytes > self.max_line_bytes && !self.discard_mode {
            self.discard_mode = true;
            self.pending_too_long = true;
            self.current_line.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::{AsyncRead, ReadBuf};

    use super::*;

    /// Delivers each scripted chunk in its own `read` call, forcing lines to
    /// arrive split across reads.
    struct StutterReader {
        chunks: VecDeque<Vec<u8>>,
    }

    impl StutterReader {
        fn new(chunks: &[&[u8]]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| c.to_vec()).collect(),
            }
        }
    }

    impl AsyncRead for StutterReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if let Some(chunk) = self.chunks.pop_front() {
                buf.put_slice(&chunk);
            }
            Poll::Ready(Ok(()))
        }
    }

    async fn collect_lines<R: AsyncRead + Unpin>(mut reader: BoundedLineReader<R>) -> Vec<LineEvent> {
        let mut events = Vec::new();
        while let Some(event) = reader.next_event().await.expect("read") {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn line_split_across_three_reads_is_one_line() {
        let reader = StutterReader::new(&[b"he", b"llo wo", b"rld\n"]);
        let events = collect_lines(BoundedLineReader::new(reader)).await;
        assert_eq!(events, vec![LineEvent::Line(b"hello world".to_vec())]);
    }

    #[tokio::test]
    async fn newline_split_from_its_line_joins_correctly() {
        let reader = StutterReader::new(&[b"alpha", b"\nbeta", b"\n"]);
        let events = collect_lines(BoundedLineReader::new(reader)).await;
        assert_eq!(
            events,
            vec![
                LineEvent::Line(b"alpha".to_vec()),
                LineEvent::Line(b"beta".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn final_line_without_newline_is_emitted() {
        let reader = BoundedLineReader::new(std::io::Cursor::new(b"a\nb".to_vec()));
        let events = collect_lines(reader).await;
        assert_eq!(
            events,
            vec![LineEvent::Line(b"a".to_vec()), LineEvent::Line(b"b".to_vec())]
        );
    }

    #[tokio::test]
    async fn carriage_return_is_stripped() {
        let reader = BoundedLineReader::new(std::io::Cursor::new(b"one\r\ntwo\r\n".to_vec()));
        let events = collect_lines(reader).await;
        assert_eq!(
            events,
            vec![LineEvent::Line(b"one".to_vec()), LineEvent::Line(b"two".to_vec())]
        );
    }

    #[tokio::test]
    async fn oversized_line_is_discarded_and_iteration_continues() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"ok\n");
        bytes.extend_from_slice(&vec![b'a'; 50]);
        bytes.extend_from_slice(b"\nnext\n");

        let reader =
            BoundedLineReader::with_max_line_bytes(std::io::Cursor::new(bytes), 16);
        let events = collect_lines(reader).await;

        assert_eq!(events.len(), 3);
        assert_eq!(events[0], LineEvent::Line(b"ok".to_vec()));
        assert!(matches!(events[1], LineEvent::TooLong { observed_bytes: 50 }));
        assert_eq!(events[2], LineEvent::Line(b"next".to_vec()));
    }

    #[tokio::test]
    async fn empty_input_yields_no_lines() {
        let reader = BoundedLineReader::new(std::io::Cursor::new(Vec::new()));
        let events = collect_lines(reader).await;
        assert!(events.is_empty());
    }
}
