/// Longest line kept, in bytes. SSE events and reply lines are far shorter.
pub const MAX_LINE_BYTES: usize = 1 << 20;

/// Splits a chunked byte stream into text lines.
///
/// Chunks may end anywhere: mid-line or in the middle of a multi-byte UTF-8
/// sequence. Bytes after the last `\n` are held back until a later chunk
/// completes the line. `\n` never occurs inside a UTF-8 sequence, so lines are
/// only decoded once they are whole.
///
/// A line that outgrows the limit is dropped up to its next `\n` and counted
/// in [`LineBuffer::dropped_lines`].
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    max_line: usize,
    skipping: bool,
    dropped: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line,
            skipping: false,
            dropped: 0,
        }
    }

    /// Feed a chunk and take every line it completes, without terminators.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for piece in chunk.split_inclusive(|&b| b == b'\n') {
            let (body, complete) = match piece.split_last() {
                Some((b'\n', body)) => (body, true),
                _ => (piece, false),
            };

            if self.skipping {
                self.skipping = !complete;
                continue;
            }
            if self.pending.len() + body.len() > self.max_line {
                self.pending.clear();
                self.dropped += 1;
                self.skipping = !complete;
                continue;
            }

            self.pending.extend_from_slice(body);
            if complete {
                lines.push(decode_line(&self.pending));
                self.pending.clear();
            }
        }
        lines
    }

    /// Flush whatever is left once the stream has closed.
    pub fn finish(&mut self) -> Option<String> {
        self.skipping = false;
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(decode_line(&rest))
    }

    /// Whether bytes of an unterminated line are buffered.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Lines dropped for exceeding the length limit.
    pub fn dropped_lines(&self) -> usize {
        self.dropped
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
