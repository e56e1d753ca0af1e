//! Server-Sent Events framing.
//!
//! The MCP SSE transport delivers every server message as a `data:` line on a
//! long-lived `text/event-stream` response. [`FrameReader`] turns the raw body
//! chunks into those payloads regardless of where the network split them.

use crate::error::{McpError, McpResult};

/// Marker that prefixes lines carrying event data.
pub const DATA_MARKER: &str = "data:";

/// Longest unterminated line held before the stream is given up on.
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Incremental `data:` line extractor for an SSE byte stream.
///
/// Lines end with `\n`, `\r\n` or a bare `\r`.
#[derive(Debug)]
pub struct FrameReader {
    buffer: Vec<u8>,
    /// The last terminator was `\r`; a `\n` right after it belongs to it.
    after_cr: bool,
    max_line: usize,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            after_cr: false,
            max_line,
        }
    }

    /// Feed one chunk and return the payloads of every `data:` line it completed.
    ///
    /// Bytes after the last line terminator stay buffered until a later chunk
    /// finishes the line, so payloads split mid-line (or mid-character) are
    /// emitted whole and exactly once. Fails when an unterminated line grows
    /// past the configured limit.
    pub fn push(&mut self, chunk: &[u8]) -> McpResult<Vec<String>> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        let mut start = 0;

        while let Some(offset) = self.buffer[start..]
            .iter()
            .position(|b| *b == b'\n' || *b == b'\r')
        {
            let end = start + offset;
            let terminator = self.buffer[end];

            if self.after_cr && end == start && terminator == b'\n' {
                self.after_cr = false;
                start = end + 1;
                continue;
            }

            let line = String::from_utf8_lossy(&self.buffer[start..end]);
            if let Some(payload) = data_payload(&line) {
                payloads.push(payload.to_string());
            }
            self.after_cr = terminator == b'\r';
            start = end + 1;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        if self.buffer.len() > self.max_line {
            return Err(McpError::connection_failed(format!(
                "Event stream line exceeds {} bytes",
                self.max_line
            )));
        }

        Ok(payloads)
    }

    /// Bytes received but not yet terminated.
    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Extract the payload of a single SSE line, if it is a `data:` line.
pub fn data_payload(line: &str) -> Option<&str> {
    line.trim().strip_prefix(DATA_MARKER).map(str::trim)
}
