//! Newline-delimited JSON framing for the stdio transport.

use bytes::{Buf, BytesMut};

use crate::error::{McpResult, ProtocolError};
use crate::messages::JsonRpcMessage;

/// Accumulates raw bytes and yields one JSON-RPC message per complete line.
///
/// Bytes are buffered until a `\n` arrives, so a chunk boundary may fall
/// anywhere, including inside a multi-byte UTF-8 sequence.
///
/// ```rust
/// use mcp_client::transport::ReadBuffer;
///
/// let mut buffer = ReadBuffer::new();
/// buffer.append(br#"{"jsonrpc":"2.0","id":0,"res"#);
/// assert!(buffer.read_message().unwrap().is_none());
///
/// buffer.append(b"ult\":{}}\n");
/// assert!(buffer.read_message().unwrap().is_some());
/// ```
#[derive(Debug, Default)]
pub struct ReadBuffer {
    buffer: BytesMut,
}

impl ReadBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of bytes read from the wire.
    pub fn append(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Extract the next complete message.
    ///
    /// Returns `Ok(None)` when no complete line is buffered. A line that is not
    /// a valid JSON-RPC message is consumed and reported as an error, so the
    /// next call continues with the following line. Blank lines are skipped.
    pub fn read_message(&mut self) -> McpResult<Option<JsonRpcMessage>> {
        loop {
            let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') else {
                return Ok(None);
            };

            let line = self.buffer.split_to(newline);
            self.buffer.advance(1);

            let text = std::str::from_utf8(&line).map_err(|e| ProtocolError::InvalidMessage {
                reason: format!("line is not valid UTF-8: {}", e),
            })?;
            let text = text.trim();
            if text.is_empty() {
                continue;
            }

            return Ok(Some(JsonRpcMessage::parse(text)?));
        }
    }

    /// Drop any buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Number of buffered bytes not yet consumed.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Serialize a message as one wire line, terminated by `\n`.
pub fn serialize_message(message: &JsonRpcMessage) -> McpResult<String> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}
