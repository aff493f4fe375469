//! Incremental decoding of the streaming body into frames.
//!
//! The body is a sequence of JSON objects with nothing but whitespace between
//! them. Chunk boundaries are arbitrary, so the decoder buffers bytes until a
//! whole object is available.

use bytes::{Buf, Bytes, BytesMut};
use fxstream_types::ApiError;
use serde::de::{Deserializer, Error as _, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::value::RawValue;
use std::fmt;
use thiserror::Error;

/// Frame kind of heartbeats.
pub const HEARTBEAT: &str = "heartbeat";

/// Frame kind of planned disconnect notices.
pub const DISCONNECT: &str = "disconnect";

/// One frame of the stream: the discriminating key and its undecoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    kind: String,
    payload: Bytes,
}

impl StreamMessage {
    /// Creates a message from a kind and a raw JSON payload.
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            kind: kind.into(),
            payload: payload.into(),
        }
    }

    /// Returns the frame kind, e.g. `tick` or `transaction`.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the raw JSON value of the frame.
    #[must_use]
    pub const fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Classifies the message by its kind.
    #[must_use]
    pub fn classify(self) -> Frame {
        match self.kind.as_str() {
            HEARTBEAT => Frame::Heartbeat(self),
            DISCONNECT => Frame::Disconnect(self),
            _ => Frame::Data(self),
        }
    }
}

impl fmt::Display for StreamMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StreamMessage{{{}, {}}}",
            self.kind,
            String::from_utf8_lossy(&self.payload)
        )
    }
}

/// A classified frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Data frame, routed to a partition.
    Data(StreamMessage),
    /// Liveness signal carrying a server timestamp.
    Heartbeat(StreamMessage),
    /// Planned disconnect notice; the server closes the connection next.
    Disconnect(StreamMessage),
}

/// Errors that end decoding of the current connection.
#[derive(Error, Debug)]
pub enum FrameError {
    /// The server sent an error object. Terminal for the session.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The body is not a sequence of JSON objects.
    #[error("Malformed frame: {0}")]
    Syntax(#[from] serde_json::Error),

    /// The body ended in the middle of an object.
    #[error("Stream ended inside a frame ({0} bytes pending)")]
    Truncated(usize),
}

impl FrameError {
    /// Returns true if the error must end the session rather than trigger a
    /// reconnect.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Api(_))
    }
}

/// Incremental frame decoder for one connection.
///
/// Bytes are scanned once for the end of the current object; only complete
/// objects reach the JSON parser.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
    scan: Scan,
}

/// Position of the object boundary scan within the buffer.
#[derive(Debug, Default)]
struct Scan {
    offset: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl Scan {
    /// Scans `buf` from the saved offset. Returns the length of the first
    /// complete value once its closing bracket is seen.
    fn advance(&mut self, buf: &[u8]) -> Option<usize> {
        for (i, &b) in buf.iter().enumerate().skip(self.offset) {
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                }
                continue;
            }
            match b {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        *self = Self::default();
                        return Some(i + 1);
                    }
                }
                _ => {}
            }
        }
        self.offset = buf.len();
        None
    }
}

impl FrameDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk read from the body.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Returns the number of buffered bytes not yet decoded.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Decodes the next complete message.
    ///
    /// Returns `Ok(None)` when more input is needed. Objects without any key
    /// are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Api`] for an error object with a non-zero `code`
    /// and [`FrameError::Syntax`] for anything that is not a JSON object.
    pub fn next_message(&mut self) -> Result<Option<StreamMessage>, FrameError> {
        loop {
            if self.scan.offset == 0 {
                let Some(start) = self.buf.iter().position(|b| !b.is_ascii_whitespace()) else {
                    self.buf.clear();
                    return Ok(None);
                };
                self.buf.advance(start);

                if self.buf[0] != b'{' {
                    return match serde_json::from_slice::<Envelope>(&self.buf) {
                        Err(e) if e.is_eof() => Ok(None),
                        Err(e) => Err(FrameError::Syntax(e)),
                        Ok(_) => Err(FrameError::Syntax(serde_json::Error::custom(
                            "frame is not a JSON object",
                        ))),
                    };
                }
            }

            let Some(end) = self.scan.advance(&self.buf) else {
                return Ok(None);
            };
            let frame = self.buf.split_to(end);
            let envelope: Envelope = serde_json::from_slice(&frame)?;
            if let Some(message) = envelope.into_message()? {
                return Ok(Some(message));
            }
        }
    }

    /// Checks the buffer at end of stream.
    ///
    /// Trailing whitespace is an ordinary close; anything else is a frame
    /// cut off by the peer.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Truncated`] if a partial object is buffered.
    pub fn finish(&mut self) -> Result<(), FrameError> {
        let pending = self.buf.iter().filter(|b| !b.is_ascii_whitespace()).count();
        self.buf.clear();
        self.scan = Scan::default();
        if pending == 0 {
            Ok(())
        } else {
            Err(FrameError::Truncated(pending))
        }
    }
}

/// Top-level entries of one frame, in wire order.
struct Envelope(Vec<(String, Box<RawValue>)>);

impl Envelope {
    fn get(&self, key: &str) -> Option<&RawValue> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_ref())
    }

    fn api_error(&self) -> Result<Option<ApiError>, serde_json::Error> {
        let Some(code) = self.get("code") else {
            return Ok(None);
        };
        let code: i64 = serde_json::from_str(code.get())?;
        if code == 0 {
            return Ok(None);
        }
        let text = |key: &str| -> Result<String, serde_json::Error> {
            self.get(key)
                .map_or_else(|| Ok(String::new()), |v| serde_json::from_str(v.get()))
        };
        Ok(Some(ApiError::new(code, text("message")?, text("moreInfo")?)))
    }

    fn into_message(self) -> Result<Option<StreamMessage>, FrameError> {
        if let Some(err) = self.api_error()? {
            return Err(FrameError::Api(err));
        }
        let has_code = self.get("code").is_some();
        let message = self
            .0
            .into_iter()
            .find(|(key, _)| !(has_code && matches!(key.as_str(), "code" | "message" | "moreInfo")))
            .map(|(kind, raw)| {
                StreamMessage::new(kind, Bytes::copy_from_slice(raw.get().as_bytes()))
            });
        Ok(message)
    }
}

struct EnvelopeVisitor;

impl<'de> Visitor<'de> for EnvelopeVisitor {
    type Value = Envelope;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Envelope, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(1));
        while let Some(entry) = map.next_entry::<String, Box<RawValue>>()? {
            entries.push(entry);
        }
        Ok(Envelope(entries))
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(EnvelopeVisitor)
    }
}

/// Decodes the body of a `disconnect` frame.
///
/// # Errors
///
/// Returns an error if the payload is not an error-shaped object.
pub fn decode_disconnect(payload: &[u8]) -> Result<ApiError, serde_json::Error> {
    serde_json::from_slice(payload)
}
