/// Errors that can occur while reading or writing framed messages.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The header block has no `Content-Length` header.
    #[error("missing Content-Length header")]
    MissingContentLength,

    /// `Content-Length` is not a positive integer.
    #[error("invalid Content-Length value {0:?}")]
    InvalidContentLength(String),

    /// A header line could not be split into name and value.
    #[error("malformed header line {0:?}")]
    MalformedHeader(String),

    /// The `Content-Type` charset is not one this crate can decode.
    #[error("unsupported charset {0:?}")]
    UnsupportedCharset(String),

    /// The header block grew past the configured limit without a terminator.
    #[error("header block too large ({size} bytes, max {max})")]
    HeaderTooLarge { size: usize, max: usize },

    /// The declared body length exceeds the configured maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The stream ended after part of a header block was received.
    #[error("stream ended inside a header block ({buffered} bytes buffered)")]
    TruncatedHeader { buffered: usize },

    /// The stream ended before the declared body length was received.
    #[error("stream ended inside a message body ({received} of {expected} bytes)")]
    TruncatedBody { expected: usize, received: usize },

    /// The body bytes are not valid text in the negotiated charset.
    #[error("body is not valid {charset} text")]
    InvalidText { charset: &'static str },

    /// The body is not a valid JSON-RPC 2.0 message.
    #[error("invalid JSON-RPC message: {0}")]
    InvalidMessage(String),

    /// The message text cannot be represented in the configured charset.
    #[error("message text cannot be encoded as {charset}")]
    Unencodable { charset: &'static str },

    /// The message could not be serialized to JSON.
    #[error("message serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The operation was cancelled by the caller or by disposal.
    #[error("operation cancelled")]
    Cancelled,

    /// The reader or writer has been disposed.
    #[error("stream disposed")]
    Disposed,

    /// A previous protocol or I/O error left the reader unusable.
    #[error("reader faulted by an earlier error")]
    Faulted,

    /// An I/O error occurred on the underlying stream.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// True for wire-level protocol violations that make the stream unusable.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            FrameError::MissingContentLength
                | FrameError::InvalidContentLength(_)
                | FrameError::MalformedHeader(_)
                | FrameError::UnsupportedCharset(_)
                | FrameError::HeaderTooLarge { .. }
                | FrameError::PayloadTooLarge { .. }
                | FrameError::TruncatedHeader { .. }
                | FrameError::TruncatedBody { .. }
                | FrameError::InvalidText { .. }
                | FrameError::InvalidMessage(_)
        )
    }

    /// True when the error is the result of a cancellation request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FrameError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
