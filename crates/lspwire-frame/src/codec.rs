use bytes::{Buf, Bytes, BytesMut};

use crate::charset::Charset;
use crate::error::{FrameError, Result};
use crate::header::{find_terminator, write_header, FrameHeader, DEFAULT_CONTENT_TYPE, HEADER_TERMINATOR};
use crate::message::Message;

/// Default maximum body size: 16 MiB.
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 16 * 1024 * 1024;

/// Default maximum header block size: 8 KiB.
pub const DEFAULT_MAX_HEADER_SIZE: usize = 8 * 1024;

/// One complete frame: parsed header plus exactly `Content-Length` body bytes.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Parsed header block.
    pub header: FrameHeader,
    /// Charset the body is encoded in.
    pub charset: Charset,
    /// The raw body.
    pub body: Bytes,
}

impl Frame {
    /// Decode the body text and deserialize it into a message.
    pub fn message(&self) -> Result<Message> {
        let text = self.charset.decode(&self.body)?;
        serde_json::from_str(&text).map_err(|err| FrameError::InvalidMessage(err.to_string()))
    }
}

/// Header facts needed to collect a body.
#[derive(Debug, Clone)]
pub struct BodySpec {
    pub header: FrameHeader,
    pub content_length: usize,
    pub charset: Charset,
}

/// Validate a header block against the configuration.
pub fn decode_header(block: &[u8], config: &FrameConfig) -> Result<BodySpec> {
    let header = FrameHeader::parse(block)?;
    let content_length = header.content_length()?;
    if content_length > config.max_content_length {
        return Err(FrameError::PayloadTooLarge {
            size: content_length,
            max: config.max_content_length,
        });
    }
    let charset = header.charset(config.charset)?;
    Ok(BodySpec {
        header,
        content_length,
        charset,
    })
}

/// Serialize a message into a complete frame.
///
/// Nothing is appended to `dst` unless the whole frame encodes.
pub fn encode_frame(message: &Message, config: &FrameConfig, dst: &mut BytesMut) -> Result<()> {
    let text = serde_json::to_string(message).map_err(FrameError::Serialize)?;
    let mut body = BytesMut::with_capacity(text.len());
    config.charset.encode(&text, &mut body)?;

    if body.len() > config.max_content_length {
        return Err(FrameError::PayloadTooLarge {
            size: body.len(),
            max: config.max_content_length,
        });
    }

    dst.reserve(64 + body.len());
    write_header(body.len(), &config.content_type, config.charset, dst);
    dst.extend_from_slice(&body);
    Ok(())
}

/// Decode a frame from an in-memory buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, config: &FrameConfig) -> Result<Option<Frame>> {
    let Some(header_len) = find_terminator(src) else {
        if src.len() > config.max_header_size {
            return Err(FrameError::HeaderTooLarge {
                size: src.len(),
                max: config.max_header_size,
            });
        }
        return Ok(None); // Need more data
    };

    let spec = decode_header(&src[..header_len], config)?;
    let body_start = header_len + HEADER_TERMINATOR.len();
    if src.len() < body_start + spec.content_length {
        return Ok(None); // Need more data
    }

    src.advance(body_start);
    let body = src.split_to(spec.content_length).freeze();
    Ok(Some(Frame {
        header: spec.header,
        charset: spec.charset,
        body,
    }))
}

/// Configuration shared by the message reader and writer.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum body size in bytes. Default: 16 MiB.
    pub max_content_length: usize,
    /// Maximum header block size in bytes. Default: 8 KiB.
    pub max_header_size: usize,
    /// Reader fallback charset and writer body charset.
    pub charset: Charset,
    /// MIME type advertised by the writer.
    pub content_type: String,
    /// Hand the stream back instead of shutting it down on dispose.
    pub leave_open: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            charset: Charset::default(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            leave_open: false,
        }
    }
}

impl FrameConfig {
    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    pub fn with_max_content_length(mut self, max: usize) -> Self {
        self.max_content_length = max;
        self
    }

    pub fn with_leave_open(mut self, leave_open: bool) -> Self {
        self.leave_open = leave_open;
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let config = FrameConfig::default();
        let msg = Message::request(1, "add", Some(json!([2, 3])));
        let mut buf = BytesMut::new();

        encode_frame(&msg, &config, &mut buf).unwrap();

        let frame = decode_frame(&mut buf, &config).unwrap().unwrap();
        assert_eq!(frame.message().unwrap(), msg);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_response_bytes_exact() {
        let mut buf = BytesMut::new();
        encode_frame(&Message::result(1, json!(5)), &FrameConfig::default(), &mut buf).unwrap();
        assert_eq!(
            &buf[..],
            b"Content-Length: 35\r\n\r\n{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":5}"
        );
    }

    #[test]
    fn test_decode_incomplete_header() {
        let mut buf = BytesMut::from(&b"Content-Length: 2\r\n"[..]);
        let result = decode_frame(&mut buf, &FrameConfig::default()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_decode_incomplete_body() {
        let mut buf = BytesMut::from(&b"Content-Length: 10\r\n\r\n{}"[..]);
        let result = decode_frame(&mut buf, &FrameConfig::default()).unwrap();
        assert!(result.is_none());
        assert_eq!(buf.len(), 24);
    }

    #[test]
    fn test_decode_payload_too_large() {
        let config = FrameConfig::default().with_max_content_length(8);
        let mut buf = BytesMut::from(&b"Content-Length: 9\r\n\r\n"[..]);
        let result = decode_frame(&mut buf, &config);
        assert!(matches!(result, Err(FrameError::PayloadTooLarge { size: 9, max: 8 })));
    }

    #[test]
    fn test_header_too_large() {
        let config = FrameConfig {
            max_header_size: 16,
            ..FrameConfig::default()
        };
        let mut buf = BytesMut::from(&b"X-Padding: aaaaaaaaaaaaaaaa"[..]);
        let result = decode_frame(&mut buf, &config);
        assert!(matches!(result, Err(FrameError::HeaderTooLarge { .. })));
    }

    #[test]
    fn test_multiple_frames() {
        let config = FrameConfig::default();
        let mut buf = BytesMut::new();
        encode_frame(&Message::notification("first", None), &config, &mut buf).unwrap();
        encode_frame(&Message::notification("second", None), &config, &mut buf).unwrap();

        let f1 = decode_frame(&mut buf, &config).unwrap().unwrap();
        assert_eq!(f1.message().unwrap().method(), Some("first"));
        let f2 = decode_frame(&mut buf, &config).unwrap().unwrap();
        assert_eq!(f2.message().unwrap().method(), Some("second"));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_utf16_frame_roundtrip() {
        let config = FrameConfig::default().with_charset(Charset::Utf16Be);
        let msg = Message::notification("héllo", Some(json!({"ü": "€"})));
        let mut buf = BytesMut::new();
        encode_frame(&msg, &config, &mut buf).unwrap();

        // Reader default differs; the Content-Type header wins.
        let frame = decode_frame(&mut buf, &FrameConfig::default()).unwrap().unwrap();
        assert_eq!(frame.charset, Charset::Utf16Be);
        assert_eq!(frame.message().unwrap(), msg);
    }

    #[test]
    fn test_unencodable_leaves_dst_untouched() {
        let config = FrameConfig::default().with_charset(Charset::Ascii);
        let mut buf = BytesMut::new();
        let err =
            encode_frame(&Message::notification("ünicode", None), &config, &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::Unencodable { .. }));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_invalid_body_is_protocol_error() {
        let mut buf = BytesMut::from(&b"Content-Length: 2\r\n\r\n[]"[..]);
        let frame = decode_frame(&mut buf, &FrameConfig::default()).unwrap().unwrap();
        let err = frame.message().unwrap_err();
        assert!(matches!(err, FrameError::InvalidMessage(_)));
        assert!(err.is_protocol_error());
    }
}
