//! Header block parsing and formatting.
//!
//! ```text
//! Content-Length: <decimal>\r\n
//! Content-Type: <mime>; charset=<name>\r\n   (optional)
//! \r\n
//! ```

use bytes::{BufMut, BytesMut};

use crate::charset::Charset;
use crate::error::{FrameError, Result};

/// Separator between the header block and the body.
pub const HEADER_TERMINATOR: &[u8; 4] = b"\r\n\r\n";

/// Header carrying the body length in bytes.
pub const CONTENT_LENGTH: &str = "Content-Length";

/// Header carrying the MIME type and optional charset.
pub const CONTENT_TYPE: &str = "Content-Type";

/// MIME type used by language servers and their clients.
pub const DEFAULT_CONTENT_TYPE: &str = "application/vscode-jsonrpc";

/// Ordered header-name to header-value mapping of one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameHeader {
    fields: Vec<(String, String)>,
}

impl FrameHeader {
    /// Parse a header block (terminator excluded).
    ///
    /// Lines may end in `\r\n`, `\r`, or `\n`. Each non-empty line is split on
    /// the first `": "`.
    pub fn parse(block: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(block)
            .map_err(|_| FrameError::MalformedHeader(String::from_utf8_lossy(block).into()))?;

        let mut fields = Vec::new();
        for line in text.split(['\r', '\n']) {
            if line.is_empty() {
                continue;
            }
            let (name, value) = line
                .split_once(": ")
                .ok_or_else(|| FrameError::MalformedHeader(line.to_string()))?;
            fields.push((name.to_string(), value.to_string()));
        }
        Ok(Self { fields })
    }

    /// Value of the first header matching `name`, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Append a header.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Iterate headers in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The declared body length. Must be a positive decimal integer.
    pub fn content_length(&self) -> Result<usize> {
        let raw = self
            .get(CONTENT_LENGTH)
            .ok_or(FrameError::MissingContentLength)?;
        let digits = raw.trim();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FrameError::InvalidContentLength(raw.to_string()));
        }
        match digits.parse::<usize>() {
            Ok(len) if len > 0 => Ok(len),
            _ => Err(FrameError::InvalidContentLength(raw.to_string())),
        }
    }

    /// The MIME type portion of `Content-Type`, if present.
    pub fn content_type(&self) -> Option<&str> {
        self.get(CONTENT_TYPE)
            .map(|value| value.split(';').next().unwrap_or_default().trim())
    }

    /// Charset selected by `Content-Type`, or `default` when none is declared.
    pub fn charset(&self, default: Charset) -> Result<Charset> {
        let Some(value) = self.get(CONTENT_TYPE) else {
            return Ok(default);
        };
        for param in value.split(';').skip(1) {
            if let Some((key, name)) = param.split_once('=') {
                if key.trim().eq_ignore_ascii_case("charset") {
                    return Charset::from_name(name);
                }
            }
        }
        Ok(default)
    }
}

/// Locate the header terminator, returning the offset of its first byte.
pub fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
}

/// Write a header block for a body of `content_length` bytes.
///
/// `Content-Type` is emitted only when the MIME type or charset differ from
/// the protocol defaults.
pub fn write_header(
    content_length: usize,
    content_type: &str,
    charset: Charset,
    dst: &mut BytesMut,
) {
    dst.put_slice(format!("{CONTENT_LENGTH}: {content_length}\r\n").as_bytes());
    if !charset.is_default() || content_type != DEFAULT_CONTENT_TYPE {
        dst.put_slice(
            format!("{CONTENT_TYPE}: {content_type}; charset={}\r\n", charset.name()).as_bytes(),
        );
    }
    dst.put_slice(b"\r\n");
}
