//! Body text encodings negotiated through the `Content-Type` charset parameter.
//!
//! Two UTF-8 variants exist on purpose. `utf8` (no hyphen) is BOM-less UTF-8,
//! the protocol default. `utf-8` is the BOM-aware variant: decoding strips a
//! leading byte-order mark and encoding emits one.

use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16_BOM: u16 = 0xFEFF;

/// A supported body charset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Charset {
    /// UTF-8 without a byte-order mark.
    #[default]
    Utf8,
    /// UTF-8 that strips a leading BOM on decode and writes one on encode.
    Utf8Bom,
    /// Little-endian UTF-16.
    Utf16Le,
    /// Big-endian UTF-16.
    Utf16Be,
    /// 7-bit US-ASCII.
    Ascii,
    /// ISO-8859-1.
    Latin1,
}

impl Charset {
    /// Resolve a charset parameter value.
    ///
    /// Matching is ASCII case-insensitive and tolerates surrounding quotes.
    pub fn from_name(name: &str) -> Result<Self> {
        let trimmed = name.trim().trim_matches('"');
        let lower = trimmed.to_ascii_lowercase();
        match lower.as_str() {
            "utf8" => Ok(Self::Utf8),
            "utf-8" => Ok(Self::Utf8Bom),
            "utf-16" | "utf-16le" | "utf16" | "unicode" => Ok(Self::Utf16Le),
            "utf-16be" => Ok(Self::Utf16Be),
            "us-ascii" | "ascii" => Ok(Self::Ascii),
            "iso-8859-1" | "latin1" | "latin-1" => Ok(Self::Latin1),
            _ => Err(FrameError::UnsupportedCharset(trimmed.to_string())),
        }
    }

    /// Name written into a `Content-Type` charset parameter.
    pub fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "utf8",
            Self::Utf8Bom => "utf-8",
            Self::Utf16Le => "utf-16",
            Self::Utf16Be => "utf-16be",
            Self::Ascii => "us-ascii",
            Self::Latin1 => "iso-8859-1",
        }
    }

    /// True for the protocol default (BOM-less UTF-8).
    pub fn is_default(self) -> bool {
        self == Self::Utf8
    }

    /// Decode body bytes into text.
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        let invalid = || FrameError::InvalidText {
            charset: self.name(),
        };
        match self {
            Self::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|_| invalid()),
            Self::Utf8Bom => {
                let bytes = bytes.strip_prefix(&UTF8_BOM[..]).unwrap_or(bytes);
                std::str::from_utf8(bytes)
                    .map(str::to_owned)
                    .map_err(|_| invalid())
            }
            Self::Utf16Le | Self::Utf16Be => {
                if bytes.len() % 2 != 0 {
                    return Err(invalid());
                }
                let mut units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| {
                        let pair = [pair[0], pair[1]];
                        if self == Self::Utf16Le {
                            u16::from_le_bytes(pair)
                        } else {
                            u16::from_be_bytes(pair)
                        }
                    })
                    .collect();
                if units.first() == Some(&UTF16_BOM) {
                    units.remove(0);
                }
                String::from_utf16(&units).map_err(|_| invalid())
            }
            Self::Ascii => {
                if !bytes.is_ascii() {
                    return Err(invalid());
                }
                std::str::from_utf8(bytes)
                    .map(str::to_owned)
                    .map_err(|_| invalid())
            }
            Self::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }

    /// Encode text and append it to `dst`.
    pub fn encode(self, text: &str, dst: &mut BytesMut) -> Result<()> {
        let unencodable = || FrameError::Unencodable {
            charset: self.name(),
        };
        match self {
            Self::Utf8 => dst.put_slice(text.as_bytes()),
            Self::Utf8Bom => {
                dst.reserve(UTF8_BOM.len() + text.len());
                dst.put_slice(&UTF8_BOM);
                dst.put_slice(text.as_bytes());
            }
            Self::Utf16Le => {
                dst.reserve(text.len() * 2);
                for unit in text.encode_utf16() {
                    dst.put_u16_le(unit);
                }
            }
            Self::Utf16Be => {
                dst.reserve(text.len() * 2);
                for unit in text.encode_utf16() {
                    dst.put_u16(unit);
                }
            }
            Self::Ascii => {
                if !text.is_ascii() {
                    return Err(unencodable());
                }
                dst.put_slice(text.as_bytes());
            }
            Self::Latin1 => {
                // Validate first so a failure never leaves a partial body behind.
                if text.chars().any(|c| u32::from(c) > 0xFF) {
                    return Err(unencodable());
                }
                dst.reserve(text.len());
                for c in text.chars() {
                    dst.put_u8(u32::from(c) as u8);
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Charset {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_without_hyphen_is_bom_less() {
        assert_eq!(Charset::from_name("utf8").unwrap(), Charset::Utf8);
        assert_eq!(Charset::from_name("UTF-8").unwrap(), Charset::Utf8Bom);
        assert_eq!(Charset::from_name("\"utf-8\"").unwrap(), Charset::Utf8Bom);
    }

    #[test]
    fn written_name_resolves_to_same_charset() {
        for charset in [
            Charset::Utf8,
            Charset::Utf8Bom,
            Charset::Utf16Le,
            Charset::Utf16Be,
            Charset::Ascii,
            Charset::Latin1,
        ] {
            assert_eq!(Charset::from_name(charset.name()).unwrap(), charset);
        }
    }

    #[test]
    fn unknown_charset_rejected() {
        let err = Charset::from_name("koi8-r").unwrap_err();
        assert!(matches!(err, FrameError::UnsupportedCharset(name) if name == "koi8-r"));
    }

    #[test]
    fn bom_aware_utf8_strips_bom() {
        let mut body = UTF8_BOM.to_vec();
        body.extend_from_slice(b"{}");
        assert_eq!(Charset::Utf8Bom.decode(&body).unwrap(), "{}");
        // BOM-less UTF-8 keeps it as text, leaving JSON parsing to reject it.
        assert_eq!(Charset::Utf8.decode(&body).unwrap(), "\u{FEFF}{}");
    }

    #[test]
    fn utf8_bom_encode_emits_bom() {
        let mut dst = BytesMut::new();
        Charset::Utf8Bom.encode("{}", &mut dst).unwrap();
        assert_eq!(&dst[..], b"\xEF\xBB\xBF{}");
    }

    #[test]
    fn utf16_both_endians() {
        let mut le = BytesMut::new();
        Charset::Utf16Le.encode("hé", &mut le).unwrap();
        assert_eq!(&le[..], &[b'h', 0, 0xE9, 0]);
        assert_eq!(Charset::Utf16Le.decode(&le).unwrap(), "hé");

        let mut be = BytesMut::new();
        Charset::Utf16Be.encode("hé", &mut be).unwrap();
        assert_eq!(&be[..], &[0, b'h', 0, 0xE9]);
        assert_eq!(Charset::Utf16Be.decode(&be).unwrap(), "hé");
    }

    #[test]
    fn utf16_odd_length_is_invalid() {
        let err = Charset::Utf16Le.decode(&[b'{', 0, b'}']).unwrap_err();
        assert!(matches!(err, FrameError::InvalidText { .. }));
    }

    #[test]
    fn ascii_rejects_non_ascii() {
        let mut dst = BytesMut::new();
        let err = Charset::Ascii.encode("café", &mut dst).unwrap_err();
        assert!(matches!(err, FrameError::Unencodable { .. }));
        assert!(dst.is_empty());
        assert!(Charset::Ascii.decode(&[0xC3, 0xA9]).is_err());
    }

    #[test]
    fn latin1_roundtrip_and_limits() {
        let mut dst = BytesMut::new();
        Charset::Latin1.encode("café", &mut dst).unwrap();
        assert_eq!(&dst[..], b"caf\xE9");
        assert_eq!(Charset::Latin1.decode(&dst).unwrap(), "café");

        let mut dst = BytesMut::new();
        assert!(Charset::Latin1.encode("€", &mut dst).is_err());
        assert!(dst.is_empty());
    }
}
