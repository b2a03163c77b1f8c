use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, decode_header, encode_frame, FrameConfig};
use crate::error::FrameError;
use crate::header::{find_terminator, HEADER_TERMINATOR};
use crate::message::Message;

/// `tokio_util` codec for use with `FramedRead` / `FramedWrite`.
///
/// Prefer [`MessageReader`](crate::MessageReader) and
/// [`MessageWriter`](crate::MessageWriter) when cancellation or shared
/// writers are needed.
#[derive(Debug, Clone, Default)]
pub struct MessageCodec {
    config: FrameConfig,
}

impl MessageCodec {
    pub fn new(config: FrameConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, FrameError> {
        match decode_frame(src, &self.config)? {
            Some(frame) => frame.message().map(Some),
            None => Ok(None),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Message>, FrameError> {
        if let Some(message) = self.decode(src)? {
            return Ok(Some(message));
        }
        if src.is_empty() {
            return Ok(None);
        }
        match find_terminator(src) {
            Some(header_len) => {
                let spec = decode_header(&src[..header_len], &self.config)?;
                Err(FrameError::TruncatedBody {
                    expected: spec.content_length,
                    received: src.len() - header_len - HEADER_TERMINATOR.len(),
                })
            }
            None => Err(FrameError::TruncatedHeader {
                buffered: src.len(),
            }),
        }
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(&item, &self.config, dst)
    }
}

impl Encoder<&Message> for MessageCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &Message, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(item, &self.config, dst)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use serde_json::json;
    use tokio_util::codec::FramedRead;

    use super::*;

    #[tokio::test]
    async fn framed_read_yields_messages() {
        let mut codec = MessageCodec::default();
        let mut wire = BytesMut::new();
        codec
            .encode(Message::request(1, "add", Some(json!([2, 3]))), &mut wire)
            .unwrap();
        codec
            .encode(&Message::notification("exit", None), &mut wire)
            .unwrap();

        let mut stream = FramedRead::new(&wire[..], MessageCodec::default());
        assert_eq!(
            stream.next().await.unwrap().unwrap(),
            Message::request(1, "add", Some(json!([2, 3])))
        );
        assert_eq!(
            stream.next().await.unwrap().unwrap(),
            Message::notification("exit", None)
        );
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn truncated_tail_is_an_error() {
        let wire: &[u8] = b"Content-Length: 50\r\n\r\n0123456789";
        let mut stream = FramedRead::new(wire, MessageCodec::default());
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            FrameError::TruncatedBody {
                expected: 50,
                received: 10
            }
        ));
    }

    #[test]
    fn partial_input_waits_for_more() {
        let mut codec = MessageCodec::default();
        let mut buf = BytesMut::from(&b"Content-Length: 2\r\n\r\n{"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 22);
    }
}
