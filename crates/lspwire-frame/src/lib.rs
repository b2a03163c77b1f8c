//! Content-Length framed JSON-RPC 2.0 messaging over byte streams.
//!
//! Every message travels as a header block followed by a JSON body:
//! - `Content-Length: <n>` (required), the body size in bytes
//! - `Content-Type: <mime>; charset=<name>` (optional), the body encoding
//! - a blank line, then exactly `n` body bytes
//!
//! [`MessageReader`] turns an arbitrarily chunked stream back into messages;
//! [`MessageWriter`] emits them atomically from any number of tasks.

pub mod charset;
pub mod codec;
pub mod codes;
pub mod error;
pub mod framed;
pub mod header;
pub mod message;
pub mod reader;
pub mod writer;

pub use charset::Charset;
pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_CONTENT_LENGTH,
    DEFAULT_MAX_HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use framed::MessageCodec;
pub use header::{FrameHeader, DEFAULT_CONTENT_TYPE};
pub use message::{ErrorObject, Id, Message, Notification, Request, Response};
pub use reader::MessageReader;
pub use writer::MessageWriter;

pub use tokio_util::sync::CancellationToken;
