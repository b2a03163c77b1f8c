use std::io::ErrorKind;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::codec::{decode_header, BodySpec, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::header::{find_terminator, HEADER_TERMINATOR};
use crate::message::Message;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const HEADER_CHUNK_SIZE: usize = 1024;
const BODY_CHUNK_SIZE: usize = 4 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    Open,
    Faulted,
    Disposed,
}

/// Reads complete messages from any `AsyncRead` stream.
///
/// Handles partial reads internally: callers always get complete messages,
/// in wire order. Bytes past the end of a frame stay buffered for the next
/// call. Taking `&mut self` keeps at most one read outstanding.
pub struct MessageReader<R> {
    inner: Option<R>,
    buf: BytesMut,
    /// Header already consumed from `buf`; its body is still arriving.
    pending: Option<BodySpec>,
    /// Prefix of `buf` already searched for the header terminator.
    scanned: usize,
    config: FrameConfig,
    disposal: CancellationToken,
    state: ReaderState,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    /// Create a new message reader with default configuration.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new message reader with explicit configuration.
    pub fn with_config(inner: R, config: FrameConfig) -> Self {
        Self {
            inner: Some(inner),
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            pending: None,
            scanned: 0,
            config,
            disposal: CancellationToken::new(),
            state: ReaderState::Open,
        }
    }

    /// Read and decode the next message.
    ///
    /// Returns `Ok(None)` on a clean end of stream. Protocol and I/O errors
    /// fault the reader; cancellation does not, and a later call resumes the
    /// same frame.
    pub async fn read_next(&mut self, cancel: &CancellationToken) -> Result<Option<Message>> {
        let Some(frame) = self.read_frame(cancel).await? else {
            return Ok(None);
        };
        match frame.message() {
            Ok(message) => {
                debug!(
                    kind = message.kind(),
                    method = message.method(),
                    bytes = frame.body.len(),
                    "message received"
                );
                Ok(Some(message))
            }
            Err(err) => Err(self.fault(err)),
        }
    }

    /// Read the next complete frame without decoding its body.
    pub async fn read_frame(&mut self, cancel: &CancellationToken) -> Result<Option<Frame>> {
        match self.state {
            ReaderState::Faulted => return Err(FrameError::Faulted),
            ReaderState::Disposed => return Err(FrameError::Disposed),
            ReaderState::Open => {}
        }
        if self.disposal.is_cancelled() {
            self.teardown();
            return Err(FrameError::Disposed);
        }

        match self.next_frame(cancel).await {
            Ok(frame) => Ok(frame),
            Err(FrameError::Cancelled) => {
                if self.disposal.is_cancelled() {
                    self.teardown();
                }
                Err(FrameError::Cancelled)
            }
            Err(err) => Err(self.fault(err)),
        }
    }

    async fn next_frame(&mut self, cancel: &CancellationToken) -> Result<Option<Frame>> {
        loop {
            if self.pending.is_none() {
                let from = self.scanned.saturating_sub(HEADER_TERMINATOR.len() - 1);
                match find_terminator(&self.buf[from..]) {
                    Some(offset) => {
                        let header_len = from + offset;
                        let spec = decode_header(&self.buf[..header_len], &self.config)?;
                        trace!(
                            content_length = spec.content_length,
                            charset = %spec.charset,
                            "header decoded"
                        );
                        self.buf.advance(header_len + HEADER_TERMINATOR.len());
                        self.scanned = 0;
                        self.pending = Some(spec);
                    }
                    None => {
                        self.scanned = self.buf.len();
                        if self.buf.len() > self.config.max_header_size {
                            return Err(FrameError::HeaderTooLarge {
                                size: self.buf.len(),
                                max: self.config.max_header_size,
                            });
                        }
                        if self.fill(HEADER_CHUNK_SIZE, cancel).await? == 0 {
                            if self.buf.is_empty() {
                                return Ok(None);
                            }
                            return Err(FrameError::TruncatedHeader {
                                buffered: self.buf.len(),
                            });
                        }
                        continue;
                    }
                }
            }

            let content_length = match &self.pending {
                Some(spec) => spec.content_length,
                None => continue,
            };

            if self.buf.len() >= content_length {
                if let Some(spec) = self.pending.take() {
                    let body = self.buf.split_to(content_length).freeze();
                    return Ok(Some(Frame {
                        header: spec.header,
                        charset: spec.charset,
                        body,
                    }));
                }
            }

            let wanted = (content_length - self.buf.len()).min(BODY_CHUNK_SIZE);
            if self.fill(wanted, cancel).await? == 0 {
                return Err(FrameError::TruncatedBody {
                    expected: content_length,
                    received: self.buf.len(),
                });
            }
        }
    }

    /// One physical read of at most `max` bytes, appended to the buffer.
    async fn fill(&mut self, max: usize, cancel: &CancellationToken) -> Result<usize> {
        if cancel.is_cancelled() || self.disposal.is_cancelled() {
            return Err(FrameError::Cancelled);
        }
        let stream = self.inner.as_mut().ok_or(FrameError::Disposed)?;

        let mut chunk = [0u8; BODY_CHUNK_SIZE];
        let limit = max.min(chunk.len());
        loop {
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FrameError::Cancelled),
                _ = self.disposal.cancelled() => return Err(FrameError::Cancelled),
                read = stream.read(&mut chunk[..limit]) => read,
            };

            match read {
                Ok(n) => {
                    trace!(bytes = n, "physical read");
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(_) if cancel.is_cancelled() || self.disposal.is_cancelled() => {
                    return Err(FrameError::Cancelled);
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    fn fault(&mut self, err: FrameError) -> FrameError {
        warn!(error = %err, "message reader faulted");
        self.state = ReaderState::Faulted;
        self.pending = None;
        self.scanned = 0;
        self.buf.clear();
        err
    }

    fn teardown(&mut self) -> Option<R> {
        self.state = ReaderState::Disposed;
        self.pending = None;
        self.scanned = 0;
        self.buf = BytesMut::new();
        self.inner.take()
    }

    /// Dispose of the reader.
    ///
    /// Returns the stream when the configuration leaves it open; otherwise it
    /// is dropped. Every later call fails with [`FrameError::Disposed`].
    pub fn dispose(&mut self) -> Option<R> {
        self.disposal.cancel();
        let inner = self.teardown();
        if self.config.leave_open {
            inner
        } else {
            None
        }
    }

    /// Token that disposes the reader when cancelled, usable from other tasks.
    ///
    /// A read in flight when it fires fails with [`FrameError::Cancelled`].
    pub fn disposal_token(&self) -> CancellationToken {
        self.disposal.clone()
    }

    /// True once the reader has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.state == ReaderState::Disposed
    }

    /// Number of received bytes not yet returned as part of a message.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> Option<&R> {
        self.inner.as_ref()
    }

    /// Current reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
