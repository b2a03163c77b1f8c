use std::io::ErrorKind;

use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::codec::{encode_frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::message::Message;

struct Slot<W> {
    stream: Option<W>,
    faulted: bool,
}

/// Writes complete messages to any `AsyncWrite` stream.
///
/// `write` takes `&self`: share the writer through an `Arc` and call it from
/// as many tasks as needed. Each message's header and body are emitted under
/// one lock, so frames never interleave.
pub struct MessageWriter<W> {
    slot: Mutex<Slot<W>>,
    config: FrameConfig,
    disposal: CancellationToken,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    /// Create a new message writer with default configuration.
    pub fn new(inner: W) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new message writer with explicit configuration.
    pub fn with_config(inner: W, config: FrameConfig) -> Self {
        Self {
            slot: Mutex::new(Slot {
                stream: Some(inner),
                faulted: false,
            }),
            config,
            disposal: CancellationToken::new(),
        }
    }

    /// Serialize and send one message.
    ///
    /// Serialization happens before the lock is taken; a failure there never
    /// reaches the stream. Cancellation or disposal while the frame is going
    /// out returns [`FrameError::Cancelled`] and faults the writer, since part
    /// of the frame may already be on the wire.
    pub async fn write(&self, message: &Message, cancel: &CancellationToken) -> Result<()> {
        if self.disposal.is_cancelled() {
            return Err(FrameError::Disposed);
        }
        if cancel.is_cancelled() {
            return Err(FrameError::Cancelled);
        }

        let mut frame = BytesMut::new();
        encode_frame(message, &self.config, &mut frame)?;

        let mut slot = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FrameError::Cancelled),
            _ = self.disposal.cancelled() => return Err(FrameError::Cancelled),
            slot = self.slot.lock() => slot,
        };
        if slot.faulted {
            return Err(FrameError::Faulted);
        }
        let Some(stream) = slot.stream.as_mut() else {
            return Err(FrameError::Disposed);
        };

        let written = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            _ = self.disposal.cancelled() => None,
            written = write_all(stream, &frame) => Some(written),
        };
        let Some(written) = written else {
            slot.faulted = true;
            warn!("message write abandoned mid-frame; writer faulted");
            return Err(FrameError::Cancelled);
        };

        match written {
            Ok(()) => {
                debug!(
                    kind = message.kind(),
                    method = message.method(),
                    bytes = frame.len(),
                    "message sent"
                );
                Ok(())
            }
            Err(err) => {
                // Part of the frame may already be on the wire.
                slot.faulted = true;
                warn!(error = %err, "message writer faulted");
                if cancel.is_cancelled() || self.disposal.is_cancelled() {
                    Err(FrameError::Cancelled)
                } else {
                    Err(FrameError::Io(err))
                }
            }
        }
    }

    /// Dispose of the writer.
    ///
    /// Pending and in-progress writes fail with [`FrameError::Cancelled`]. The
    /// stream is then shut down, or handed back untouched when the
    /// configuration leaves it open.
    pub async fn dispose(&self) -> Result<Option<W>> {
        self.disposal.cancel();
        let mut slot = self.slot.lock().await;
        let Some(mut stream) = slot.stream.take() else {
            return Ok(None);
        };
        if self.config.leave_open {
            return Ok(Some(stream));
        }
        stream.shutdown().await?;
        Ok(None)
    }

    /// True once `dispose` has been called.
    pub fn is_disposed(&self) -> bool {
        self.disposal.is_cancelled()
    }

    /// Consume the writer and return the inner stream, if still present.
    pub fn into_inner(self) -> Option<W> {
        self.slot.into_inner().stream
    }

    /// Current writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

async fn write_all<W: AsyncWrite + Unpin>(stream: &mut W, mut buf: &[u8]) -> std::io::Result<()> {
    while !buf.is_empty() {
        match stream.write(buf).await {
            Ok(0) => return Err(std::io::Error::from(ErrorKind::WriteZero)),
            Ok(n) => buf = &buf[n..],
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    loop {
        match stream.flush().await {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
}
