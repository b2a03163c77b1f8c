use std::path::PathBuf;

use lspwire_frame::FrameError;

/// Errors that can end a connection or listener.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Framing or protocol failure on the inbound stream.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Socket could not be bound.
    #[error("failed to bind {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error outside of framing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serving stopped because the caller cancelled it.
    #[error("connection cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, PeerError>;
