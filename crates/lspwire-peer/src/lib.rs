//! JSON-RPC dispatch over a framed connection.
//!
//! A [`Connection`] reads messages with a `MessageReader`, runs requests and
//! notifications through a `MethodInvoker`, and writes responses through a
//! shared `MessageWriter`. Calls execute concurrently; responses go out in
//! completion order. `$/cancelRequest` cancels a call that is still running.

pub mod config;
pub mod connection;
pub mod error;
pub mod fault;
#[cfg(unix)]
pub mod listener;

pub use config::{ConnectionConfig, DEFAULT_DRAIN_TIMEOUT, DEFAULT_MAX_CONCURRENT_REQUESTS};
pub use connection::{Connection, ServeStats, CANCEL_REQUEST_METHOD};
pub use error::{PeerError, Result};
pub use fault::error_object;
#[cfg(unix)]
pub use listener::{serve_unix, ConnectionListener};
