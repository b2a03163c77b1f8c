//! Content-Length framed JSON-RPC 2.0, as spoken by language servers.
//!
//! # Crate Structure
//!
//! - [`frame`]: header codec, message model, stream reader and writer
//! - [`invoke`]: method table, service host boundary, method invoker
//! - [`peer`]: connection dispatch and Unix socket listener (behind `peer` feature)

/// Re-export frame types.
pub mod frame {
    pub use lspwire_frame::*;
}

/// Re-export invocation types.
pub mod invoke {
    pub use lspwire_invoke::*;
}

/// Re-export peer types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use lspwire_peer::*;
}
