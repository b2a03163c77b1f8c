use std::time::Duration;

use lspwire_frame::{Charset, FrameConfig};

/// Default cap on concurrently executing calls per connection.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 64;

/// Default time a stopping connection gives pending responses to go out.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection-level configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Calls (requests and notifications) allowed to execute at once.
    pub max_concurrent_requests: usize,
    /// Framing options shared by the reader and the writer.
    pub frame: FrameConfig,
    /// After cancellation, how long response writes may stay blocked on the
    /// peer before they are abandoned.
    pub drain_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            frame: FrameConfig::default(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    pub fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max.max(1);
        self
    }

    pub fn with_frame(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.frame = self.frame.with_charset(charset);
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }
}
