use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lspwire_invoke::{MethodInvoker, ServiceHost};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::error::{PeerError, Result};

/// Pause after a failed `accept` (e.g. EMFILE) before trying again.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Accepts JSON-RPC connections on a Unix domain socket.
pub struct ConnectionListener {
    listener: UnixListener,
    path: PathBuf,
    config: ConnectionConfig,
}

impl ConnectionListener {
    /// Bind to a filesystem socket path, replacing a stale socket left behind
    /// by an earlier process. Any other existing file is an error.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let bind_err = |source| PeerError::Bind {
            path: path.clone(),
            source,
        };

        if let Ok(metadata) = std::fs::symlink_metadata(&path) {
            if !metadata.file_type().is_socket() {
                return Err(bind_err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "existing path is not a unix socket",
                )));
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(bind_err)?;
        }

        let listener = UnixListener::bind(&path).map_err(bind_err)?;
        debug!(?path, "listening");
        Ok(Self {
            listener,
            path,
            config: ConnectionConfig::default(),
        })
    }

    pub fn with_config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accept one connection and split it into read and write halves.
    pub async fn accept(&self) -> Result<(OwnedReadHalf, OwnedWriteHalf)> {
        let (stream, _) = self.listener.accept().await?;
        Ok(stream.into_split())
    }

    /// Serve every accepted connection on its own task until `cancellation`
    /// fires, then wait for open connections to wind down.
    pub async fn serve<H: ServiceHost>(
        &self,
        invoker: MethodInvoker<H>,
        cancellation: &CancellationToken,
    ) -> Result<()> {
        let mut connections = JoinSet::new();
        let mut next_id: u64 = 1;

        loop {
            let (reader, writer) = tokio::select! {
                biased;
                _ = cancellation.cancelled() => break,
                accepted = self.accept() => match accepted {
                    Ok(halves) => halves,
                    Err(err) => {
                        warn!(error = %err, "accept failed");
                        if pause_before_retry(cancellation).await {
                            continue;
                        }
                        break;
                    }
                },
            };

            let peer = format!("conn-{next_id}");
            next_id += 1;
            let connection =
                Connection::with_config(reader, writer, invoker.clone(), self.config.clone());
            let token = cancellation.child_token();
            connections.spawn(async move {
                debug!(%peer, "connection accepted");
                match connection.serve(&token).await {
                    Ok(stats) => info!(%peer, requests = stats.requests, "connection closed"),
                    Err(PeerError::Cancelled) => debug!(%peer, "connection cancelled"),
                    Err(err) => warn!(%peer, error = %err, "connection failed"),
                }
            });

            while connections.try_join_next().is_some() {}
        }

        while connections.join_next().await.is_some() {}
        Ok(())
    }
}

impl Drop for ConnectionListener {
    fn drop(&mut self) {
        if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
            if metadata.file_type().is_socket() {
                debug!(path = ?self.path, "cleaning up socket file");
                let _ = std::fs::remove_file(&self.path);
            }
        }
    }
}

/// Wait out [`ACCEPT_RETRY_DELAY`]. False when `cancellation` fires first.
async fn pause_before_retry(cancellation: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancellation.cancelled() => false,
        _ = tokio::time::sleep(ACCEPT_RETRY_DELAY) => true,
    }
}

/// Bind `path` and serve `invoker` on it until `cancellation` fires.
pub async fn serve_unix<H: ServiceHost>(
    path: impl AsRef<Path>,
    invoker: MethodInvoker<H>,
    config: ConnectionConfig,
    cancellation: &CancellationToken,
) -> Result<()> {
    let listener = ConnectionListener::bind(path)?.with_config(config);
    info!(path = ?listener.path(), "serving on unix socket");
    listener.serve(invoker, cancellation).await
}
