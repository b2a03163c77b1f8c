use std::time::Duration;

use lspwire_invoke::{DefaultHost, MethodInvoker};
use lspwire_peer::{Connection, ConnectionConfig, PeerError};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::calculator::{self, Calculator};
use crate::cmd::{runtime, ServeArgs};
use crate::exit::{peer_error, CliError, CliResult, INTERNAL, SUCCESS};

const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let mut config = ConnectionConfig::default().with_max_concurrent_requests(args.max_concurrent);
    if let Some(charset) = args.charset {
        config = config.with_charset(charset);
    }

    let shutdown = CancellationToken::new();
    install_ctrlc_handler(shutdown.clone())?;

    let invoker = MethodInvoker::new(calculator::methods(), DefaultHost::<Calculator>::default());
    let rt = runtime()?;

    let outcome = rt.block_on(async {
        match &args.socket {
            Some(path) => serve_socket(path, invoker, config, &shutdown).await,
            None => serve_stdio(invoker, config, &shutdown).await,
        }
    });
    // stdin is read on a blocking thread that cannot be interrupted.
    rt.shutdown_timeout(SHUTDOWN_GRACE);

    match outcome {
        Ok(()) | Err(PeerError::Cancelled) => Ok(SUCCESS),
        Err(err) => Err(peer_error("serve failed", err)),
    }
}

async fn serve_stdio(
    invoker: MethodInvoker<DefaultHost<Calculator>>,
    config: ConnectionConfig,
    shutdown: &CancellationToken,
) -> Result<(), PeerError> {
    info!(methods = ?invoker.table().names(), "serving on stdio");
    let connection = Connection::with_config(tokio::io::stdin(), tokio::io::stdout(), invoker, config);
    let stats = connection.serve(shutdown).await?;
    info!(
        requests = stats.requests,
        notifications = stats.notifications,
        "stdio session closed"
    );
    Ok(())
}

#[cfg(unix)]
async fn serve_socket(
    path: &std::path::Path,
    invoker: MethodInvoker<DefaultHost<Calculator>>,
    config: ConnectionConfig,
    shutdown: &CancellationToken,
) -> Result<(), PeerError> {
    lspwire_peer::serve_unix(path, invoker, config, shutdown).await
}

#[cfg(not(unix))]
async fn serve_socket(
    path: &std::path::Path,
    _invoker: MethodInvoker<DefaultHost<Calculator>>,
    _config: ConnectionConfig,
    _shutdown: &CancellationToken,
) -> Result<(), PeerError> {
    Err(PeerError::Bind {
        path: path.to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "unix sockets are not available on this platform",
        ),
    })
}

fn install_ctrlc_handler(shutdown: CancellationToken) -> CliResult<()> {
    ctrlc::set_handler(move || {
        shutdown.cancel();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
