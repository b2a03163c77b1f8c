use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lspwire_frame::{
    FrameError, Id, Message, MessageReader, MessageWriter, Notification, Request,
};
use lspwire_invoke::{Arguments, InvocationContext, InvokeError, MethodInvoker, ServiceHost};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::ConnectionConfig;
use crate::error::{PeerError, Result};
use crate::fault;

/// Notification that cancels an in-flight request by id.
pub const CANCEL_REQUEST_METHOD: &str = "$/cancelRequest";

/// Request id to (call serial, token). The serial keeps a finished call from
/// removing a newer call that reused its id.
type InFlight = Arc<Mutex<HashMap<Id, (u64, CancellationToken)>>>;

/// Counters reported when a connection stops serving.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServeStats {
    pub requests: u64,
    pub notifications: u64,
    pub responses: u64,
    pub cancellations: u64,
}

/// One JSON-RPC connection: reads calls, dispatches them, writes responses.
pub struct Connection<R, W, H: ServiceHost> {
    reader: MessageReader<R>,
    writer: Arc<MessageWriter<W>>,
    invoker: MethodInvoker<H>,
    config: ConnectionConfig,
    in_flight: InFlight,
}

impl<R, W, H> Connection<R, W, H>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
    H: ServiceHost,
{
    pub fn new(reader: R, writer: W, invoker: MethodInvoker<H>) -> Self {
        Self::with_config(reader, writer, invoker, ConnectionConfig::default())
    }

    pub fn with_config(
        reader: R,
        writer: W,
        invoker: MethodInvoker<H>,
        config: ConnectionConfig,
    ) -> Self {
        Self {
            reader: MessageReader::with_config(reader, config.frame.clone()),
            writer: Arc::new(MessageWriter::with_config(writer, config.frame.clone())),
            invoker,
            config,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Shared writer, for messages the server sends on its own.
    pub fn writer(&self) -> Arc<MessageWriter<W>> {
        Arc::clone(&self.writer)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Serve until the peer closes the stream, a protocol error occurs, or
    /// `cancellation` fires.
    ///
    /// On clean EOF, calls already in flight finish and their responses are
    /// written before returning, unless `cancellation` fires meanwhile. On
    /// error or cancellation they are cancelled first, and responses still
    /// blocked on the peer after `drain_timeout` are abandoned. The writer is
    /// disposed on every path.
    pub async fn serve(mut self, cancellation: &CancellationToken) -> Result<ServeStats> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_requests.max(1)));
        let calls = cancellation.child_token();
        let responses = CancellationToken::new();
        let mut tasks = JoinSet::new();
        let mut stats = ServeStats::default();

        let mut outcome = loop {
            while let Some(joined) = tasks.try_join_next() {
                log_join(joined);
            }

            let message = match self.reader.read_next(cancellation).await {
                Ok(Some(message)) => message,
                Ok(None) => {
                    debug!("peer closed the stream");
                    break Ok(());
                }
                Err(FrameError::Cancelled) => break Err(PeerError::Cancelled),
                Err(err) => {
                    warn!(error = %err, "inbound stream failed");
                    break Err(PeerError::Frame(err));
                }
            };

            match message {
                Message::Request(request) => {
                    stats.requests += 1;
                    tasks.spawn(self.handle_request(
                        request,
                        stats.requests,
                        &semaphore,
                        &calls,
                        &responses,
                    ));
                }
                Message::Notification(notification)
                    if notification.method == CANCEL_REQUEST_METHOD =>
                {
                    stats.cancellations += 1;
                    self.cancel_request(notification.params.as_ref());
                }
                Message::Notification(notification) => {
                    stats.notifications += 1;
                    tasks.spawn(self.handle_notification(notification, &semaphore, &calls));
                }
                Message::Response(response) => {
                    stats.responses += 1;
                    debug!(id = %response.id, "ignoring response with no outstanding call");
                }
            }
        };

        if outcome.is_ok() {
            tokio::select! {
                _ = join_all(&mut tasks) => {}
                _ = cancellation.cancelled() => {
                    debug!("cancelled while finishing in-flight calls");
                    outcome = Err(PeerError::Cancelled);
                }
            }
        }
        if outcome.is_err() {
            calls.cancel();
            let drained =
                tokio::time::timeout(self.config.drain_timeout, join_all(&mut tasks)).await;
            if drained.is_err() {
                warn!(pending = tasks.len(), "peer is not reading; abandoning pending responses");
                responses.cancel();
                join_all(&mut tasks).await;
            }
        }

        if let Err(err) = self.writer.dispose().await {
            debug!(error = %err, "writer shutdown failed");
        }
        self.reader.dispose();

        debug!(
            requests = stats.requests,
            notifications = stats.notifications,
            responses = stats.responses,
            cancellations = stats.cancellations,
            "connection finished"
        );
        outcome.map(|()| stats)
    }

    fn handle_request(
        &self,
        request: Request,
        serial: u64,
        semaphore: &Arc<Semaphore>,
        calls: &CancellationToken,
        responses: &CancellationToken,
    ) -> impl Future<Output = ()> + Send + 'static {
        let token = calls.child_token();
        let responses = responses.clone();
        if lock(&self.in_flight)
            .insert(request.id.clone(), (serial, token.clone()))
            .is_some()
        {
            warn!(id = %request.id, "request id reused while still in flight");
        }

        let invoker = self.invoker.clone();
        let writer = Arc::clone(&self.writer);
        let in_flight = Arc::clone(&self.in_flight);
        let semaphore = Arc::clone(semaphore);

        async move {
            let Request { id, method, params } = request;
            let outcome = match acquire(semaphore, &token).await {
                Some(_permit) => {
                    let context = InvocationContext::new(method.as_str(), Some(id.clone()), token);
                    invoker.invoke(context, Arguments::from_params(params)).await
                }
                None => Err(InvokeError::Cancelled),
            };
            {
                let mut in_flight = lock(&in_flight);
                if in_flight.get(&id).is_some_and(|(call, _)| *call == serial) {
                    in_flight.remove(&id);
                }
            }

            let response = match outcome {
                Ok(value) => Message::result(id, value),
                Err(err) => {
                    debug!(method = %method, error = %err, "request failed");
                    Message::error(id, fault::error_object(&err))
                }
            };
            // A cancelled call still gets its response; only `responses`
            // abandons the write.
            if let Err(err) = writer.write(&response, &responses).await {
                warn!(method = %method, error = %err, "failed to write response");
            }
        }
    }

    fn handle_notification(
        &self,
        notification: Notification,
        semaphore: &Arc<Semaphore>,
        calls: &CancellationToken,
    ) -> impl Future<Output = ()> + Send + 'static {
        let token = calls.child_token();
        let invoker = self.invoker.clone();
        let semaphore = Arc::clone(semaphore);

        async move {
            let Notification { method, params } = notification;
            let Some(_permit) = acquire(semaphore, &token).await else {
                return;
            };
            let context = InvocationContext::new(method.as_str(), None, token);
            match invoker.invoke(context, Arguments::from_params(params)).await {
                Ok(_) => {}
                Err(InvokeError::MethodNotFound(_)) => {
                    debug!(method = %method, "no handler for notification");
                }
                Err(InvokeError::Cancelled) => trace!(method = %method, "notification cancelled"),
                Err(err) => warn!(method = %method, error = %err, "notification failed"),
            }
        }
    }

    fn cancel_request(&self, params: Option<&Value>) {
        let id = params
            .and_then(|p| p.get("id"))
            .and_then(|v| serde_json::from_value::<Id>(v.clone()).ok());
        let Some(id) = id else {
            warn!("{CANCEL_REQUEST_METHOD} without a usable id");
            return;
        };
        match lock(&self.in_flight).get(&id) {
            Some((_, token)) => {
                debug!(id = %id, "cancelling request");
                token.cancel();
            }
            None => trace!(id = %id, "cancel for a request that is not in flight"),
        }
    }
}

async fn acquire(
    semaphore: Arc<Semaphore>,
    cancel: &CancellationToken,
) -> Option<OwnedSemaphorePermit> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        permit = semaphore.acquire_owned() => permit.ok(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn join_all(tasks: &mut JoinSet<()>) {
    while let Some(joined) = tasks.join_next().await {
        log_join(joined);
    }
}

fn log_join(joined: std::result::Result<(), JoinError>) {
    if let Err(err) = joined {
        if err.is_panic() {
            warn!(error = %err, "call task panicked");
        }
    }
}
