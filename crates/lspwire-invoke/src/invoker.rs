use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, trace};

use crate::context::InvocationContext;
use crate::error::{InvokeError, MethodError, Result};
use crate::host::{Service, ServiceHost};
use crate::table::{Arguments, Invocation, MethodTable};

/// Resolves methods by name and runs them against a fresh service instance.
///
/// Shared by every in-flight call; invocations run concurrently and each
/// gets its own instance from the host.
pub struct MethodInvoker<H: ServiceHost> {
    table: Arc<MethodTable<H::Service>>,
    host: Arc<H>,
}

impl<H: ServiceHost> Clone for MethodInvoker<H> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            host: Arc::clone(&self.host),
        }
    }
}

impl<H: ServiceHost> MethodInvoker<H> {
    pub fn new(table: MethodTable<H::Service>, host: H) -> Self {
        Self {
            table: Arc::new(table),
            host: Arc::new(host),
        }
    }

    pub fn table(&self) -> &MethodTable<H::Service> {
        &self.table
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Invoke `context.method()` with `arguments`.
    ///
    /// The service instance is released on every exit path, including when
    /// the returned future is dropped mid-flight. A deferred method that
    /// completes without a value yields `Value::Null`.
    pub async fn invoke(&self, context: InvocationContext, arguments: Arguments) -> Result<Value> {
        let entry = self
            .table
            .resolve(context.method())
            .ok_or_else(|| InvokeError::MethodNotFound(context.method().to_string()))?;

        let cancellation = context.cancellation().clone();
        if cancellation.is_cancelled() {
            return Err(InvokeError::Cancelled);
        }

        let context = context.with_service_type(std::any::type_name::<H::Service>());
        let method = context.method();
        let started = Instant::now();

        let mut service =
            self.host
                .create(&context)
                .map_err(|source| InvokeError::ServiceUnavailable {
                    method: method.to_string(),
                    source,
                })?;
        service.bind(&context);
        let mut lease = Lease {
            host: &*self.host,
            service: Some(service),
        };

        debug!(method, kind = ?entry.kind(), "invoking");

        let outcome = match lease.service_mut() {
            Some(service) => match entry.call(service, arguments) {
                Invocation::Immediate(result) => result.map(Some),
                Invocation::Deferred(pending) => {
                    tokio::select! {
                        biased;
                        _ = cancellation.cancelled() => Err(MethodError::Cancelled),
                        result = pending => result,
                    }
                }
            },
            None => Err(MethodError::failed("service instance already released")),
        };

        trace!(
            method,
            elapsed_us = started.elapsed().as_micros() as u64,
            ok = outcome.is_ok(),
            "invocation finished"
        );

        drop(lease);
        match outcome {
            Ok(value) => Ok(value.unwrap_or(Value::Null)),
            Err(err) => Err(InvokeError::from_method(method, err)),
        }
    }
}

/// Hands the instance back to the host when dropped.
struct Lease<'h, H: ServiceHost> {
    host: &'h H,
    service: Option<H::Service>,
}

impl<H: ServiceHost> Lease<'_, H> {
    fn service_mut(&mut self) -> Option<&mut H::Service> {
        self.service.as_mut()
    }
}

impl<H: ServiceHost> Drop for Lease<'_, H> {
    fn drop(&mut self) {
        if let Some(service) = self.service.take() {
            self.host.release(service);
        }
    }
}
