use lspwire_frame::Id;
use tokio_util::sync::CancellationToken;

/// Per-call data handed to the service host and bound onto the instance.
///
/// Created for each inbound request or notification and dropped when the
/// call completes.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    method: String,
    service_type: &'static str,
    request_id: Option<Id>,
    cancellation: CancellationToken,
}

impl InvocationContext {
    pub fn new(
        method: impl Into<String>,
        request_id: Option<Id>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            method: method.into(),
            service_type: "",
            request_id,
            cancellation,
        }
    }

    pub(crate) fn with_service_type(mut self, service_type: &'static str) -> Self {
        self.service_type = service_type;
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Type name of the service the method is resolved against.
    pub fn service_type(&self) -> &'static str {
        self.service_type
    }

    /// `None` for notifications.
    pub fn request_id(&self) -> Option<&Id> {
        self.request_id.as_ref()
    }

    pub fn is_notification(&self) -> bool {
        self.request_id.is_none()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}
