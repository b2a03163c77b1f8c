/// Boxed error carried as the cause of a failed invocation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a method implementation.
#[derive(Debug, thiserror::Error)]
pub enum MethodError {
    /// The method observed cancellation and stopped.
    #[error("method cancelled")]
    Cancelled,

    /// The argument list does not fit the method.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The method body failed.
    #[error(transparent)]
    Failed(BoxError),
}

impl MethodError {
    /// Wrap any error as a method failure.
    pub fn failed(err: impl Into<BoxError>) -> Self {
        Self::Failed(err.into())
    }
}

/// Errors that can occur while invoking a method.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// No method with this name is registered.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// The service host could not create an instance.
    #[error("service unavailable for {method}: {source}")]
    ServiceUnavailable {
        method: String,
        #[source]
        source: BoxError,
    },

    /// The method rejected its arguments.
    #[error("invalid arguments for {method}: {message}")]
    InvalidArguments { method: String, message: String },

    /// The invocation target failed; `source` is the original error.
    #[error("invocation of {method} failed: {source}")]
    TargetFailed {
        method: String,
        #[source]
        source: BoxError,
    },

    /// The invocation was cancelled.
    #[error("invocation cancelled")]
    Cancelled,
}

impl InvokeError {
    /// True when the error is the result of a cancellation request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, InvokeError::Cancelled)
    }

    pub(crate) fn from_method(method: &str, err: MethodError) -> Self {
        match err {
            MethodError::Cancelled => InvokeError::Cancelled,
            MethodError::InvalidArguments(message) => InvokeError::InvalidArguments {
                method: method.to_string(),
                message,
            },
            MethodError::Failed(source) => InvokeError::TargetFailed {
                method: method.to_string(),
                source,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, InvokeError>;
