//! Mapping of invocation failures onto JSON-RPC error objects.

use std::error::Error;

use lspwire_frame::codes::{
    INTERNAL_ERROR, INVALID_PARAMS, INVOCATION_ERROR, METHOD_NOT_FOUND, REQUEST_CANCELLED,
};
use lspwire_frame::ErrorObject;
use lspwire_invoke::InvokeError;
use serde_json::Value;

/// Error object sent back for a failed request.
pub fn error_object(err: &InvokeError) -> ErrorObject {
    match err {
        InvokeError::MethodNotFound(method) => {
            ErrorObject::new(METHOD_NOT_FOUND, format!("method not found: {method}"))
        }
        InvokeError::ServiceUnavailable { method, source } => {
            ErrorObject::new(INTERNAL_ERROR, format!("service unavailable for {method}"))
                .with_data(cause_chain(source.as_ref()))
        }
        InvokeError::InvalidArguments { message, .. } => {
            ErrorObject::new(INVALID_PARAMS, message.clone())
        }
        InvokeError::TargetFailed { source, .. } => {
            ErrorObject::new(INVOCATION_ERROR, source.to_string())
                .with_data(cause_chain(source.as_ref()))
        }
        InvokeError::Cancelled => ErrorObject::new(REQUEST_CANCELLED, "request cancelled"),
    }
}

/// Messages of `err` and every error below it, outermost first.
fn cause_chain(err: &(dyn Error + 'static)) -> Value {
    let mut chain = Vec::new();
    let mut current = Some(err);
    while let Some(e) = current {
        chain.push(Value::String(e.to_string()));
        current = e.source();
    }
    Value::Array(chain)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("config unreadable")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn codes_per_failure() {
        let not_found = error_object(&InvokeError::MethodNotFound("x".into()));
        assert_eq!(not_found.code, -32601);

        let cancelled = error_object(&InvokeError::Cancelled);
        assert_eq!(cancelled.code, -32800);
        assert!(cancelled.data.is_none());

        let invalid = error_object(&InvokeError::InvalidArguments {
            method: "add".into(),
            message: "missing argument 1".into(),
        });
        assert_eq!(invalid.code, -32602);
        assert_eq!(invalid.message, "missing argument 1");
    }

    #[test]
    fn target_failure_carries_cause_chain() {
        let source = Outer(std::io::Error::other("permission denied"));
        let err = InvokeError::TargetFailed {
            method: "load".into(),
            source: Box::new(source),
        };
        let obj = error_object(&err);
        assert_eq!(obj.code, -32000);
        assert_eq!(obj.message, "config unreadable");
        assert_eq!(obj.data, Some(json!(["config unreadable", "permission denied"])));
    }

    #[test]
    fn unavailable_service_is_internal() {
        let err = InvokeError::ServiceUnavailable {
            method: "add".into(),
            source: "pool exhausted".into(),
        };
        let obj = error_object(&err);
        assert_eq!(obj.code, -32603);
        assert_eq!(obj.data, Some(json!(["pool exhausted"])));
    }
}
