//! Demo service exposed by `lspwire serve`.

use std::time::Duration;

use lspwire_invoke::{InvocationContext, MethodError, MethodTable, Service};
use serde_json::{json, Value};

#[derive(Debug, Default)]
pub struct Calculator {
    method: String,
}

impl Service for Calculator {
    fn bind(&mut self, context: &InvocationContext) {
        self.method = context.method().to_string();
    }
}

pub fn methods() -> MethodTable<Calculator> {
    let mut table = MethodTable::<Calculator>::new();

    table.register("add", |_, args| {
        let (a, b): (i64, i64) = (args.get(0)?, args.get(1)?);
        a.checked_add(b)
            .map(Value::from)
            .ok_or_else(|| MethodError::failed(format!("{a} + {b} overflows")))
    });

    table.register("subtract", |_, args| {
        let (a, b): (i64, i64) = (args.get(0)?, args.get(1)?);
        a.checked_sub(b)
            .map(Value::from)
            .ok_or_else(|| MethodError::failed(format!("{a} - {b} overflows")))
    });

    table.register_async("sleep", |_, args| {
        Box::pin(async move {
            let ms: u64 = args.get(0)?;
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok::<_, MethodError>(Some(json!({ "slept_ms": ms })))
        })
    });

    table.register("fail", |calc, args| {
        let reason = args
            .get::<String>(0)
            .unwrap_or_else(|_| "requested failure".to_string());
        Err(MethodError::failed(format!("{}: {reason}", calc.method)))
    });

    table
}

#[cfg(test)]
mod tests {
    use lspwire_frame::Id;
    use lspwire_invoke::{Arguments, DefaultHost, InvokeError, MethodInvoker};
    use tokio_util::sync::CancellationToken;

    use super::*;

    fn invoker() -> MethodInvoker<DefaultHost<Calculator>> {
        MethodInvoker::new(methods(), DefaultHost::default())
    }

    fn call(method: &str) -> InvocationContext {
        InvocationContext::new(method, Some(Id::Number(1)), CancellationToken::new())
    }

    #[tokio::test]
    async fn arithmetic() {
        let inv = invoker();
        let sum = inv
            .invoke(call("add"), Arguments::new(vec![json!(2), json!(3)]))
            .await
            .unwrap();
        assert_eq!(sum, json!(5));

        let diff = inv
            .invoke(call("subtract"), Arguments::new(vec![json!(2), json!(3)]))
            .await
            .unwrap();
        assert_eq!(diff, json!(-1));
    }

    #[tokio::test]
    async fn overflow_is_a_target_failure() {
        let err = invoker()
            .invoke(call("add"), Arguments::new(vec![json!(i64::MAX), json!(1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::TargetFailed { .. }));
    }

    #[tokio::test]
    async fn fail_mentions_bound_method() {
        let err = invoker()
            .invoke(call("fail"), Arguments::new(vec![json!("nope")]))
            .await
            .unwrap_err();
        match err {
            InvokeError::TargetFailed { source, .. } => {
                assert_eq!(source.to_string(), "fail: nope");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn sleep_reports_duration() {
        let value = invoker()
            .invoke(call("sleep"), Arguments::new(vec![json!(1)]))
            .await
            .unwrap();
        assert_eq!(value, json!({ "slept_ms": 1 }));
    }
}
