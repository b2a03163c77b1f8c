//! Method invocation for JSON-RPC dispatch.
//!
//! A [`MethodTable`] maps method names to thunks on a service type. For each
//! call, [`MethodInvoker`] asks the [`ServiceHost`] for a fresh instance,
//! binds the [`InvocationContext`] onto it, runs the method and releases the
//! instance on every exit path.
//!
//! ```ignore
//! let mut table = MethodTable::<Calculator>::new();
//! table.register("add", |_, args| Ok(json!(args.get::<i64>(0)? + args.get::<i64>(1)?)));
//! let invoker = MethodInvoker::new(table, DefaultHost::<Calculator>::default());
//! let ctx = InvocationContext::new("add", Some(Id::Number(1)), CancellationToken::new());
//! assert_eq!(invoker.invoke(ctx, Arguments::new(vec![json!(2), json!(3)])).await?, json!(5));
//! ```

pub mod context;
pub mod error;
pub mod host;
pub mod invoker;
pub mod table;

pub use context::InvocationContext;
pub use error::{BoxError, InvokeError, MethodError, Result};
pub use host::{DefaultHost, FnHost, Service, ServiceHost};
pub use invoker::MethodInvoker;
pub use table::{
    Arguments, BoxFuture, DeferredResult, Invocation, MethodEntry, MethodKind, MethodTable, Thunk,
};
