//! Method table: name to thunk, with the return shape fixed at registration.

use std::collections::HashMap;

pub use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::MethodError;

/// Outcome of a deferred method; `None` means "completed without a value".
pub type DeferredResult = Result<Option<Value>, MethodError>;

/// Whether a method produces its value directly or after awaiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Immediate,
    Deferred,
}

/// What calling a thunk yields.
pub enum Invocation<'a> {
    Immediate(Result<Value, MethodError>),
    Deferred(BoxFuture<'a, DeferredResult>),
}

/// Positional argument list for a method call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Vec<Value>);

impl Arguments {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Arguments from a JSON-RPC `params` member.
    ///
    /// Arrays are positional, absent or `null` params are empty, any other
    /// value becomes the single argument.
    pub fn from_params(params: Option<Value>) -> Self {
        match params {
            None | Some(Value::Null) => Self::default(),
            Some(Value::Array(values)) => Self(values),
            Some(other) => Self(vec![other]),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn raw(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Deserialize the argument at `index`.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T, MethodError> {
        let value = self.0.get(index).ok_or_else(|| {
            MethodError::InvalidArguments(format!("missing argument {index}"))
        })?;
        serde_json::from_value(value.clone())
            .map_err(|e| MethodError::InvalidArguments(format!("argument {index}: {e}")))
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for Arguments {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

/// Callable bound to one method name.
pub trait Thunk<S>: Send + Sync {
    fn call<'a>(&self, service: &'a mut S, arguments: Arguments) -> Invocation<'a>;
}

struct ImmediateThunk<F>(F);

impl<S, F> Thunk<S> for ImmediateThunk<F>
where
    F: Fn(&mut S, Arguments) -> Result<Value, MethodError> + Send + Sync,
{
    fn call<'a>(&self, service: &'a mut S, arguments: Arguments) -> Invocation<'a> {
        Invocation::Immediate((self.0)(service, arguments))
    }
}

struct DeferredThunk<F>(F);

impl<S, F> Thunk<S> for DeferredThunk<F>
where
    F: for<'a> Fn(&'a mut S, Arguments) -> BoxFuture<'a, DeferredResult> + Send + Sync,
{
    fn call<'a>(&self, service: &'a mut S, arguments: Arguments) -> Invocation<'a> {
        Invocation::Deferred((self.0)(service, arguments))
    }
}

/// A registered method.
pub struct MethodEntry<S> {
    name: String,
    kind: MethodKind,
    thunk: Box<dyn Thunk<S>>,
}

impl<S> MethodEntry<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    pub fn call<'a>(&self, service: &'a mut S, arguments: Arguments) -> Invocation<'a> {
        self.thunk.call(service, arguments)
    }
}

/// Maps method names to implementations on service `S`.
///
/// Built once before dispatch starts and read-only afterwards.
pub struct MethodTable<S> {
    methods: HashMap<String, MethodEntry<S>>,
}

impl<S> Default for MethodTable<S> {
    fn default() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }
}

impl<S: 'static> MethodTable<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method that returns its value directly.
    pub fn register<F>(&mut self, name: impl Into<String>, method: F)
    where
        F: Fn(&mut S, Arguments) -> Result<Value, MethodError> + Send + Sync + 'static,
    {
        self.insert(name.into(), MethodKind::Immediate, Box::new(ImmediateThunk(method)));
    }

    /// Register a method that completes asynchronously.
    pub fn register_async<F>(&mut self, name: impl Into<String>, method: F)
    where
        F: for<'a> Fn(&'a mut S, Arguments) -> BoxFuture<'a, DeferredResult>
            + Send
            + Sync
            + 'static,
    {
        self.insert(name.into(), MethodKind::Deferred, Box::new(DeferredThunk(method)));
    }

    fn insert(&mut self, name: String, kind: MethodKind, thunk: Box<dyn Thunk<S>>) {
        if self.methods.contains_key(&name) {
            tracing::warn!(method = %name, "replacing registered method");
        }
        let entry = MethodEntry {
            name: name.clone(),
            kind,
            thunk,
        };
        self.methods.insert(name, entry);
    }

    pub fn resolve(&self, name: &str) -> Option<&MethodEntry<S>> {
        self.methods.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
