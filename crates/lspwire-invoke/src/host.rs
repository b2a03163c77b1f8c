//! Service host boundary: creates and releases per-call service instances.

use crate::context::InvocationContext;
use crate::error::BoxError;

/// A service type whose methods are registered in a method table.
pub trait Service: Send + 'static {
    /// Called once after creation, before the method runs.
    fn bind(&mut self, _context: &InvocationContext) {}
}

/// Creates a fresh service instance for every invocation and takes it back
/// afterwards.
///
/// An instance is owned by exactly one invocation and is never shared.
pub trait ServiceHost: Send + Sync + 'static {
    type Service: Service;

    /// Create the instance that will serve `context`.
    fn create(&self, context: &InvocationContext) -> Result<Self::Service, BoxError>;

    /// Return an instance once its invocation has finished, on every exit path.
    fn release(&self, service: Self::Service) {
        drop(service);
    }
}

/// Host that builds each instance with `Default`.
#[derive(Debug)]
pub struct DefaultHost<S>(std::marker::PhantomData<fn() -> S>);

impl<S> Default for DefaultHost<S> {
    fn default() -> Self {
        Self(std::marker::PhantomData)
    }
}

impl<S: Service + Default> ServiceHost for DefaultHost<S> {
    type Service = S;

    fn create(&self, _context: &InvocationContext) -> Result<S, BoxError> {
        Ok(S::default())
    }
}

/// Host backed by a factory closure.
pub struct FnHost<F>(F);

impl<F> FnHost<F> {
    pub fn new(factory: F) -> Self {
        Self(factory)
    }
}

impl<S, F> ServiceHost for FnHost<F>
where
    S: Service,
    F: Fn(&InvocationContext) -> Result<S, BoxError> + Send + Sync + 'static,
{
    type Service = S;

    fn create(&self, context: &InvocationContext) -> Result<S, BoxError> {
        (self.0)(context)
    }
}
