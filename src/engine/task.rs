//! Schedulable async units.

use super::PlanContext;
use crate::error::BoxError;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::fmt;
use std::future::Future;

/// A promise-like handle: a boxed future that resolves to a value or a failure.
pub type Promise<T> = BoxFuture<'static, Result<T, BoxError>>;

type TaskBody<T> = Box<dyn FnOnce(PlanContext) -> Promise<T> + Send>;

/// A named, single-use unit of async work.
///
/// The body does not run until the task is handed to an [`Engine`](super::Engine) or a
/// [`PlanContext`]; it then receives the context of the plan it runs in, which it can
/// use to attach further children to the same plan.
pub struct Task<T> {
    name: String,
    body: TaskBody<T>,
}

impl<T: Send + 'static> Task<T> {
    pub fn new<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(PlanContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            body: Box::new(move |ctx| body(ctx).boxed()),
        }
    }

    /// A task that completes immediately with `value`.
    pub fn value(name: impl Into<String>, value: T) -> Self {
        Self::new(name, move |_| async move { Ok(value) })
    }

    /// A task that fails immediately with `error`.
    pub fn failure(name: impl Into<String>, error: impl Into<BoxError>) -> Self {
        let error = error.into();
        Self::new(name, move |_| async move { Err(error) })
    }

    /// Wraps an existing promise; the plan context is not needed.
    pub fn from_promise(name: impl Into<String>, promise: Promise<T>) -> Self {
        Self::new(name, move |_| promise)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (String, TaskBody<T>) {
        (self.name, self.body)
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("name", &self.name).finish_non_exhaustive()
    }
}
