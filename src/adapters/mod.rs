//! # Interface Adapters
//!
//! One strategy per calling convention. The dispatcher picks the adapter from the
//! descriptor's [`MethodHandle`] variant exactly once; from then on each adapter owns the
//! invocation and guarantees that its [`Completion`] receives exactly one outcome.
//!
//! - [`sync`] runs the method on the calling thread and delivers its return value.
//! - [`callback`] injects a [`Callback`](crate::Callback) and waits for the method to use it.
//! - [`promise`] and [`task`] wrap the method into an async unit and hand it to the
//!   scheduling engine; the shared plumbing lives in [`scheduled`].

mod callback;
mod promise;
mod scheduled;
mod sync;
mod task;

use crate::arguments::Arguments;
use crate::completion::Completion;
use crate::descriptor::{MethodHandle, ResourceMethodDescriptor};
use crate::engine::{Engine, PlanContext};
use crate::error::{BoxError, FrameworkError, InvocationError};
use crate::resource::Resource;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Everything an adapter needs to run one method call.
pub(crate) struct Invocation {
    pub(crate) descriptor: Arc<ResourceMethodDescriptor>,
    pub(crate) resource: Arc<dyn Resource>,
    pub(crate) arguments: Arguments,
    pub(crate) completion: Arc<Completion>,
}

/// Where PROMISE and TASK units get scheduled.
#[derive(Clone, Default)]
pub(crate) struct Scheduling {
    pub(crate) engine: Option<Arc<dyn Engine>>,
    pub(crate) ambient: Option<PlanContext>,
}

pub(crate) fn dispatch(invocation: Invocation, scheduling: Scheduling) {
    match invocation.descriptor.handle().clone() {
        MethodHandle::Sync(method) => sync::invoke(method, invocation),
        MethodHandle::Callback(method) => callback::invoke(method, invocation),
        MethodHandle::Promise(method) => promise::invoke(method, invocation, scheduling),
        MethodHandle::Task(method) => task::invoke(method, invocation, scheduling),
    }
}

/// Runs `f`, turning a panic into an [`InvocationError`] attributed to `label`.
pub(crate) fn guarded<T>(label: &str, f: impl FnOnce() -> Result<T, BoxError>) -> Result<T, BoxError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let cause = FrameworkError::from_panic(payload);
            warn!(method = %label, error = %cause, "Application code panicked");
            Err(Box::new(InvocationError::new(label, cause)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guarded_passes_results_through() {
        let ok = guarded("Test.ok", || Ok::<_, BoxError>(5));
        assert_eq!(ok.unwrap(), 5);
        let err = guarded::<()>("Test.err", || Err("plain".into()));
        assert_eq!(err.unwrap_err().to_string(), "plain");
    }

    #[test]
    fn guarded_wraps_panics_once() {
        let err = guarded::<()>("Test.panic", || panic!("exploded")).unwrap_err();
        let wrapper = err.downcast_ref::<InvocationError>().unwrap();
        assert_eq!(wrapper.method(), "Test.panic");
        assert_eq!(wrapper.cause().to_string(), "panicked: exploded");
    }
}
