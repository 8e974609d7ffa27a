//! CALLBACK adapter: the method completes through an injected [`Callback`].

use super::{guarded, Invocation};
use crate::arguments::Argument;
use crate::completion::Callback;
use crate::descriptor::CallbackFn;
use crate::error::FrameworkError;
use std::sync::Arc;
use tracing::warn;

pub(super) fn invoke(method: Arc<CallbackFn>, invocation: Invocation) {
    let Invocation {
        descriptor,
        resource,
        mut arguments,
        completion,
    } = invocation;

    // Registration guarantees the slot exists for callback methods.
    if let Some(index) = descriptor.callback_index() {
        arguments.bind(index, Argument::Callback(Callback::new(Arc::clone(&completion))));
    }

    completion.enter_call();
    let outcome = guarded(completion.label(), || method(resource.as_ref(), arguments));
    let abandoned = completion.leave_call();

    match outcome {
        Err(failure) => completion.fail(failure),
        Ok(()) if abandoned => {
            warn!(method = %completion.label(), "Callback dropped without completion");
            completion.fail(Box::new(FrameworkError::CallbackDropped(
                completion.label().to_string(),
            )));
        }
        // Completion arrives through the callback, possibly from another thread.
        Ok(()) => {}
    }
}
