//! SYNC adapter: the return value is the result.

use super::{guarded, Invocation};
use crate::descriptor::SyncFn;
use std::sync::Arc;

pub(super) fn invoke(method: Arc<SyncFn>, invocation: Invocation) {
    let Invocation {
        resource,
        arguments,
        completion,
        ..
    } = invocation;
    let outcome = guarded(completion.label(), || method(resource.as_ref(), arguments));
    completion.finish(outcome);
}
