//! PROMISE adapter: the method returns a promise the plan awaits.

use super::scheduled::schedule;
use super::{Invocation, Scheduling};
use crate::arguments::Arguments;
use crate::descriptor::PromiseFn;
use crate::engine::PlanContext;
use crate::resource::Resource;
use futures_util::FutureExt;
use std::sync::Arc;

pub(super) fn invoke(method: Arc<PromiseFn>, invocation: Invocation, scheduling: Scheduling) {
    let normalizer = invocation.completion.normalizer().clone();
    schedule(
        invocation,
        scheduling,
        Box::new(move |_plan: PlanContext, resource: Arc<dyn Resource>, arguments: Arguments| {
            async move {
                let promise = method(resource.as_ref(), arguments)?
                    .ok_or_else(|| normalizer.null_result("Promise"))?;
                promise.await
            }
            .boxed()
        }),
    );
}
