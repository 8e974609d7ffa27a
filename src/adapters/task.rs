//! TASK adapter: the method returns a task, run as a child unit of the same plan.

use super::scheduled::schedule;
use super::{Invocation, Scheduling};
use crate::arguments::Arguments;
use crate::descriptor::TaskFn;
use crate::engine::PlanContext;
use crate::resource::Resource;
use futures_util::FutureExt;
use std::sync::Arc;

pub(super) fn invoke(method: Arc<TaskFn>, invocation: Invocation, scheduling: Scheduling) {
    let normalizer = invocation.completion.normalizer().clone();
    schedule(
        invocation,
        scheduling,
        Box::new(move |plan: PlanContext, resource: Arc<dyn Resource>, arguments: Arguments| {
            async move {
                let task = method(resource.as_ref(), arguments)?
                    .ok_or_else(|| normalizer.null_result("Task"))?;
                plan.execute(task).await
            }
            .boxed()
        }),
    );
}
