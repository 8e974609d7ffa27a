//! Scheduling shared by the PROMISE and TASK adapters.
//!
//! The application method is wrapped into a unit that runs inside a plan. The wrapper
//! binds the plan context into the descriptor's context slot, runs the method's unit with
//! [`PlanContext::execute`], snapshots the plan trace into the report and delivers the
//! outcome. Where the wrapper runs is the only scheduling decision: inside the ambient
//! plan when one is set, otherwise as a new top-level plan.

use super::{Invocation, Scheduling};
use crate::arguments::{Argument, Arguments, Payload};
use crate::engine::{PlanContext, Promise, Task};
use crate::error::ServiceError;
use crate::resource::Resource;
use std::sync::Arc;
use tracing::{debug, warn};

/// Produces the method's async unit once the wrapper is running inside a plan.
pub(super) type UnitBody =
    Box<dyn FnOnce(PlanContext, Arc<dyn Resource>, Arguments) -> Promise<Payload> + Send>;

pub(super) fn schedule(invocation: Invocation, scheduling: Scheduling, body: UnitBody) {
    let Invocation {
        descriptor,
        resource,
        mut arguments,
        completion,
    } = invocation;

    let Some(engine) = scheduling.engine else {
        let error = ServiceError::internal(format!(
            "{} method {}.{}, but no engine configured",
            descriptor.interface_type(),
            descriptor.resource_type().name(),
            descriptor.name(),
        ));
        warn!(method = %completion.label(), "No scheduling engine configured");
        completion.fail_unstarted(error);
        return;
    };

    let label = completion.label().to_string();
    let context_index = descriptor.context_index();
    let done = Arc::clone(&completion);
    let wrapper = Task::new(format!("{label} (invoke)"), move |plan: PlanContext| async move {
        if let Some(index) = context_index {
            arguments.bind(index, Argument::Context(plan.clone()));
        }
        let unit = Task::new(label, move |unit_plan| body(unit_plan, resource, arguments));
        let outcome = plan.execute(unit).await;
        done.attach_trace(plan.trace());
        done.finish(outcome);
        Ok(())
    });

    match scheduling.ambient {
        Some(plan) => {
            debug!(plan = plan.id(), method = %completion.label(), "Joining ambient plan");
            plan.run(wrapper);
        }
        None => {
            debug!(method = %completion.label(), "Starting new plan");
            engine.run(wrapper);
        }
    }
}
