//! # Request Multiplexing
//!
//! Fans a batch of independent sub-requests out from one inbound request. The whole batch
//! runs under a single top-level plan: the multiplexer starts the plan, enters it into a
//! [`ContextSlot`] and dispatches every sub-request with
//! [`MethodInvoker::invoke_in`]. PROMISE and TASK sub-invocations therefore join the
//! batch plan and share its trace instead of starting plans of their own.
//!
//! Every sub-request still gets its own completion sink and its own single outcome.

use crate::arguments::{ArgumentBuilder, RequestData};
use crate::completion::{CompletionSink, ExecutionReportBuilder};
use crate::context_slot::ContextSlot;
use crate::engine::{PlanContext, Task};
use crate::invoker::MethodInvoker;
use crate::routing::RoutingResult;
use std::sync::Arc;
use tracing::{debug, info};

/// One entry of a multiplexed batch.
pub struct SubRequest {
    pub request: RequestData,
    pub routing: RoutingResult,
    pub builder: Arc<dyn ArgumentBuilder>,
    pub sink: Arc<dyn CompletionSink>,
    pub report: Option<Arc<ExecutionReportBuilder>>,
}

impl SubRequest {
    pub fn new(
        request: RequestData,
        routing: RoutingResult,
        builder: Arc<dyn ArgumentBuilder>,
        sink: Arc<dyn CompletionSink>,
    ) -> Self {
        Self {
            request,
            routing,
            builder,
            sink,
            report: None,
        }
    }

    pub fn with_report(mut self, report: Arc<ExecutionReportBuilder>) -> Self {
        self.report = Some(report);
        self
    }
}

pub struct Multiplexer {
    invoker: MethodInvoker,
}

impl Multiplexer {
    pub fn new(invoker: MethodInvoker) -> Self {
        Self { invoker }
    }

    /// Dispatches `batch` under one shared plan.
    ///
    /// Without a scheduling engine there is no plan to share; each sub-request is then
    /// invoked on its own, and async ones fail with the usual configuration error.
    pub fn dispatch(&self, batch: Vec<SubRequest>) {
        info!(size = batch.len(), "Multiplexing batch");
        let Some(engine) = self.invoker.engine().cloned() else {
            for sub in batch {
                self.invoker
                    .invoke(&sub.request, &sub.routing, sub.builder.as_ref(), sub.sink, sub.report);
            }
            return;
        };

        let invoker = self.invoker.clone();
        engine.run(Task::new("multiplexed", move |plan: PlanContext| async move {
            debug!(plan = plan.id(), "Batch plan started");
            let slot = ContextSlot::new();
            let _scope = slot.enter(plan);
            for sub in batch {
                invoker.invoke_in(
                    &slot,
                    &sub.request,
                    &sub.routing,
                    sub.builder.as_ref(),
                    sub.sink,
                    sub.report,
                );
            }
            Ok(())
        }));
    }
}
