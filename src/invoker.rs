//! # Method Invoker
//!
//! Entry point of the crate. [`MethodInvoker::invoke`] takes a resolved route and:
//!
//! 1. creates the resource instance through the [`ResourceFactory`],
//! 2. injects the [`ExecutionContext`](crate::ExecutionContext) if the resource asks for it,
//! 3. builds the arguments through the [`ArgumentBuilder`],
//! 4. hands everything to the adapter for the method's calling convention.
//!
//! Whatever happens along the way, the [`CompletionSink`] receives exactly one outcome.
//! Failures in steps 1 to 3 are delivered as errors before any application method runs,
//! and panics are captured rather than unwound into the caller.
//!
//! ## Example
//! ```ignore
//! let invoker = MethodInvoker::new(Arc::new(registry), Some(Arc::new(TokioEngine::current()?)));
//! let outcome = invoker.call(&request, &routing, &builder).await;
//! ```

use crate::adapters::{self, guarded, Invocation, Scheduling};
use crate::arguments::{ArgumentBuilder, Arguments, RequestData};
use crate::completion::{outcome_channel, Completion, CompletionSink, ExecutionReportBuilder, Outcome};
use crate::config::InvokerConfig;
use crate::context_slot::ContextSlot;
use crate::engine::{Engine, PlanContext};
use crate::error::{BoxError, ServiceError};
use crate::normalize::ErrorNormalizer;
use crate::resource::{Resource, ResourceFactory};
use crate::routing::RoutingResult;
use std::sync::Arc;
use tracing::{debug, info_span, warn};

/// Invokes resource methods and delivers their outcome to a completion sink.
#[derive(Clone)]
pub struct MethodInvoker {
    factory: Arc<dyn ResourceFactory>,
    engine: Option<Arc<dyn Engine>>,
    normalizer: ErrorNormalizer,
}

impl MethodInvoker {
    /// `engine` may be `None`; PROMISE and TASK methods then fail with a
    /// configuration error instead of running.
    pub fn new(factory: Arc<dyn ResourceFactory>, engine: Option<Arc<dyn Engine>>) -> Self {
        Self {
            factory,
            engine,
            normalizer: ErrorNormalizer::default(),
        }
    }

    pub fn with_config(mut self, config: &InvokerConfig) -> Self {
        self.normalizer = ErrorNormalizer::from_config(config);
        self
    }

    pub fn engine(&self) -> Option<&Arc<dyn Engine>> {
        self.engine.as_ref()
    }

    pub fn normalizer(&self) -> &ErrorNormalizer {
        &self.normalizer
    }

    /// Invokes the routed method with no ambient plan: async methods start a plan of
    /// their own.
    pub fn invoke(
        &self,
        request: &RequestData,
        routing: &RoutingResult,
        builder: &dyn ArgumentBuilder,
        sink: Arc<dyn CompletionSink>,
        report: Option<Arc<ExecutionReportBuilder>>,
    ) {
        self.dispatch(None, request, routing, builder, sink, report);
    }

    /// Invokes the routed method, letting async methods join the plan currently held
    /// by `slot`, if any.
    pub fn invoke_in(
        &self,
        slot: &ContextSlot,
        request: &RequestData,
        routing: &RoutingResult,
        builder: &dyn ArgumentBuilder,
        sink: Arc<dyn CompletionSink>,
        report: Option<Arc<ExecutionReportBuilder>>,
    ) {
        self.dispatch(slot.current(), request, routing, builder, sink, report);
    }

    /// Invokes the routed method and waits for its outcome.
    pub async fn call(
        &self,
        request: &RequestData,
        routing: &RoutingResult,
        builder: &dyn ArgumentBuilder,
    ) -> Outcome {
        let (sink, outcome) = outcome_channel();
        self.invoke(request, routing, builder, sink, None);
        outcome.await.unwrap_or_else(|_| Outcome::Error {
            error: ServiceError::internal("invocation finished without an outcome"),
            report: None,
            request_attachments: None,
            response_attachments: None,
        })
    }

    fn dispatch(
        &self,
        ambient: Option<PlanContext>,
        request: &RequestData,
        routing: &RoutingResult,
        builder: &dyn ArgumentBuilder,
        sink: Arc<dyn CompletionSink>,
        report: Option<Arc<ExecutionReportBuilder>>,
    ) {
        let descriptor = Arc::clone(routing.descriptor());
        let span = info_span!(
            "invoke",
            resource = %descriptor.resource_type(),
            method = descriptor.name(),
            interface = %descriptor.interface_type(),
        );
        let _entered = span.enter();

        let completion = Completion::new(
            descriptor.label(),
            sink,
            report,
            routing.context(),
            self.normalizer.clone(),
        );

        let (resource, arguments) = match self.prepare(request, routing, builder, completion.label()) {
            Ok(prepared) => prepared,
            Err(failure) => {
                warn!(error = %failure, "Invocation setup failed");
                completion.fail(failure);
                return;
            }
        };

        debug!(ambient_plan = ambient.as_ref().map(|p| p.id()), "Dispatching");
        adapters::dispatch(
            Invocation {
                descriptor,
                resource,
                arguments,
                completion,
            },
            Scheduling {
                engine: self.engine.clone(),
                ambient,
            },
        );
    }

    fn prepare(
        &self,
        request: &RequestData,
        routing: &RoutingResult,
        builder: &dyn ArgumentBuilder,
        label: &str,
    ) -> Result<(Arc<dyn Resource>, Arguments), BoxError> {
        let descriptor = routing.descriptor();
        let mut resource = guarded(label, || self.factory.create(descriptor.resource_type()))?;
        guarded(label, || {
            if let Some(aware) = resource.context_aware() {
                aware.set_context(Arc::clone(routing.context()));
            }
            Ok(())
        })?;
        let arguments = guarded(label, || builder.build(request, routing))?;
        Ok((Arc::from(resource), arguments))
    }
}
