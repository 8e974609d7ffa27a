//! # Resource Invoker
//!
//! > **The request-invocation core of a resource-oriented RPC/REST server.**
//!
//! Given a resolved route (a resource method plus its calling convention) and the request
//! data, the invoker creates the resource, builds the arguments, calls the method, and
//! delivers **exactly one** outcome to a [`CompletionSink`], however the method chooses to
//! signal completion.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Four conventions, one contract
//! Resource methods come in four shapes, fixed at registration time by the
//! [`ResourceMethodDescriptor`] constructor used:
//!
//! | Interface | Method returns | Injected parameter |
//! |-----------|----------------|--------------------|
//! | `sync` | the result | none |
//! | `callback` | nothing, completes via [`Callback`] | the callback |
//! | `promise` | a [`Promise`] | optional [`PlanContext`] |
//! | `task` | a [`Task`] | optional [`PlanContext`] |
//!
//! Each shape has its own adapter; all of them end in the same sink call.
//!
//! ### Errors are values
//! Nothing escapes `invoke`. Failures (including panics in application code) are mapped
//! by the [`ErrorNormalizer`] onto a [`ServiceError`]: already-tagged errors pass through
//! untouched, everything else becomes a 500 carrying the original as its cause.
//!
//! ### Shared plans
//! PROMISE and TASK methods run inside a *plan* on the scheduling [`Engine`]. When a
//! request fans out into sub-requests (see [`Multiplexer`]), the ambient plan is held in a
//! [`ContextSlot`] and every async sub-invocation joins it, so the batch shares one plan
//! and one [`Trace`].
//!
//! ## 🗺️ Module Tour
//!
//! - [`invoker`]: the [`MethodInvoker`] entry point and setup-failure handling.
//! - [`adapters`](crate::adapters) (private): one strategy per calling convention.
//! - [`completion`]: sinks, [`Outcome`], execution reports and the [`Callback`] handle.
//! - [`normalize`]: the error normalizer.
//! - [`engine`]: tasks, promises, plans and the Tokio-backed engine.
//! - [`context_slot`]: the ambient plan holder.
//! - [`multiplexer`]: batch fan-out under one plan.
//! - [`mock`]: recording sinks and engine doubles for tests.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! RUST_LOG=info cargo run -p invoker-sample
//! cargo test
//! ```

mod adapters;
pub mod arguments;
pub mod completion;
pub mod config;
pub mod context;
pub mod context_slot;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod invoker;
pub mod mock;
pub mod multiplexer;
pub mod normalize;
pub mod resource;
pub mod routing;
pub mod telemetry;

pub use arguments::{payload, Argument, ArgumentBuilder, Arguments, Payload, RequestData};
pub use completion::{
    outcome_channel, Callback, CompletionSink, ExecutionReport, ExecutionReportBuilder, Outcome, OutcomeSender,
};
pub use config::InvokerConfig;
pub use context::{Attachment, ExecutionContext, RequestAttachmentReader, ResponseAttachments};
pub use context_slot::{ContextSlot, SlotScope};
pub use descriptor::{InterfaceType, MethodHandle, ParamRole, ResourceMethodDescriptor};
pub use engine::{Engine, PlanContext, Promise, Task, TaskStatus, TokioEngine, Trace, TraceEntry};
pub use error::{ArgumentError, BoxError, DescriptorError, FrameworkError, HttpStatus, InvocationError, ServiceError};
pub use invoker::MethodInvoker;
pub use multiplexer::{Multiplexer, SubRequest};
pub use normalize::ErrorNormalizer;
pub use resource::{ContextAware, Resource, ResourceFactory, ResourceRegistry, ResourceType};
pub use routing::RoutingResult;
