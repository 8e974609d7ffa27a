//! # Test Doubles
//!
//! Utilities for testing invocations in isolation.
//!
//! Use [`recording_sink`] to get a sink plus a receiver for the outcomes it is handed, and
//! [`MockEngine`] to observe how PROMISE and TASK methods get scheduled.

use crate::arguments::{ArgumentBuilder, Arguments, Payload, RequestData};
use crate::completion::{CompletionSink, ExecutionReport, Outcome};
use crate::context::{RequestAttachmentReader, ResponseAttachments};
use crate::engine::{Engine, Task, TokioEngine};
use crate::error::{BoxError, ServiceError};
use crate::resource::{Resource, ResourceFactory, ResourceType};
use crate::routing::RoutingResult;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::debug;

// =============================================================================
// COMPLETION SINK
// =============================================================================

/// Sink that forwards every outcome to a channel and counts deliveries.
pub struct RecordingSink {
    sender: mpsc::UnboundedSender<Outcome>,
    deliveries: AtomicUsize,
}

impl RecordingSink {
    /// Number of outcomes delivered so far. Anything but 0 or 1 is a bug.
    pub fn deliveries(&self) -> usize {
        self.deliveries.load(Ordering::SeqCst)
    }

    fn record(&self, outcome: Outcome) {
        self.deliveries.fetch_add(1, Ordering::SeqCst);
        let _ = self.sender.send(outcome);
    }
}

impl CompletionSink for RecordingSink {
    fn on_success(
        &self,
        result: Payload,
        report: Option<ExecutionReport>,
        response_attachments: Option<ResponseAttachments>,
    ) {
        self.record(Outcome::Success {
            result,
            report,
            response_attachments,
        });
    }

    fn on_error(
        &self,
        error: ServiceError,
        report: Option<ExecutionReport>,
        request_attachments: Option<RequestAttachmentReader>,
        response_attachments: Option<ResponseAttachments>,
    ) {
        self.record(Outcome::Error {
            error,
            report,
            request_attachments,
            response_attachments,
        });
    }
}

/// Creates a recording sink and the receiver its outcomes arrive on.
pub fn recording_sink() -> (Arc<RecordingSink>, mpsc::UnboundedReceiver<Outcome>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        Arc::new(RecordingSink {
            sender,
            deliveries: AtomicUsize::new(0),
        }),
        receiver,
    )
}

// =============================================================================
// SCHEDULING ENGINE
// =============================================================================

/// An [`Engine`] that counts top-level runs.
///
/// # Example
/// ```ignore
/// let engine = Arc::new(MockEngine::new());
/// engine.expect_top_level_runs(0);
/// // invoke with an ambient plan...
/// engine.verify(); // panics if a top-level run was requested
/// ```
#[derive(Default)]
pub struct MockEngine {
    delegate: Option<TokioEngine>,
    runs: AtomicUsize,
    expected: Mutex<Option<usize>>,
}

impl MockEngine {
    /// An engine that records runs and drops the tasks unstarted.
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine that records runs and forwards them to `engine`.
    pub fn delegating(engine: TokioEngine) -> Self {
        Self {
            delegate: Some(engine),
            ..Self::default()
        }
    }

    pub fn expect_top_level_runs(&self, count: usize) {
        *self.expected.lock().unwrap_or_else(PoisonError::into_inner) = Some(count);
    }

    pub fn top_level_runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Verifies that the expected number of top-level runs happened.
    pub fn verify(&self) {
        let expected = *self.expected.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(expected) = expected {
            let actual = self.top_level_runs();
            if actual != expected {
                panic!("Expected {expected} top-level runs, got {actual}");
            }
        }
    }
}

impl Engine for MockEngine {
    fn run(&self, task: Task<()>) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        match &self.delegate {
            Some(engine) => engine.run(task),
            None => debug!(task = %task.name(), "Mock engine dropped task"),
        }
    }
}

// =============================================================================
// COLLABORATORS
// =============================================================================

/// Argument builder that hands out the same values on every call.
pub struct FixedArguments {
    values: Vec<Payload>,
}

impl FixedArguments {
    pub fn new(values: impl IntoIterator<Item = Payload>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    pub fn none() -> Self {
        Self { values: Vec::new() }
    }
}

impl ArgumentBuilder for FixedArguments {
    fn build(&self, _request: &RequestData, _routing: &RoutingResult) -> Result<Arguments, BoxError> {
        Ok(Arguments::values(self.values.iter().cloned()))
    }
}

/// Resource factory whose every `create` fails with the given message.
pub struct FailingFactory {
    message: String,
}

impl FailingFactory {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl ResourceFactory for FailingFactory {
    fn create(&self, _resource: &ResourceType) -> Result<Box<dyn Resource>, BoxError> {
        Err(self.message.clone().into())
    }
}
