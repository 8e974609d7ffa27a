//! # Completion Sinks & Execution Reports
//!
//! The completion sink is the only channel through which an invocation's outcome reaches
//! the caller. Exactly one of [`CompletionSink::on_success`] / [`CompletionSink::on_error`]
//! fires, exactly once, for every call to [`MethodInvoker::invoke`](crate::MethodInvoker::invoke).
//!
//! Internally each invocation owns one [`Completion`], which wraps the caller's sink and
//! enforces that guarantee no matter which thread, adapter or callback delivers first.

use crate::arguments::Payload;
use crate::context::{ExecutionContext, RequestAttachmentReader, ResponseAttachments};
use crate::engine::Trace;
use crate::error::{BoxError, FrameworkError, ServiceError};
use crate::normalize::ErrorNormalizer;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Receives the single outcome of an invocation. May be called from any thread.
pub trait CompletionSink: Send + Sync {
    fn on_success(
        &self,
        result: Payload,
        report: Option<ExecutionReport>,
        response_attachments: Option<ResponseAttachments>,
    );

    fn on_error(
        &self,
        error: ServiceError,
        report: Option<ExecutionReport>,
        request_attachments: Option<RequestAttachmentReader>,
        response_attachments: Option<ResponseAttachments>,
    );
}

/// Immutable diagnostic snapshot delivered with the outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionReport {
    pub trace: Option<Trace>,
}

/// Accumulates diagnostics for one request. Optional: when the caller passes no
/// builder, `None` is delivered wherever a report would go.
#[derive(Debug, Default)]
pub struct ExecutionReportBuilder {
    trace: Mutex<Option<Trace>>,
}

impl ExecutionReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_trace(&self, trace: Trace) {
        *self.trace.lock().unwrap_or_else(PoisonError::into_inner) = Some(trace);
    }

    pub fn build(&self) -> ExecutionReport {
        ExecutionReport {
            trace: self.trace.lock().unwrap_or_else(PoisonError::into_inner).clone(),
        }
    }
}

/// Everything a [`CompletionSink`] was given, as a value.
pub enum Outcome {
    Success {
        result: Payload,
        report: Option<ExecutionReport>,
        response_attachments: Option<ResponseAttachments>,
    },
    Error {
        error: ServiceError,
        report: Option<ExecutionReport>,
        request_attachments: Option<RequestAttachmentReader>,
        response_attachments: Option<ResponseAttachments>,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn result(&self) -> Option<&Payload> {
        match self {
            Outcome::Success { result, .. } => Some(result),
            Outcome::Error { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ServiceError> {
        match self {
            Outcome::Error { error, .. } => Some(error),
            Outcome::Success { .. } => None,
        }
    }

    pub fn report(&self) -> Option<&ExecutionReport> {
        match self {
            Outcome::Success { report, .. } | Outcome::Error { report, .. } => report.as_ref(),
        }
    }

    pub fn response_attachments(&self) -> Option<&ResponseAttachments> {
        match self {
            Outcome::Success {
                response_attachments,
                ..
            }
            | Outcome::Error {
                response_attachments,
                ..
            } => response_attachments.as_ref(),
        }
    }

    pub fn into_result(self) -> Result<Payload, ServiceError> {
        match self {
            Outcome::Success { result, .. } => Ok(result),
            Outcome::Error { error, .. } => Err(error),
        }
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success { report, .. } => f
                .debug_struct("Success")
                .field("report", report)
                .finish_non_exhaustive(),
            Outcome::Error { error, report, .. } => f
                .debug_struct("Error")
                .field("error", error)
                .field("report", report)
                .finish_non_exhaustive(),
        }
    }
}

/// [`CompletionSink`] that forwards the outcome over a oneshot channel.
pub struct OutcomeSender {
    sender: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl OutcomeSender {
    fn send(&self, outcome: Outcome) {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner).take();
        match sender {
            Some(sender) => {
                if sender.send(outcome).is_err() {
                    debug!("Outcome receiver dropped");
                }
            }
            None => warn!("Outcome already sent"),
        }
    }
}

impl CompletionSink for OutcomeSender {
    fn on_success(
        &self,
        result: Payload,
        report: Option<ExecutionReport>,
        response_attachments: Option<ResponseAttachments>,
    ) {
        self.send(Outcome::Success {
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
        self.send(Outcome::Error {
            error,
            report,
            request_attachments,
            response_attachments,
        });
    }
}

/// A sink plus the receiver its single outcome will arrive on.
pub fn outcome_channel() -> (Arc<OutcomeSender>, oneshot::Receiver<Outcome>) {
    let (tx, rx) = oneshot::channel();
    (
        Arc::new(OutcomeSender {
            sender: Mutex::new(Some(tx)),
        }),
        rx,
    )
}

/// Per-invocation guard around the caller's sink. The first outcome wins.
pub(crate) struct Completion {
    label: String,
    sink: Mutex<Option<Arc<dyn CompletionSink>>>,
    report: Option<Arc<ExecutionReportBuilder>>,
    request_attachments: Option<RequestAttachmentReader>,
    response_attachments: ResponseAttachments,
    normalizer: ErrorNormalizer,
    in_call: AtomicBool,
    abandoned: AtomicBool,
}

impl Completion {
    pub(crate) fn new(
        label: String,
        sink: Arc<dyn CompletionSink>,
        report: Option<Arc<ExecutionReportBuilder>>,
        context: &ExecutionContext,
        normalizer: ErrorNormalizer,
    ) -> Arc<Self> {
        Arc::new(Self {
            label,
            sink: Mutex::new(Some(sink)),
            report,
            request_attachments: context.request_attachments().cloned(),
            response_attachments: context.response_attachments().clone(),
            normalizer,
            in_call: AtomicBool::new(false),
            abandoned: AtomicBool::new(false),
        })
    }

    pub(crate) fn normalizer(&self) -> &ErrorNormalizer {
        &self.normalizer
    }

    /// Marks the start of the application call on the invoking thread. While it lasts, a
    /// callback dropped on that thread is left for the adapter to report.
    pub(crate) fn enter_call(&self) {
        self.in_call.store(true, Ordering::SeqCst);
    }

    /// Ends the application call; returns whether the callback was abandoned during it.
    pub(crate) fn leave_call(&self) -> bool {
        self.in_call.store(false, Ordering::SeqCst);
        self.abandoned.load(Ordering::SeqCst)
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    /// Copies `trace` into the report builder, if one was requested.
    pub(crate) fn attach_trace(&self, trace: Trace) {
        if let Some(builder) = &self.report {
            builder.set_trace(trace);
        }
    }

    pub(crate) fn finish(&self, outcome: Result<Payload, BoxError>) {
        match outcome {
            Ok(result) => self.succeed(result),
            Err(failure) => self.fail(failure),
        }
    }

    pub(crate) fn succeed(&self, result: Payload) {
        let Some(sink) = self.take_sink() else { return };
        debug!(method = %self.label, "Completed");
        sink.on_success(
            result,
            self.build_report(),
            Some(self.response_attachments.clone()),
        );
    }

    /// Normalizes `failure` and delivers it.
    pub(crate) fn fail(&self, failure: BoxError) {
        let error = self.normalizer.normalize(failure);
        self.deliver_error(error, Some(self.response_attachments.clone()));
    }

    /// Delivers an error for a method that never ran, so no response attachments exist.
    pub(crate) fn fail_unstarted(&self, error: ServiceError) {
        self.deliver_error(error, None);
    }

    fn deliver_error(&self, error: ServiceError, response_attachments: Option<ResponseAttachments>) {
        let Some(sink) = self.take_sink() else { return };
        debug!(method = %self.label, status = %error.status(), error = %error.message(), "Failed");
        sink.on_error(
            error,
            self.build_report(),
            self.request_attachments.clone(),
            response_attachments,
        );
    }

    fn take_sink(&self) -> Option<Arc<dyn CompletionSink>> {
        let sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner).take();
        if sink.is_none() {
            warn!(method = %self.label, "Outcome already delivered, dropping duplicate");
        }
        sink
    }

    fn build_report(&self) -> Option<ExecutionReport> {
        self.report.as_ref().map(|builder| builder.build())
    }
}

impl Drop for Completion {
    /// An engine may drop a scheduled unit without running it (for example after its
    /// runtime shut down). The sink still gets its one outcome.
    fn drop(&mut self) {
        let pending = self.sink.get_mut().unwrap_or_else(PoisonError::into_inner).is_some();
        if pending {
            warn!(method = %self.label, "Invocation dropped without an outcome");
            self.fail(Box::new(FrameworkError::Abandoned(self.label.clone())));
        }
    }
}

/// Single-use completion handle injected into callback-style resource methods.
///
/// `on_success` and `on_error` consume the callback, so it cannot be completed twice.
/// The callback may be moved to another thread and completed there. Dropping it without
/// completing delivers an internal error instead. When that happens inside the method
/// call itself, the error or panic the method ends with takes precedence.
pub struct Callback {
    completion: Option<Arc<Completion>>,
    origin: ThreadId,
}

impl Callback {
    pub(crate) fn new(completion: Arc<Completion>) -> Self {
        Self {
            completion: Some(completion),
            origin: thread::current().id(),
        }
    }

    pub fn on_success(mut self, result: Payload) {
        if let Some(completion) = self.completion.take() {
            completion.succeed(result);
        }
    }

    pub fn on_error(mut self, error: impl Into<BoxError>) {
        if let Some(completion) = self.completion.take() {
            completion.fail(error.into());
        }
    }
}

impl Drop for Callback {
    fn drop(&mut self) {
        let Some(completion) = self.completion.take() else {
            return;
        };
        if thread::current().id() == self.origin && completion.in_call.load(Ordering::SeqCst) {
            completion.abandoned.store(true, Ordering::SeqCst);
            return;
        }
        warn!(method = %completion.label(), "Callback dropped without completion");
        completion.fail(Box::new(FrameworkError::CallbackDropped(
            completion.label().to_string(),
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::payload;
    use crate::error::HttpStatus;
    use crate::mock::recording_sink;

    fn completion_for(sink: Arc<dyn CompletionSink>, report: Option<Arc<ExecutionReportBuilder>>) -> Arc<Completion> {
        Completion::new(
            "Test.method".into(),
            sink,
            report,
            &ExecutionContext::new(),
            ErrorNormalizer::default(),
        )
    }

    #[tokio::test]
    async fn first_outcome_wins() {
        let (sink, mut rx) = recording_sink();
        let completion = completion_for(sink.clone(), None);

        completion.succeed(payload("first"));
        completion.fail("second".into());

        let outcome = rx.recv().await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(sink.deliveries(), 1);
        assert!(outcome.report().is_none());
    }

    #[tokio::test]
    async fn unstarted_failures_carry_no_response_attachments() {
        let (sink, mut rx) = recording_sink();
        let completion = completion_for(sink, Some(Arc::new(ExecutionReportBuilder::new())));
        completion.fail_unstarted(ServiceError::internal("no engine"));

        let outcome = rx.recv().await.unwrap();
        assert!(outcome.response_attachments().is_none());
        assert!(outcome.report().is_some());
    }

    #[tokio::test]
    async fn dropped_callback_reports_an_internal_error() {
        let (sink, mut rx) = recording_sink();
        let callback = Callback::new(completion_for(sink, None));
        drop(callback);

        let outcome = rx.recv().await.unwrap();
        let error = outcome.error().unwrap();
        assert_eq!(error.status(), HttpStatus::INTERNAL_SERVER_ERROR);
        assert!(error.cause().is_some_and(|c| c.is::<FrameworkError>()));
    }

    #[tokio::test]
    async fn callbacks_dropped_mid_call_are_left_to_the_adapter() {
        let (sink, _rx) = recording_sink();
        let completion = completion_for(sink.clone(), None);
        completion.enter_call();
        drop(Callback::new(Arc::clone(&completion)));
        assert!(completion.leave_call());
        assert_eq!(sink.deliveries(), 0);
    }

    #[tokio::test]
    async fn dropped_completion_delivers_once() {
        let (sink, mut rx) = recording_sink();
        drop(completion_for(sink.clone(), None));

        let outcome = rx.recv().await.unwrap();
        let error = outcome.error().unwrap();
        assert_eq!(error.status(), HttpStatus::INTERNAL_SERVER_ERROR);
        assert!(error.cause().is_some_and(|c| c.is::<FrameworkError>()));

        let (sink, _rx) = recording_sink();
        let completion = completion_for(sink.clone(), None);
        completion.succeed(payload(1_u8));
        drop(completion);
        assert_eq!(sink.deliveries(), 1);
    }

    #[tokio::test]
    async fn callback_can_complete_from_another_thread() {
        let (sink, mut rx) = recording_sink();
        let callback = Callback::new(completion_for(sink, None));
        let value = payload(42_i32);
        let expected = Arc::clone(&value);

        std::thread::spawn(move || callback.on_success(value)).join().unwrap();

        let outcome = rx.recv().await.unwrap();
        assert!(Arc::ptr_eq(outcome.result().unwrap(), &expected));
    }
}
