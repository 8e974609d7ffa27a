//! # Scheduling Engine
//!
//! The asynchronous scheduler the PROMISE and TASK adapters hand their units to.
//!
//! A **plan** groups every task started on behalf of one logical request. The first task
//! of a plan is started by [`Engine::run`]; anything started afterwards through the
//! plan's [`PlanContext`] joins the same plan and shows up in the same [`Trace`].
//!
//! [`TokioEngine`] is the production implementation. Tests substitute their own
//! `Engine` (see [`crate::mock::MockEngine`]) to observe scheduling decisions.

mod task;
mod trace;

pub use task::{Promise, Task};
pub use trace::{TaskStatus, Trace, TraceEntry};

use crate::error::{BoxError, FrameworkError, InvocationError};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::runtime::{Handle, TryCurrentError};
use tracing::{debug, info_span, Instrument};

/// Starts new top-level plans.
pub trait Engine: Send + Sync {
    /// Runs `task` as the root of a brand new plan.
    fn run(&self, task: Task<()>);
}

struct Plan {
    id: u64,
    name: String,
    runtime: Handle,
    entries: Mutex<Vec<TraceEntry>>,
}

/// Handle on a running plan: the ambient scheduling context.
///
/// Cloning is cheap; all clones refer to the same plan and trace.
#[derive(Clone)]
pub struct PlanContext {
    plan: Arc<Plan>,
}

impl PlanContext {
    pub(crate) fn new(id: u64, name: impl Into<String>, runtime: Handle) -> Self {
        Self {
            plan: Arc::new(Plan {
                id,
                name: name.into(),
                runtime,
                entries: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.plan.id
    }

    pub fn name(&self) -> &str {
        &self.plan.name
    }

    /// Attaches `task` to this plan as a child and returns immediately.
    pub fn run(&self, task: Task<()>) {
        let ctx = self.clone();
        self.plan.runtime.spawn(async move {
            let name = task.name().to_string();
            if let Err(e) = ctx.execute(task).await {
                debug!(plan = ctx.id(), task = %name, error = %e, "Child task failed");
            }
        });
    }

    /// Runs `task` inside this plan and waits for it, recording a trace entry.
    ///
    /// A panic in the task body is captured and returned as an [`InvocationError`].
    pub async fn execute<T: Send + 'static>(&self, task: Task<T>) -> Result<T, BoxError> {
        let (name, body) = task.into_parts();
        let span = info_span!("task", plan = self.id(), task = %name);
        let started = Instant::now();

        let ctx = self.clone();
        let run = async move { body(ctx).await };
        let result = match AssertUnwindSafe(run).catch_unwind().instrument(span).await {
            Ok(result) => result,
            Err(payload) => Err(Box::new(InvocationError::new(
                name.clone(),
                FrameworkError::from_panic(payload),
            )) as BoxError),
        };

        let status = if result.is_ok() {
            TaskStatus::Succeeded
        } else {
            TaskStatus::Failed
        };
        self.record(TraceEntry {
            task: name,
            status,
            elapsed: started.elapsed(),
        });
        result
    }

    /// Snapshot of the plan's trace so far.
    pub fn trace(&self) -> Trace {
        let entries = self
            .plan
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Trace {
            plan_id: self.plan.id,
            plan_name: self.plan.name.clone(),
            entries,
        }
    }

    fn record(&self, entry: TraceEntry) {
        self.plan
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}

impl std::fmt::Debug for PlanContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanContext")
            .field("id", &self.plan.id)
            .field("name", &self.plan.name)
            .finish()
    }
}

/// [`Engine`] backed by a Tokio runtime.
pub struct TokioEngine {
    runtime: Handle,
    next_plan: AtomicU64,
}

impl TokioEngine {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            next_plan: AtomicU64::new(1),
        }
    }

    /// Engine on the runtime the caller is running in.
    pub fn current() -> Result<Self, TryCurrentError> {
        Handle::try_current().map(Self::new)
    }

    /// Allocates a fresh plan without running anything in it.
    pub fn plan(&self, name: impl Into<String>) -> PlanContext {
        let id = self.next_plan.fetch_add(1, Ordering::SeqCst);
        PlanContext::new(id, name, self.runtime.clone())
    }
}

impl Engine for TokioEngine {
    fn run(&self, task: Task<()>) {
        let plan = self.plan(task.name());
        debug!(plan = plan.id(), task = %task.name(), "Starting plan");
        plan.run(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn execute_records_trace_entries() {
        let engine = TokioEngine::current().unwrap();
        let plan = engine.plan("lookup");

        let value = plan.execute(Task::value("fetch", 7_u32)).await.unwrap();
        assert_eq!(value, 7);
        let failed = plan.execute(Task::<u32>::failure("explode", "nope")).await;
        assert!(failed.is_err());

        let trace = plan.trace();
        assert_eq!(trace.plan_name, "lookup");
        assert_eq!(trace.status_of("fetch"), Some(TaskStatus::Succeeded));
        assert_eq!(trace.status_of("explode"), Some(TaskStatus::Failed));
    }

    #[tokio::test]
    async fn panics_are_captured_as_invocation_errors() {
        let engine = TokioEngine::current().unwrap();
        let plan = engine.plan("panicky");
        let result = plan
            .execute(Task::<()>::new("bad", |_| async {
                if true {
                    panic!("kaboom");
                }
                Ok(())
            }))
            .await;
        let err = result.unwrap_err();
        let wrapper = err.downcast_ref::<InvocationError>().unwrap();
        assert_eq!(wrapper.method(), "bad");
        assert_eq!(wrapper.cause().to_string(), "panicked: kaboom");
    }

    #[tokio::test]
    async fn children_share_the_parent_plan() {
        let engine = TokioEngine::current().unwrap();
        let (tx, rx) = oneshot::channel();
        engine.run(Task::new("root", move |ctx: PlanContext| async move {
            let root_id = ctx.id();
            let child_ctx = ctx.clone();
            ctx.run(Task::new("child", move |child: PlanContext| async move {
                let _ = tx.send((root_id, child.id(), child_ctx.id()));
                Ok(())
            }));
            Ok(())
        }));
        let (root, child, captured) = rx.await.unwrap();
        assert_eq!(root, child);
        assert_eq!(root, captured);
    }

    #[tokio::test]
    async fn each_top_level_run_gets_its_own_plan() {
        let engine = TokioEngine::current().unwrap();
        let first = engine.plan("a");
        let second = engine.plan("b");
        assert_ne!(first.id(), second.id());
    }
}
