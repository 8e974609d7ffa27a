//! # Observability & Tracing
//!
//! The invoker logs through the `tracing` crate. Install a subscriber once per process
//! with [`setup_tracing`]; tests use [`try_setup_tracing`], which tolerates a subscriber
//! that is already installed.
//!
//! ## What Gets Traced
//!
//! - **Invocations**: every call runs inside an `invoke` span carrying `resource`, `method`
//!   and `interface`.
//! - **Async units**: PROMISE and TASK units run inside a `task` span carrying the plan id.
//! - **Scheduling**: whether a unit joined the ambient plan or started a new one (`debug`).
//! - **Failures**: setup failures, missing engines, panics, duplicate completions and
//!   abandoned callbacks (`warn`); every delivered outcome (`debug`).
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run -p invoker-sample
//! RUST_LOG=resource_invoker=debug cargo run -p invoker-sample
//! ```
//!
//! With `RUST_LOG=debug` a single promise invocation reads:
//!
//! ```text
//! DEBUG invoke: Dispatching resource=Greetings method="lookup" interface=promise ambient_plan=None
//! DEBUG invoke: Starting new plan method=Greetings.lookup
//! DEBUG task: Completed plan=1 task=Greetings.lookup (invoke) method=Greetings.lookup
//! ```

use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// Panics if a global subscriber is already set.
pub fn setup_tracing() {
    subscriber().init();
}

/// Like [`setup_tracing`], but returns `false` instead of panicking when a subscriber is
/// already installed.
pub fn try_setup_tracing() -> bool {
    subscriber().try_init().is_ok()
}

fn subscriber() -> impl SubscriberInitExt {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_refused() {
        try_setup_tracing();
        assert!(!try_setup_tracing());
    }
}
