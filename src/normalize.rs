//! # Error Normalizer
//!
//! Collapses any raised failure into a [`ServiceError`]. The same mapping is applied on
//! every adapter's error path and on setup failures:
//!
//! 1. An [`InvocationError`] is unwrapped exactly one level.
//! 2. A `ServiceError` is returned unchanged.
//! 3. Anything else becomes an internal error carrying the original as its cause.

use crate::config::InvokerConfig;
use crate::error::{BoxError, InvocationError, ServiceError};
use std::sync::Arc;

/// Maps raised failures onto [`ServiceError`]s. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ErrorNormalizer {
    internal_message: Arc<str>,
}

impl ErrorNormalizer {
    pub fn new(internal_message: impl Into<Arc<str>>) -> Self {
        Self {
            internal_message: internal_message.into(),
        }
    }

    pub fn from_config(config: &InvokerConfig) -> Self {
        Self::new(config.internal_error_message.as_str())
    }

    /// The message given to failures that were not already tagged.
    pub fn internal_message(&self) -> &str {
        &self.internal_message
    }

    /// Error for an async method that returned nothing to schedule, e.g. `"Task"`.
    pub fn null_result(&self, kind: &str) -> ServiceError {
        ServiceError::internal(format!("{}: null {kind}", self.internal_message))
    }

    pub fn normalize(&self, failure: BoxError) -> ServiceError {
        let failure = match failure.downcast::<InvocationError>() {
            Ok(wrapper) => wrapper.into_cause(),
            Err(other) => other,
        };
        match failure.downcast::<ServiceError>() {
            Ok(tagged) => *tagged,
            Err(other) => ServiceError::internal(self.internal_message.as_ref()).with_cause(other),
        }
    }
}

impl Default for ErrorNormalizer {
    fn default() -> Self {
        Self::from_config(&InvokerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FrameworkError, HttpStatus};

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct RuntimeFailure;

    #[test]
    fn untagged_failures_become_internal_errors() {
        let normalizer = ErrorNormalizer::default();
        let err = normalizer.normalize(Box::new(RuntimeFailure));
        assert_eq!(err.status(), HttpStatus::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Error in application code");
        assert!(err.cause().is_some_and(|c| c.is::<RuntimeFailure>()));
    }

    #[test]
    fn tagged_failures_pass_through() {
        let normalizer = ErrorNormalizer::default();
        let err = normalizer.normalize(Box::new(ServiceError::new(HttpStatus::NOT_FOUND, "no such greeting")));
        assert_eq!(err.status(), HttpStatus::NOT_FOUND);
        assert_eq!(err.message(), "no such greeting");
        assert!(err.cause().is_none());
    }

    #[test]
    fn invocation_wrappers_are_unwrapped_once() {
        let normalizer = ErrorNormalizer::new("custom internal");
        let tagged = InvocationError::new("get", ServiceError::new(HttpStatus::CONFLICT, "stale"));
        let err = normalizer.normalize(Box::new(tagged));
        assert_eq!(err.status(), HttpStatus::CONFLICT);
        assert_eq!(err.message(), "stale");

        let panicked = InvocationError::new("get", FrameworkError::Panicked("oops".into()));
        let err = normalizer.normalize(Box::new(panicked));
        assert_eq!(err.message(), "custom internal");
        assert!(err.cause().is_some_and(|c| c.is::<FrameworkError>()));
    }

    #[test]
    fn null_results_name_what_was_missing() {
        let normalizer = ErrorNormalizer::default();
        assert_eq!(
            normalizer.null_result("Promise").message(),
            "Error in application code: null Promise"
        );
        assert_eq!(normalizer.null_result("Task").status(), HttpStatus::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn only_one_level_is_unwrapped() {
        let normalizer = ErrorNormalizer::default();
        let inner = InvocationError::new("inner", ServiceError::new(HttpStatus::BAD_REQUEST, "bad"));
        let outer = InvocationError::new("outer", inner);
        let err = normalizer.normalize(Box::new(outer));
        assert_eq!(err.status(), HttpStatus::INTERNAL_SERVER_ERROR);
        assert!(err.cause().is_some_and(|c| c.is::<InvocationError>()));
    }
}
