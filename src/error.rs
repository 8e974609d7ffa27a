//! # Invocation Errors
//!
//! Every failure that reaches a [`CompletionSink`](crate::CompletionSink) is a
//! [`ServiceError`]: a status code, a human-readable message and an optional cause.
//! The remaining types in this module describe the failures that can occur *before*
//! normalization (argument binding, descriptor validation, panics captured by the
//! framework) and are always folded into a `ServiceError` by the
//! [`ErrorNormalizer`](crate::ErrorNormalizer).

use std::fmt;

/// A raised failure of any kind. Application code reports errors through this type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An HTTP-like status code attached to every [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HttpStatus(u16);

impl HttpStatus {
    pub const BAD_REQUEST: HttpStatus = HttpStatus(400);
    pub const UNAUTHORIZED: HttpStatus = HttpStatus(401);
    pub const FORBIDDEN: HttpStatus = HttpStatus(403);
    pub const NOT_FOUND: HttpStatus = HttpStatus(404);
    pub const CONFLICT: HttpStatus = HttpStatus(409);
    pub const INTERNAL_SERVER_ERROR: HttpStatus = HttpStatus(500);
    pub const SERVICE_UNAVAILABLE: HttpStatus = HttpStatus(503);
    pub const GATEWAY_TIMEOUT: HttpStatus = HttpStatus(504);

    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    pub const fn code(&self) -> u16 {
        self.0
    }

    pub fn reason(&self) -> &'static str {
        match self.0 {
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            409 => "Conflict",
            500 => "Internal Server Error",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            _ => "Unknown Status",
        }
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.0)
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.reason())
    }
}

/// The single tagged error type delivered to completion sinks.
///
/// Once a failure has been tagged as a `ServiceError` it travels unchanged: the
/// normalizer never re-wraps it, so status and message chosen by application code
/// reach the caller as-is.
#[derive(Debug, thiserror::Error)]
#[error("{status}: {message}")]
pub struct ServiceError {
    status: HttpStatus,
    message: String,
    #[source]
    cause: Option<BoxError>,
}

impl ServiceError {
    pub fn new(status: HttpStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            cause: None,
        }
    }

    /// A 500 error with the given message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(HttpStatus::INTERNAL_SERVER_ERROR, message)
    }

    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn status(&self) -> HttpStatus {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    pub fn into_cause(self) -> Option<BoxError> {
        self.cause
    }
}

/// One level of wrapping around a failure raised while calling into a resource method.
///
/// The normalizer peels exactly one `InvocationError` off a failure before deciding
/// whether it is already a [`ServiceError`].
#[derive(Debug, thiserror::Error)]
#[error("invocation of `{method}` failed: {cause}")]
pub struct InvocationError {
    method: String,
    #[source]
    cause: BoxError,
}

impl InvocationError {
    pub fn new(method: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self {
            method: method.into(),
            cause: cause.into(),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.cause.as_ref()
    }

    pub fn into_cause(self) -> BoxError {
        self.cause
    }
}

/// Failures originating in the framework itself rather than in application code.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("panicked: {0}")]
    Panicked(String),
    #[error("resource instance is not a `{expected}`")]
    ResourceMismatch { expected: &'static str },
    #[error("completion callback of `{0}` was dropped without being invoked")]
    CallbackDropped(String),
    #[error("`{0}` was dropped before it produced an outcome")]
    Abandoned(String),
    #[error("no resource registered for `{0}`")]
    UnknownResource(&'static str),
    #[error(transparent)]
    Argument(#[from] ArgumentError),
}

impl FrameworkError {
    /// Converts a panic payload captured by `catch_unwind` into a `Panicked` error.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        FrameworkError::Panicked(message)
    }
}

/// Errors raised while reading or binding positional arguments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    #[error("argument {0} is missing")]
    Missing(usize),
    #[error("argument {index} is not a `{expected}`")]
    TypeMismatch { index: usize, expected: &'static str },
    #[error("argument {0} has already been taken")]
    AlreadyTaken(usize),
}

/// A resource method registration that does not match its declared interface type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("`{method}`: callback methods need exactly one callback parameter, found {found}")]
    CallbackSlotCount { method: &'static str, found: usize },
    #[error("`{method}`: at most one context parameter is allowed, found {found}")]
    ContextSlotCount { method: &'static str, found: usize },
    #[error("`{method}`: {interface} methods cannot declare a {role} parameter")]
    UnexpectedSlot {
        method: &'static str,
        interface: &'static str,
        role: &'static str,
    },
}
