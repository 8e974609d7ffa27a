//! # Method Arguments
//!
//! Positional arguments handed to a resource method. Regular parameters carry shared
//! values; the callback and context slots are left [`Argument::Unbound`] by the
//! [`ArgumentBuilder`] and filled in by the adapter at invocation time.

use crate::completion::Callback;
use crate::engine::PlanContext;
use crate::error::{ArgumentError, BoxError};
use crate::routing::RoutingResult;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A type-erased value shared between the invoker, application code and the completion
/// sink. Results are delivered as the very same `Arc` the method returned.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Wraps `value` into a [`Payload`].
pub fn payload<T: Any + Send + Sync>(value: T) -> Payload {
    Arc::new(value)
}

/// Data extracted from the inbound request by the protocol layer.
#[derive(Debug, Clone, Default)]
pub struct RequestData {
    pub path_keys: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub entity: Option<Value>,
}

impl RequestData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path_key(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_keys.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_entity(mut self, entity: Value) -> Self {
        self.entity = Some(entity);
        self
    }
}

/// One positional argument.
pub enum Argument {
    Value(Payload),
    Callback(Callback),
    Context(PlanContext),
    Unbound,
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Value(_) => f.write_str("Value(..)"),
            Argument::Callback(_) => f.write_str("Callback(..)"),
            Argument::Context(ctx) => write!(f, "Context(plan {})", ctx.id()),
            Argument::Unbound => f.write_str("Unbound"),
        }
    }
}

/// Ordered argument list for one invocation.
#[derive(Debug, Default)]
pub struct Arguments {
    slots: Vec<Argument>,
}

impl Arguments {
    pub fn new(slots: Vec<Argument>) -> Self {
        Self { slots }
    }

    /// Builds an argument list made only of regular values.
    pub fn values(values: impl IntoIterator<Item = Payload>) -> Self {
        Self::new(values.into_iter().map(Argument::Value).collect())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Places `argument` at `index`, padding with [`Argument::Unbound`] as needed.
    pub fn bind(&mut self, index: usize, argument: Argument) {
        if self.slots.len() <= index {
            self.slots.resize_with(index + 1, || Argument::Unbound);
        }
        self.slots[index] = argument;
    }

    /// Shared handle on the regular value at `index`, downcast to `T`.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, ArgumentError> {
        match self.slots.get(index) {
            Some(Argument::Value(value)) => Arc::clone(value).downcast::<T>().map_err(|_| {
                ArgumentError::TypeMismatch {
                    index,
                    expected: std::any::type_name::<T>(),
                }
            }),
            Some(Argument::Unbound) | None => Err(ArgumentError::Missing(index)),
            Some(_) => Err(ArgumentError::TypeMismatch {
                index,
                expected: std::any::type_name::<T>(),
            }),
        }
    }

    /// The raw payload at `index`, without downcasting.
    pub fn payload(&self, index: usize) -> Result<Payload, ArgumentError> {
        match self.slots.get(index) {
            Some(Argument::Value(value)) => Ok(Arc::clone(value)),
            Some(Argument::Unbound) | None => Err(ArgumentError::Missing(index)),
            Some(_) => Err(ArgumentError::TypeMismatch {
                index,
                expected: "Payload",
            }),
        }
    }

    /// Moves the completion callback out of `index`.
    pub fn take_callback(&mut self, index: usize) -> Result<Callback, ArgumentError> {
        let Some(slot) = self.slots.get_mut(index) else {
            return Err(ArgumentError::Missing(index));
        };
        match std::mem::replace(slot, Argument::Unbound) {
            Argument::Callback(callback) => Ok(callback),
            Argument::Unbound => Err(ArgumentError::AlreadyTaken(index)),
            other => {
                *slot = other;
                Err(ArgumentError::TypeMismatch {
                    index,
                    expected: "Callback",
                })
            }
        }
    }

    /// The plan context bound at `index`.
    pub fn context(&self, index: usize) -> Result<PlanContext, ArgumentError> {
        match self.slots.get(index) {
            Some(Argument::Context(ctx)) => Ok(ctx.clone()),
            Some(Argument::Unbound) | None => Err(ArgumentError::Missing(index)),
            Some(_) => Err(ArgumentError::TypeMismatch {
                index,
                expected: "PlanContext",
            }),
        }
    }
}

/// Builds method arguments from request data.
pub trait ArgumentBuilder: Send + Sync {
    fn build(&self, request: &RequestData, routing: &RoutingResult) -> Result<Arguments, BoxError>;
}

impl<F> ArgumentBuilder for F
where
    F: Fn(&RequestData, &RoutingResult) -> Result<Arguments, BoxError> + Send + Sync,
{
    fn build(&self, request: &RequestData, routing: &RoutingResult) -> Result<Arguments, BoxError> {
        self(request, routing)
    }
}
