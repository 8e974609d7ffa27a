//! # Resource Method Descriptors
//!
//! A descriptor is built once per route when the server starts, and never changes after
//! that. It records which resource type owns the method, how the method signals
//! completion (its [`InterfaceType`]), and which parameter positions the invoker must
//! fill in itself.
//!
//! The calling convention is fixed by the constructor used to register the method
//! (`sync`, `callback`, `promise` or `task`), and the parameter roles are validated
//! against it right there. A descriptor that exists is a descriptor the adapters can
//! run without further checks.

use crate::arguments::{Arguments, Payload};
use crate::engine::{Promise, Task};
use crate::error::{BoxError, DescriptorError};
use crate::resource::{downcast, Resource, ResourceType};
use std::fmt;
use std::sync::Arc;

/// How a resource method signals completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceType {
    /// Returns its result directly.
    Sync,
    /// Completes through an injected [`Callback`](crate::Callback).
    Callback,
    /// Returns a [`Promise`] resolved by the scheduling engine.
    Promise,
    /// Returns a [`Task`] run by the scheduling engine.
    Task,
}

impl InterfaceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterfaceType::Sync => "sync",
            InterfaceType::Callback => "callback",
            InterfaceType::Promise => "promise",
            InterfaceType::Task => "task",
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self, InterfaceType::Promise | InterfaceType::Task)
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of one positional parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamRole {
    /// Supplied by the argument builder.
    Regular,
    /// Receives the completion callback (callback methods only).
    CallbackSlot,
    /// Receives the plan context (promise and task methods only).
    ContextSlot,
}

pub type SyncFn = dyn Fn(&dyn Resource, Arguments) -> Result<Payload, BoxError> + Send + Sync;
pub type CallbackFn = dyn Fn(&dyn Resource, Arguments) -> Result<(), BoxError> + Send + Sync;
pub type PromiseFn =
    dyn Fn(&dyn Resource, Arguments) -> Result<Option<Promise<Payload>>, BoxError> + Send + Sync;
pub type TaskFn =
    dyn Fn(&dyn Resource, Arguments) -> Result<Option<Task<Payload>>, BoxError> + Send + Sync;

/// Callable handle on the target method, one variant per calling convention.
#[derive(Clone)]
pub enum MethodHandle {
    Sync(Arc<SyncFn>),
    Callback(Arc<CallbackFn>),
    Promise(Arc<PromiseFn>),
    Task(Arc<TaskFn>),
}

impl MethodHandle {
    pub fn interface_type(&self) -> InterfaceType {
        match self {
            MethodHandle::Sync(_) => InterfaceType::Sync,
            MethodHandle::Callback(_) => InterfaceType::Callback,
            MethodHandle::Promise(_) => InterfaceType::Promise,
            MethodHandle::Task(_) => InterfaceType::Task,
        }
    }
}

/// Immutable registration-time record of one resource method.
pub struct ResourceMethodDescriptor {
    resource: ResourceType,
    model: String,
    name: &'static str,
    handle: MethodHandle,
    params: Vec<ParamRole>,
    callback_index: Option<usize>,
    context_index: Option<usize>,
}

impl ResourceMethodDescriptor {
    /// Registers a method that returns its result directly.
    pub fn sync<R, F>(name: &'static str, params: Vec<ParamRole>, method: F) -> Result<Self, DescriptorError>
    where
        R: Resource,
        F: Fn(&R, Arguments) -> Result<Payload, BoxError> + Send + Sync + 'static,
    {
        let handle = MethodHandle::Sync(Arc::new(move |resource: &dyn Resource, args| {
            method(downcast::<R>(resource)?, args)
        }));
        Self::new(ResourceType::of::<R>(), name, params, handle)
    }

    /// Registers a method that completes through an injected callback.
    pub fn callback<R, F>(name: &'static str, params: Vec<ParamRole>, method: F) -> Result<Self, DescriptorError>
    where
        R: Resource,
        F: Fn(&R, Arguments) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let handle = MethodHandle::Callback(Arc::new(move |resource: &dyn Resource, args| {
            method(downcast::<R>(resource)?, args)
        }));
        Self::new(ResourceType::of::<R>(), name, params, handle)
    }

    /// Registers a method that returns a promise. `None` stands for a missing promise.
    pub fn promise<R, F>(name: &'static str, params: Vec<ParamRole>, method: F) -> Result<Self, DescriptorError>
    where
        R: Resource,
        F: Fn(&R, Arguments) -> Result<Option<Promise<Payload>>, BoxError> + Send + Sync + 'static,
    {
        let handle = MethodHandle::Promise(Arc::new(move |resource: &dyn Resource, args| {
            method(downcast::<R>(resource)?, args)
        }));
        Self::new(ResourceType::of::<R>(), name, params, handle)
    }

    /// Registers a method that returns a task. `None` stands for a missing task.
    pub fn task<R, F>(name: &'static str, params: Vec<ParamRole>, method: F) -> Result<Self, DescriptorError>
    where
        R: Resource,
        F: Fn(&R, Arguments) -> Result<Option<Task<Payload>>, BoxError> + Send + Sync + 'static,
    {
        let handle = MethodHandle::Task(Arc::new(move |resource: &dyn Resource, args| {
            method(downcast::<R>(resource)?, args)
        }));
        Self::new(ResourceType::of::<R>(), name, params, handle)
    }

    /// Builds a descriptor from an already type-erased handle, validating the
    /// parameter roles against the handle's calling convention.
    pub fn new(
        resource: ResourceType,
        name: &'static str,
        params: Vec<ParamRole>,
        handle: MethodHandle,
    ) -> Result<Self, DescriptorError> {
        let interface = handle.interface_type();
        let callback_slots: Vec<usize> = positions(&params, ParamRole::CallbackSlot);
        let context_slots: Vec<usize> = positions(&params, ParamRole::ContextSlot);

        match interface {
            InterfaceType::Callback => {
                if callback_slots.len() != 1 {
                    return Err(DescriptorError::CallbackSlotCount {
                        method: name,
                        found: callback_slots.len(),
                    });
                }
                if !context_slots.is_empty() {
                    return Err(unexpected(name, interface, "context"));
                }
            }
            InterfaceType::Promise | InterfaceType::Task => {
                if !callback_slots.is_empty() {
                    return Err(unexpected(name, interface, "callback"));
                }
                if context_slots.len() > 1 {
                    return Err(DescriptorError::ContextSlotCount {
                        method: name,
                        found: context_slots.len(),
                    });
                }
            }
            InterfaceType::Sync => {
                if !callback_slots.is_empty() {
                    return Err(unexpected(name, interface, "callback"));
                }
                if !context_slots.is_empty() {
                    return Err(unexpected(name, interface, "context"));
                }
            }
        }

        Ok(Self {
            resource,
            model: resource.name().to_string(),
            name,
            handle,
            params,
            callback_index: callback_slots.first().copied(),
            context_index: context_slots.first().copied(),
        })
    }

    /// Overrides the resource model name reported in diagnostics.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn handle(&self) -> &MethodHandle {
        &self.handle
    }

    pub fn interface_type(&self) -> InterfaceType {
        self.handle.interface_type()
    }

    pub fn params(&self) -> &[ParamRole] {
        &self.params
    }

    pub fn callback_index(&self) -> Option<usize> {
        self.callback_index
    }

    pub fn context_index(&self) -> Option<usize> {
        self.context_index
    }

    /// `Resource.method`, used in logs and task names.
    pub fn label(&self) -> String {
        format!("{}.{}", self.resource.name(), self.name)
    }
}

impl fmt::Debug for ResourceMethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceMethodDescriptor")
            .field("resource", &self.resource)
            .field("model", &self.model)
            .field("name", &self.name)
            .field("interface", &self.interface_type())
            .field("params", &self.params)
            .finish()
    }
}

fn positions(params: &[ParamRole], role: ParamRole) -> Vec<usize> {
    params
        .iter()
        .enumerate()
        .filter(|(_, r)| **r == role)
        .map(|(i, _)| i)
        .collect()
}

fn unexpected(method: &'static str, interface: InterfaceType, role: &'static str) -> DescriptorError {
    DescriptorError::UnexpectedSlot {
        method,
        interface: interface.as_str(),
        role,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::payload;
    use ParamRole::*;

    struct Widgets;
    impl Resource for Widgets {}

    #[test]
    fn callback_methods_need_exactly_one_callback_slot() {
        let none = ResourceMethodDescriptor::callback::<Widgets, _>("get", vec![Regular], |_, _| Ok(()));
        assert_eq!(
            none.unwrap_err(),
            DescriptorError::CallbackSlotCount { method: "get", found: 0 }
        );

        let two = ResourceMethodDescriptor::callback::<Widgets, _>("get", vec![CallbackSlot, CallbackSlot], |_, _| Ok(()));
        assert!(matches!(two, Err(DescriptorError::CallbackSlotCount { found: 2, .. })));

        let ok = ResourceMethodDescriptor::callback::<Widgets, _>("get", vec![Regular, CallbackSlot], |_, _| Ok(()))
            .unwrap();
        assert_eq!(ok.callback_index(), Some(1));
        assert_eq!(ok.interface_type(), InterfaceType::Callback);
    }

    #[test]
    fn async_methods_allow_at_most_one_context_slot() {
        let ok = ResourceMethodDescriptor::promise::<Widgets, _>("get", vec![ContextSlot, Regular], |_, _| Ok(None))
            .unwrap();
        assert_eq!(ok.context_index(), Some(0));

        let two = ResourceMethodDescriptor::task::<Widgets, _>("get", vec![ContextSlot, ContextSlot], |_, _| Ok(None));
        assert!(matches!(two, Err(DescriptorError::ContextSlotCount { found: 2, .. })));

        let mixed = ResourceMethodDescriptor::task::<Widgets, _>("get", vec![CallbackSlot], |_, _| Ok(None));
        assert!(matches!(mixed, Err(DescriptorError::UnexpectedSlot { role: "callback", .. })));
    }

    #[test]
    fn sync_methods_reject_slots() {
        let err = ResourceMethodDescriptor::sync::<Widgets, _>("get", vec![ContextSlot], |_, _| Ok(payload(1)))
            .unwrap_err();
        assert_eq!(err.to_string(), "`get`: sync methods cannot declare a context parameter");
    }

    #[test]
    fn label_and_model_default_to_resource_type() {
        let d = ResourceMethodDescriptor::sync::<Widgets, _>("list", vec![], |_, _| Ok(payload(())))
            .unwrap()
            .with_model("widgets");
        assert_eq!(d.label(), "Widgets.list");
        assert_eq!(d.model(), "widgets");
    }
}
