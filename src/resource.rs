//! # Resources & Resource Factories
//!
//! A resource is the application object whose methods the invoker calls. Resources are
//! created per request by a [`ResourceFactory`], optionally receive the request's
//! [`ExecutionContext`], and are then shared with the adapter that runs the method.

use crate::context::ExecutionContext;
use crate::error::{BoxError, FrameworkError};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Blanket upcast to `&dyn Any`, so resources can be downcast to their concrete type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Capability of resources that want the request's execution context injected.
pub trait ContextAware {
    fn set_context(&mut self, context: Arc<ExecutionContext>);
}

/// An application resource.
///
/// The only requirement is being `Send + Sync + 'static`; resources that want the
/// execution context override [`Resource::context_aware`].
pub trait Resource: AsAny + Send + Sync + 'static {
    fn context_aware(&mut self) -> Option<&mut dyn ContextAware> {
        None
    }
}

/// Identity of a resource type, captured at registration time.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceType {
    id: TypeId,
    name: &'static str,
}

impl ResourceType {
    pub fn of<R: Resource>() -> Self {
        // Keep the last path segment, e.g. "GreetingResource"
        let full = std::any::type_name::<R>();
        let name = full.rsplit("::").next().unwrap_or(full);
        Self {
            id: TypeId::of::<R>(),
            name,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Creates resource instances on demand.
pub trait ResourceFactory: Send + Sync {
    fn create(&self, resource: &ResourceType) -> Result<Box<dyn Resource>, BoxError>;
}

type Constructor = Box<dyn Fn() -> Result<Box<dyn Resource>, BoxError> + Send + Sync>;

/// [`ResourceFactory`] keyed by resource type.
#[derive(Default)]
pub struct ResourceRegistry {
    constructors: HashMap<TypeId, Constructor>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an infallible constructor for `R`.
    pub fn register<R, F>(mut self, constructor: F) -> Self
    where
        R: Resource,
        F: Fn() -> R + Send + Sync + 'static,
    {
        self.constructors.insert(
            TypeId::of::<R>(),
            Box::new(move || Ok(Box::new(constructor()) as Box<dyn Resource>)),
        );
        self
    }

    /// Registers a constructor for `R` that may fail.
    pub fn register_fallible<R, F>(mut self, constructor: F) -> Self
    where
        R: Resource,
        F: Fn() -> Result<R, BoxError> + Send + Sync + 'static,
    {
        self.constructors.insert(
            TypeId::of::<R>(),
            Box::new(move || constructor().map(|r| Box::new(r) as Box<dyn Resource>)),
        );
        self
    }
}

impl ResourceFactory for ResourceRegistry {
    fn create(&self, resource: &ResourceType) -> Result<Box<dyn Resource>, BoxError> {
        match self.constructors.get(&resource.id()) {
            Some(constructor) => constructor(),
            None => Err(Box::new(FrameworkError::UnknownResource(resource.name()))),
        }
    }
}

/// Downcasts a shared resource to its concrete type.
pub(crate) fn downcast<R: Resource>(resource: &dyn Resource) -> Result<&R, FrameworkError> {
    resource
        .as_any()
        .downcast_ref::<R>()
        .ok_or(FrameworkError::ResourceMismatch {
            expected: std::any::type_name::<R>(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;
    impl Resource for Plain {}

    #[derive(Default)]
    struct Aware {
        context: Option<Arc<ExecutionContext>>,
    }
    impl ContextAware for Aware {
        fn set_context(&mut self, context: Arc<ExecutionContext>) {
            self.context = Some(context);
        }
    }
    impl Resource for Aware {
        fn context_aware(&mut self) -> Option<&mut dyn ContextAware> {
            Some(self)
        }
    }

    #[test]
    fn resource_type_uses_short_name() {
        assert_eq!(ResourceType::of::<Plain>().name(), "Plain");
        assert_ne!(ResourceType::of::<Plain>(), ResourceType::of::<Aware>());
    }

    #[test]
    fn registry_creates_registered_types() {
        let registry = ResourceRegistry::new().register(|| Plain);
        let created = registry.create(&ResourceType::of::<Plain>()).unwrap();
        assert!(downcast::<Plain>(created.as_ref()).is_ok());
        assert!(downcast::<Aware>(created.as_ref()).is_err());
    }

    #[test]
    fn registry_rejects_unknown_types() {
        let registry = ResourceRegistry::new();
        let err = registry.create(&ResourceType::of::<Aware>()).err().unwrap();
        assert_eq!(err.to_string(), "no resource registered for `Aware`");
    }

    #[test]
    fn context_capability_is_optional() {
        let mut plain: Box<dyn Resource> = Box::new(Plain);
        assert!(plain.context_aware().is_none());

        let mut aware: Box<dyn Resource> = Box::new(Aware::default());
        aware
            .context_aware()
            .unwrap()
            .set_context(Arc::new(ExecutionContext::new()));
        let aware = downcast::<Aware>(aware.as_ref()).unwrap();
        assert!(aware.context.is_some());
    }
}
