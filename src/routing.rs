//! Routing results handed to the invoker.

use crate::context::ExecutionContext;
use crate::descriptor::ResourceMethodDescriptor;
use std::sync::Arc;

/// The resolved route for one inbound request: which method to call, and the
/// request's execution context.
#[derive(Debug, Clone)]
pub struct RoutingResult {
    descriptor: Arc<ResourceMethodDescriptor>,
    context: Arc<ExecutionContext>,
}

impl RoutingResult {
    pub fn new(descriptor: Arc<ResourceMethodDescriptor>, context: Arc<ExecutionContext>) -> Self {
        Self { descriptor, context }
    }

    pub fn descriptor(&self) -> &Arc<ResourceMethodDescriptor> {
        &self.descriptor
    }

    pub fn context(&self) -> &Arc<ExecutionContext> {
        &self.context
    }
}
