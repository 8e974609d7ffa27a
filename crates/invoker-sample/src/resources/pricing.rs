use crate::catalog::Catalog;
use crate::model::{ProductId, Quote};
use futures_util::FutureExt;
use resource_invoker::{payload, Arguments, BoxError, Payload, Promise, Resource, ServiceError, Task};
use tracing::debug;

/// `pricing.*` routes.
pub struct PricingResource {
    catalog: Catalog,
}

impl Resource for PricingResource {}

impl PricingResource {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Promise: `(plan, id, quantity) -> Quote`.
    ///
    /// The product lookup runs as a child task of the plan, so it shows up in the trace.
    pub fn quote(&self, args: Arguments) -> Result<Option<Promise<Payload>>, BoxError> {
        let plan = args.context(0)?;
        let id = args.get::<ProductId>(1)?;
        let quantity = *args.get::<u32>(2)?;
        let catalog = self.catalog.clone();

        Ok(Some(
            async move {
                debug!(plan = plan.id(), product_id = %id, quantity, "Quoting");
                let lookup = Task::new("load product", move |_| async move {
                    catalog.get(&id).map_err(|e| BoxError::from(ServiceError::from(e)))
                });
                let product = plan.execute(lookup).await?;
                Ok::<_, BoxError>(payload(Quote::for_product(&product, quantity)))
            }
            .boxed(),
        ))
    }
}
