use crate::catalog::{Catalog, CatalogError};
use crate::model::{Order, OrderCreate, Quote};
use resource_invoker::{
    payload, Arguments, Attachment, BoxError, ContextAware, ExecutionContext, Payload, PlanContext, Resource,
    ServiceError, Task,
};
use std::sync::Arc;
use tracing::info;

/// `orders.*` routes. Wants the execution context to stream a receipt back.
pub struct OrderResource {
    catalog: Catalog,
    context: Option<Arc<ExecutionContext>>,
}

impl OrderResource {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            context: None,
        }
    }

    /// Task: `(OrderCreate) -> Order`.
    ///
    /// Validation happens before any task is built; pricing and the stock reservation run
    /// as child tasks of the order's plan.
    pub fn place(&self, args: Arguments) -> Result<Option<Task<Payload>>, BoxError> {
        let params = args.get::<OrderCreate>(0)?;
        if params.quantity == 0 {
            return Err(ServiceError::from(CatalogError::InvalidQuantity(0)).into());
        }
        let catalog = self.catalog.clone();
        let context = self.context.clone();

        Ok(Some(Task::new("place order", move |plan: PlanContext| async move {
            let pricing_catalog = catalog.clone();
            let pricing_params = Arc::clone(&params);
            let quote = plan
                .execute(Task::new("price", move |_| async move {
                    let product = pricing_catalog
                        .get(&pricing_params.product_id)
                        .map_err(ServiceError::from)?;
                    Ok::<_, BoxError>(Quote::for_product(&product, pricing_params.quantity))
                }))
                .await?;

            let reserve_catalog = catalog.clone();
            let reserve_params = Arc::clone(&params);
            plan.execute(Task::new("reserve stock", move |_| async move {
                reserve_catalog
                    .reserve(&reserve_params.product_id, reserve_params.quantity)
                    .map_err(|e| BoxError::from(ServiceError::from(e)))
            }))
            .await?;

            let order = Order {
                id: catalog.next_order_id(),
                product_id: params.product_id.clone(),
                quantity: params.quantity,
                total: quote.total,
            };
            if let Some(context) = context {
                let receipt = serde_json::to_vec(&order)?;
                context
                    .response_attachments()
                    .append(Attachment::new(format!("receipt-{}", order.id), receipt));
            }
            info!(order_id = %order.id, total = order.total, "Created");
            Ok::<_, BoxError>(payload(order))
        })))
    }
}

impl ContextAware for OrderResource {
    fn set_context(&mut self, context: Arc<ExecutionContext>) {
        self.context = Some(context);
    }
}

impl Resource for OrderResource {
    fn context_aware(&mut self) -> Option<&mut dyn ContextAware> {
        Some(self)
    }
}
