use crate::catalog::Catalog;
use crate::model::ProductId;
use resource_invoker::{payload, Arguments, BoxError, Payload, Resource, ServiceError};

/// `products.*` routes.
pub struct ProductResource {
    catalog: Catalog,
}

impl Resource for ProductResource {}

impl ProductResource {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Sync: `(id) -> Product`.
    pub fn get(&self, args: Arguments) -> Result<Payload, BoxError> {
        let id = args.get::<ProductId>(0)?;
        let product = self.catalog.get(&id).map_err(ServiceError::from)?;
        Ok(payload(product))
    }

    /// Callback: `(id, quantity, callback)`, completed with the remaining stock.
    ///
    /// The reservation is handed to a worker thread, so the callback fires after this
    /// method has already returned.
    pub fn reserve(&self, mut args: Arguments) -> Result<(), BoxError> {
        let id = args.get::<ProductId>(0)?;
        let quantity = *args.get::<u32>(1)?;
        let callback = args.take_callback(2)?;
        let catalog = self.catalog.clone();
        std::thread::spawn(move || match catalog.reserve(&id, quantity) {
            Ok(remaining) => callback.on_success(payload(remaining)),
            Err(e) => callback.on_error(ServiceError::from(e)),
        });
        Ok(())
    }
}
