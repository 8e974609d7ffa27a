//! # Catalog
//!
//! In-memory product inventory shared by every resource instance. Resources are created
//! per request; the catalog is the state that outlives them.

use crate::model::{OrderId, Product, ProductCreate, ProductId};
use resource_invoker::{HttpStatus, ServiceError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during catalog operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    /// The requested product was not found.
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    /// The requested quantity exceeds the available stock.
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },

    /// The provided quantity is invalid (e.g., zero).
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),
}

impl From<CatalogError> for ServiceError {
    fn from(error: CatalogError) -> Self {
        let status = match &error {
            CatalogError::NotFound(_) => HttpStatus::NOT_FOUND,
            CatalogError::InsufficientStock { .. } => HttpStatus::CONFLICT,
            CatalogError::InvalidQuantity(_) => HttpStatus::BAD_REQUEST,
        };
        ServiceError::new(status, error.to_string()).with_cause(error)
    }
}

#[derive(Default)]
struct Inventory {
    products: HashMap<ProductId, Product>,
    next_product: u32,
    next_order: u32,
}

#[derive(Clone, Default)]
pub struct Catalog {
    inner: Arc<Mutex<Inventory>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, params: ProductCreate) -> ProductId {
        let mut inventory = self.lock();
        inventory.next_product += 1;
        let id = ProductId(inventory.next_product);
        let product = Product::new(id.clone(), params.name, params.price, params.quantity);
        inventory.products.insert(id.clone(), product);
        info!(product_id = %id, size = inventory.products.len(), "Created");
        id
    }

    pub fn get(&self, id: &ProductId) -> Result<Product, CatalogError> {
        debug!(product_id = %id, "Get");
        self.lock()
            .products
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }

    /// Takes `quantity` units out of stock; returns what is left.
    pub fn reserve(&self, id: &ProductId, quantity: u32) -> Result<u32, CatalogError> {
        if quantity == 0 {
            return Err(CatalogError::InvalidQuantity(quantity));
        }
        let mut inventory = self.lock();
        let product = inventory
            .products
            .get_mut(id)
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;
        if product.quantity < quantity {
            return Err(CatalogError::InsufficientStock {
                requested: quantity,
                available: product.quantity,
            });
        }
        product.quantity -= quantity;
        info!(product_id = %id, reserved = quantity, remaining = product.quantity, "Stock reserved");
        Ok(product.quantity)
    }

    pub fn next_order_id(&self) -> OrderId {
        let mut inventory = self.lock();
        inventory.next_order += 1;
        OrderId(inventory.next_order)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inventory> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(quantity: u32) -> ProductCreate {
        ProductCreate {
            name: "Widget".into(),
            price: 2.5,
            quantity,
        }
    }

    #[test]
    fn reserve_decrements_stock() {
        let catalog = Catalog::new();
        let id = catalog.add(widget(5));
        assert_eq!(catalog.reserve(&id, 3), Ok(2));
        assert_eq!(
            catalog.reserve(&id, 3),
            Err(CatalogError::InsufficientStock {
                requested: 3,
                available: 2
            })
        );
        assert_eq!(catalog.reserve(&id, 0), Err(CatalogError::InvalidQuantity(0)));
    }

    #[test]
    fn errors_map_to_statuses() {
        let not_found = ServiceError::from(CatalogError::NotFound(ProductId(9)));
        assert_eq!(not_found.status(), HttpStatus::NOT_FOUND);
        assert_eq!(not_found.message(), "Product not found: product_9");
    }
}
