use super::{Product, ProductId};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Quantity from which the bulk discount applies.
pub const BULK_QUANTITY: u32 = 10;
const BULK_DISCOUNT: f64 = 0.10;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u32);

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order_{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub total: f64,
}

/// Request body of `orders.place`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderCreate {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Price of `quantity` units of one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: f64,
    pub total: f64,
}

impl Quote {
    pub fn for_product(product: &Product, quantity: u32) -> Self {
        let gross = product.price * f64::from(quantity);
        let total = if quantity >= BULK_QUANTITY {
            gross * (1.0 - BULK_DISCOUNT)
        } else {
            gross
        };
        Self {
            product_id: product.id.clone(),
            quantity,
            unit_price: product.price,
            total,
        }
    }
}
