//! # Resources
//!
//! One resource per route family, covering every calling convention:
//!
//! | Route | Resource method | Interface |
//! |-------|-----------------|-----------|
//! | `products.get` | [`ProductResource::get`] | sync |
//! | `products.reserve` | [`ProductResource::reserve`] | callback |
//! | `pricing.quote` | [`PricingResource::quote`] | promise |
//! | `orders.place` | [`OrderResource::place`] | task |
//!
//! Resources are created per request by the [`ResourceRegistry`](resource_invoker::ResourceRegistry)
//! built in [`crate::shop`]; they share state only through the [`Catalog`](crate::catalog::Catalog).

mod order;
mod pricing;
mod product;

pub use order::OrderResource;
pub use pricing::PricingResource;
pub use product::ProductResource;
