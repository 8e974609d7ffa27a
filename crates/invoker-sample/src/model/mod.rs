//! Plain data types shared by the resources.

mod order;
mod product;

pub use order::*;
pub use product::*;
