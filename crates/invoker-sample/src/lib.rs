//! # Invoker Sample Shop
//!
//! A small product shop served through [`resource_invoker`]. It exposes the application
//! modules for integration testing.
//!
//! - [`model`]: plain data ([`Product`](model::Product), [`Order`](model::Order), [`Quote`](model::Quote)).
//! - [`catalog`]: the shared in-memory inventory.
//! - [`resources`]: one resource per calling convention.
//! - [`shop`]: route table, argument building and batch handling.

pub mod catalog;
pub mod model;
pub mod resources;
pub mod shop;
