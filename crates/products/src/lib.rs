//! Products domain module.
//!
//! Catalog rules for products (validation, discounts, filtering), implemented as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod filter;
pub mod product;

pub use filter::ProductFilter;
pub use product::{
    NewProduct, Product, ProductChanges, ProductParts, ProductUpdate, NAME_MAX_LEN,
};
