//! Shared domain primitives: typed ids, validated value types and the
//! domain error. No I/O lives here.

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ProductId, ProfileId, StockEntryId};
pub use value_object::{DiscountPercentage, Sku};
