//! `galley-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, entity/value-object markers, the shared error model and the
//! category grouping used by every listing screen.

pub mod entity;
pub mod error;
pub mod grouping;
pub mod id;
pub mod validation;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, FieldError, ValidationErrors};
pub use grouping::{group_by_category, CategoryGroup};
pub use id::{CustomerId, InventoryItemId, OrderId, RecipeId};
pub use value_object::ValueObject;
