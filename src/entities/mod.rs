//! Read-only entity rows the engine works over.
//!
//! Rows reference each other by integer id only; navigation goes through
//! [`crate::db::EntityGraph`].

pub mod lookup;
pub mod product;
pub mod quality;
pub mod raw_material;
pub mod recipe;
pub mod semi_product;
pub mod stock;

pub use lookup::{Lookup, LookupKind, ProductGroupTypeDefinition};
pub use product::{Product, ProductToProductGroupTypeDefinition};
pub use quality::{Norm, NormDetail, Spec, SpecDetail};
pub use raw_material::RawMaterial;
pub use recipe::{IngredientKind, IngredientRef, Recipe, RecipeDetail, RecipeOwner};
pub use semi_product::SemiProduct;
pub use stock::{Stock, StockOwner};

/// Primary key type shared by every entity table.
pub type EntityId = i64;
