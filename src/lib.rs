//! Recipe Engine Library
//!
//! Read-side engine for a product catalog: resolves multi-level recipes
//! (bills of materials), aggregates stock across the three warehouse
//! ledgers and runs multi-facet product queries over an in-memory
//! [`db::EntityGraph`] snapshot.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod dto;
pub mod entities;
pub mod errors;
pub mod services;

pub mod prelude {
    pub use crate::config::{load_config, EngineConfig};
    pub use crate::db::*;
    pub use crate::dto::{FilterCriteria, OrderType, ProductListFilter};
    pub use crate::entities::{EntityId, IngredientRef, RecipeOwner, StockOwner};
    pub use crate::errors::*;
    pub use crate::services::*;
}
