// Composition graph expansion
pub mod recipe_resolver;

// Ledger totals and group rollups
pub mod stock_aggregator;

// Catalog querying
pub mod facet_filter;

// Response assembly for the CRUD layer
pub mod product_query;

pub use facet_filter::{FacetFilterEngine, FacetKind, FilterOutcome, SortField};
pub use product_query::ProductQueryService;
pub use recipe_resolver::{RecipeResolver, ResolveMode, ResolvedBom};
pub use stock_aggregator::{GroupKind, GroupRollup, StockAggregator, StockFlag};
