//! Request and response shapes exchanged with the CRUD layer.
//!
//! Everything serializes with PascalCase field names.

pub mod conversions;
pub mod filters;
pub mod responses;

pub use filters::{FilterCriteria, OrderType, ProductListFilter};
pub use responses::{
    Detail, FilterItems, HeaderWithDetails, LookupDto, NormDetails, ProductGroupTypeDto,
    ProductListResponse, ProductSummary, ProductWithDetails, RecipeDetailDto, RecipeDetails,
    SemiProductSummary, SemiProductWithDetails, SpecDetails, StockDto, WebFilterResponse,
};
