use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::{EntityId, IngredientKind, NormDetail, SpecDetail};
use crate::errors::ErrorResponse;
use crate::services::recipe_resolver::{ResolvedBom, Usage};
use crate::services::stock_aggregator::StockFlag;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LookupDto {
    pub id: EntityId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProductGroupTypeDto {
    pub id: EntityId,
    pub name: String,
    pub definitions: Vec<LookupDto>,
}

/// Facet values available over a filtered product set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FilterItems {
    pub product_group_types: Vec<ProductGroupTypeDto>,
    pub sellers: Vec<LookupDto>,
    pub brands: Vec<LookupDto>,
    pub product_groups: Vec<LookupDto>,
    pub storage_conditions: Vec<LookupDto>,
    pub product_types: Vec<LookupDto>,
    #[serde(rename = "SKUFollowTypes")]
    pub sku_follow_types: Vec<LookupDto>,
    #[serde(rename = "SKUFollowUnits")]
    pub sku_follow_units: Vec<LookupDto>,
}

/// Catalog row with its lookups resolved to names.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProductSummary {
    pub id: EntityId,
    pub code: String,
    pub name: String,
    pub name2: Option<String>,
    pub seller: Option<LookupDto>,
    pub brand: Option<LookupDto>,
    pub product_group: Option<LookupDto>,
    pub product_type: Option<LookupDto>,
    pub storage_condition: Option<LookupDto>,
    #[serde(rename = "SKUFollowType")]
    pub sku_follow_type: Option<LookupDto>,
    #[serde(rename = "SKUFollowUnit")]
    pub sku_follow_unit: Option<LookupDto>,
    pub qty_in_box: Option<f64>,
    pub weight: Option<f64>,
    pub volume: Option<f64>,
    pub is_blocked: bool,
    pub product_status: Option<String>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SemiProductSummary {
    pub id: EntityId,
    pub code: String,
    pub name: String,
    pub code1: Option<String>,
    pub code2: Option<String>,
    pub code3: Option<String>,
    pub semi_product_group: Option<LookupDto>,
    pub unit: Option<String>,
    pub qty_in_box: Option<f64>,
}

/// Ledger balances and derived totals of one stock owner.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StockDto {
    pub product_id: Option<EntityId>,
    pub semi_product_id: Option<EntityId>,
    pub raw_material_id: Option<EntityId>,
    pub code1: Option<String>,
    pub code2: Option<String>,
    pub code3: Option<String>,
    pub code1_stock: Option<i64>,
    pub code2_stock: Option<i64>,
    pub code3_stock: Option<i64>,
    pub total_stock: i64,
    pub total_stock_in_box: f64,
    pub total_product_stock: i64,
    pub total_product_stock_in_box: f64,
    pub grand_total_in_box: f64,
    /// Any flag means the derived totals above were zeroed; the raw
    /// `CodeNStock` ledgers are still reported as read.
    pub flags: Vec<StockFlag>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecipeDetailDto {
    pub id: EntityId,
    pub ingredient_kind: Option<IngredientKind>,
    pub ingredient_id: Option<EntityId>,
    pub code: Option<String>,
    pub name: Option<String>,
    pub amount: Decimal,
    pub unit: Option<String>,
    pub sequence: Option<i32>,
}

/// Header row plus its ordered detail rows.
///
/// `ProductCode`/`ProductName` describe the owner, which for a semi product
/// recipe is the semi product itself.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HeaderWithDetails<D> {
    pub id: EntityId,
    pub name: String,
    pub product_code: String,
    pub product_name: String,
    pub product_id: Option<EntityId>,
    pub semi_product_id: Option<EntityId>,
    pub details: Vec<D>,
}

pub type RecipeDetails = HeaderWithDetails<RecipeDetailDto>;
pub type NormDetails = HeaderWithDetails<NormDetail>;
pub type SpecDetails = HeaderWithDetails<SpecDetail>;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProductWithDetails {
    pub product: ProductSummary,
    pub stock: StockDto,
    pub product_group_type_definitions: Vec<LookupDto>,
    pub recipe: Option<RecipeDetails>,
    pub bom: Option<ResolvedBom>,
    /// Set instead of `bom` when resolution failed, for example on a cycle.
    pub bom_error: Option<ErrorResponse>,
    pub norms: Vec<NormDetails>,
    pub specs: Vec<SpecDetails>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SemiProductWithDetails {
    pub semi_product: SemiProductSummary,
    pub stock: StockDto,
    pub recipe: Option<RecipeDetails>,
    pub bom: Option<ResolvedBom>,
    pub bom_error: Option<ErrorResponse>,
    pub used_by: Vec<Usage>,
}

/// Explicit found/not-found wrapper for single-entity views.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Detail<T> {
    pub found: bool,
    pub data: Option<T>,
}

impl<T> Detail<T> {
    pub fn found(data: T) -> Self {
        Self {
            found: true,
            data: Some(data),
        }
    }

    pub fn not_found() -> Self {
        Self {
            found: false,
            data: None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebFilterResponse {
    pub products_with_details: Vec<ProductWithDetails>,
    pub products: Vec<ProductSummary>,
    /// Size of the filtered set before paging.
    pub row_count: u64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProductListResponse {
    pub products: Vec<ProductSummary>,
    pub row_count: u64,
}
