use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EntityId;

/// Finished good as stored by the catalog.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Product {
    pub id: EntityId,
    pub code: String,
    pub name: String,
    pub name2: Option<String>,

    pub seller_id: Option<EntityId>,
    pub brand_id: Option<EntityId>,
    pub product_group_id: Option<EntityId>,
    pub product_type_id: Option<EntityId>,
    pub storage_condition_id: Option<EntityId>,
    #[serde(rename = "SKUFollowTypeId")]
    pub sku_follow_type_id: Option<EntityId>,
    #[serde(rename = "SKUFollowUnitId")]
    pub sku_follow_unit_id: Option<EntityId>,

    pub weight: Option<f64>,
    pub volume: Option<f64>,
    pub density: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub length: Option<f64>,
    /// Units per box; drives every box-denominated stock figure.
    pub qty_in_box: Option<f64>,

    pub stock_tracking: bool,
    #[serde(rename = "BBDTracking")]
    pub bbd_tracking: bool,
    pub lot_tracking: bool,
    pub is_blocked: bool,
    pub is_setted_product: bool,

    pub budget_group: Option<String>,
    pub sales_group: Option<String>,
    pub production_place: Option<String>,
    pub packaging: Option<String>,
    pub sales_based: Option<String>,
    pub cutting_type: Option<String>,
    pub quality_type: Option<String>,
    pub color_type: Option<String>,
    pub product_status: Option<String>,

    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Many-to-many link between a product and a type definition of a
/// `ProductGroupType`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProductToProductGroupTypeDefinition {
    pub product_id: EntityId,
    pub product_group_type_definition_id: EntityId,
}
