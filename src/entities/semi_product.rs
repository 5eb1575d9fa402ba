use serde::{Deserialize, Serialize};

use super::EntityId;

/// Intermediate good. May own a recipe of its own.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SemiProduct {
    pub id: EntityId,
    pub code: String,
    pub name: String,
    pub code1: Option<String>,
    pub code2: Option<String>,
    pub code3: Option<String>,
    pub semi_product_group_id: Option<EntityId>,
    pub unit: Option<String>,
    pub qty_in_box: Option<f64>,
}
