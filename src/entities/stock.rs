use serde::{Deserialize, Serialize};

use super::EntityId;

/// Balance snapshot across the three warehouse ledgers.
///
/// Exactly one of `product_id`, `semi_product_id` and `raw_material_id`
/// identifies the owner. Absent balances count as zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Stock {
    pub id: EntityId,
    pub product_id: Option<EntityId>,
    pub semi_product_id: Option<EntityId>,
    pub raw_material_id: Option<EntityId>,
    pub code1: Option<String>,
    pub code2: Option<String>,
    pub code3: Option<String>,
    pub code1_stock: Option<i64>,
    pub code2_stock: Option<i64>,
    pub code3_stock: Option<i64>,
}

impl Stock {
    /// Owner of this row, or `None` when zero or several owners are set.
    pub fn owner(&self) -> Option<StockOwner> {
        match (self.product_id, self.semi_product_id, self.raw_material_id) {
            (Some(id), None, None) => Some(StockOwner::Product(id)),
            (None, Some(id), None) => Some(StockOwner::SemiProduct(id)),
            (None, None, Some(id)) => Some(StockOwner::RawMaterial(id)),
            _ => None,
        }
    }

    pub fn ledgers(&self) -> [i64; 3] {
        [
            self.code1_stock.unwrap_or(0),
            self.code2_stock.unwrap_or(0),
            self.code3_stock.unwrap_or(0),
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "Kind", content = "Id")]
pub enum StockOwner {
    Product(EntityId),
    SemiProduct(EntityId),
    RawMaterial(EntityId),
}
