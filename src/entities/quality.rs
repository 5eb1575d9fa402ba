//! Quality norm and specification sheets attached to products.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::EntityId;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Norm {
    pub id: EntityId,
    pub name: String,
    pub product_id: EntityId,
}

/// Measured parameter with its tolerated range.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NormDetail {
    pub id: EntityId,
    pub norm_id: EntityId,
    pub parameter: String,
    pub min_value: Option<Decimal>,
    pub max_value: Option<Decimal>,
    pub target_value: Option<Decimal>,
    pub unit: Option<String>,
    pub sequence: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Spec {
    pub id: EntityId,
    pub name: String,
    pub product_id: EntityId,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SpecDetail {
    pub id: EntityId,
    pub spec_id: EntityId,
    pub name: String,
    pub value: Option<String>,
    pub unit: Option<String>,
    pub sequence: Option<i32>,
}
