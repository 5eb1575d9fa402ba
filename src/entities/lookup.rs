use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::EntityId;

/// Flat classification row (id, Name).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Lookup {
    pub id: EntityId,
    pub name: String,
}

/// Which classification table a [`Lookup`] row belongs to.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum LookupKind {
    Seller,
    Brand,
    ProductGroup,
    StorageCondition,
    ProductType,
    #[serde(rename = "SKUFollowType")]
    #[strum(serialize = "SKUFollowType")]
    SkuFollowType,
    #[serde(rename = "SKUFollowUnit")]
    #[strum(serialize = "SKUFollowUnit")]
    SkuFollowUnit,
    ProductGroupType,
    RawMaterialGroup,
    SemiProductGroup,
}

/// Member of a `ProductGroupType` lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProductGroupTypeDefinition {
    pub id: EntityId,
    pub name: String,
    pub product_group_type_id: EntityId,
}
