use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};

use super::EntityId;
use crate::errors::ServiceError;

/// Composition header. Owned by exactly one product or one semi product.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Recipe {
    pub id: EntityId,
    pub name: String,
    pub product_id: Option<EntityId>,
    pub semi_product_id: Option<EntityId>,
}

impl Recipe {
    /// Resolves the owner, rejecting rows that name neither or both owners.
    pub fn owner(&self) -> Result<RecipeOwner, String> {
        match (self.product_id, self.semi_product_id) {
            (Some(id), None) => Ok(RecipeOwner::Product(id)),
            (None, Some(id)) => Ok(RecipeOwner::SemiProduct(id)),
            (None, None) => Err("recipe has no owner".to_string()),
            (Some(_), Some(_)) => {
                Err("recipe names both a product and a semi product as owner".to_string())
            }
        }
    }
}

/// One ingredient row of a recipe.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RecipeDetail {
    pub id: EntityId,
    pub recipe_id: EntityId,
    pub raw_material_id: Option<EntityId>,
    pub semi_product_id: Option<EntityId>,
    /// Quantity per one unit of the parent.
    pub amount: Decimal,
    pub unit: Option<String>,
    pub sequence: Option<i32>,
}

impl RecipeDetail {
    /// Returns the single referenced ingredient.
    pub fn ingredient(&self) -> Result<IngredientRef, ServiceError> {
        match (self.raw_material_id, self.semi_product_id) {
            (Some(id), None) => Ok(IngredientRef::raw_material(id)),
            (None, Some(id)) => Ok(IngredientRef::semi_product(id)),
            (None, None) => Err(ServiceError::invalid_detail(
                self.id,
                "references neither a raw material nor a semi product",
            )),
            (Some(_), Some(_)) => Err(ServiceError::invalid_detail(
                self.id,
                "references both a raw material and a semi product",
            )),
        }
    }
}

/// Node of the composition graph that can own a recipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "Kind", content = "Id")]
pub enum RecipeOwner {
    Product(EntityId),
    SemiProduct(EntityId),
}

impl RecipeOwner {
    pub fn id(&self) -> EntityId {
        match self {
            RecipeOwner::Product(id) | RecipeOwner::SemiProduct(id) => *id,
        }
    }
}

impl fmt::Display for RecipeOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipeOwner::Product(id) => write!(f, "Product {}", id),
            RecipeOwner::SemiProduct(id) => write!(f, "SemiProduct {}", id),
        }
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum IngredientKind {
    RawMaterial,
    SemiProduct,
}

/// Identity of an ingredient referenced by a recipe detail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IngredientRef {
    pub kind: IngredientKind,
    pub id: EntityId,
}

impl IngredientRef {
    pub fn raw_material(id: EntityId) -> Self {
        Self {
            kind: IngredientKind::RawMaterial,
            id,
        }
    }

    pub fn semi_product(id: EntityId) -> Self {
        Self {
            kind: IngredientKind::SemiProduct,
            id,
        }
    }

    /// The recipe-owning node for semi products; raw materials never own one.
    pub fn as_owner(&self) -> Option<RecipeOwner> {
        match self.kind {
            IngredientKind::SemiProduct => Some(RecipeOwner::SemiProduct(self.id)),
            IngredientKind::RawMaterial => None,
        }
    }
}

impl fmt::Display for IngredientRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}
