use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use validator::Validate;

use crate::entities::EntityId;
use crate::services::facet_filter::FacetKind;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OrderType {
    #[default]
    #[serde(alias = "Asc", alias = "ASC")]
    Asc,
    #[serde(alias = "Desc", alias = "DESC")]
    Desc,
}

/// Multi-facet catalog query.
///
/// Every facet is a list of accepted values: OR within a facet, AND across
/// facets, and an empty list leaves the facet unconstrained.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", default)]
pub struct FilterCriteria {
    #[validate(length(max = 200))]
    pub code: Option<String>,
    #[validate(length(max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 200))]
    pub name2: Option<String>,

    pub seller: Vec<String>,
    pub brand: Vec<String>,
    pub budget_group: Vec<String>,
    pub sales_group: Vec<String>,
    pub production_place: Vec<String>,
    pub raw_material_group: Vec<String>,
    pub packaging: Vec<String>,
    pub storage_condition: Vec<String>,
    pub sales_based: Vec<String>,
    pub cutting_type: Vec<String>,
    pub quality_type: Vec<String>,
    pub color_type: Vec<String>,
    pub product_status: Vec<String>,
    pub product_group: Vec<String>,
    pub semi_product_group: Vec<String>,
    pub product_group_type_definition: Vec<String>,
    pub created_by: Vec<String>,
    pub updated_by: Vec<String>,

    pub order_by: Option<String>,
    pub order_type: OrderType,
    /// `0` or absent means no limit.
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl FilterCriteria {
    /// Accepted values of one facet.
    pub fn facet(&self, kind: FacetKind) -> &[String] {
        match kind {
            FacetKind::Seller => &self.seller,
            FacetKind::Brand => &self.brand,
            FacetKind::BudgetGroup => &self.budget_group,
            FacetKind::SalesGroup => &self.sales_group,
            FacetKind::ProductionPlace => &self.production_place,
            FacetKind::RawMaterialGroup => &self.raw_material_group,
            FacetKind::Packaging => &self.packaging,
            FacetKind::StorageCondition => &self.storage_condition,
            FacetKind::SalesBased => &self.sales_based,
            FacetKind::CuttingType => &self.cutting_type,
            FacetKind::QualityType => &self.quality_type,
            FacetKind::ColorType => &self.color_type,
            FacetKind::ProductStatus => &self.product_status,
            FacetKind::ProductGroup => &self.product_group,
            FacetKind::SemiProductGroup => &self.semi_product_group,
            FacetKind::ProductGroupTypeDefinition => &self.product_group_type_definition,
            FacetKind::CreatedBy => &self.created_by,
            FacetKind::UpdatedBy => &self.updated_by,
        }
    }

    pub fn facet_mut(&mut self, kind: FacetKind) -> &mut Vec<String> {
        match kind {
            FacetKind::Seller => &mut self.seller,
            FacetKind::Brand => &mut self.brand,
            FacetKind::BudgetGroup => &mut self.budget_group,
            FacetKind::SalesGroup => &mut self.sales_group,
            FacetKind::ProductionPlace => &mut self.production_place,
            FacetKind::RawMaterialGroup => &mut self.raw_material_group,
            FacetKind::Packaging => &mut self.packaging,
            FacetKind::StorageCondition => &mut self.storage_condition,
            FacetKind::SalesBased => &mut self.sales_based,
            FacetKind::CuttingType => &mut self.cutting_type,
            FacetKind::QualityType => &mut self.quality_type,
            FacetKind::ColorType => &mut self.color_type,
            FacetKind::ProductStatus => &mut self.product_status,
            FacetKind::ProductGroup => &mut self.product_group,
            FacetKind::SemiProductGroup => &mut self.semi_product_group,
            FacetKind::ProductGroupTypeDefinition => &mut self.product_group_type_definition,
            FacetKind::CreatedBy => &mut self.created_by,
            FacetKind::UpdatedBy => &mut self.updated_by,
        }
    }
}

/// Id-based list filter. Each id present is an equality constraint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProductListFilter {
    pub product_group_type_id: Option<EntityId>,
    pub product_group_type_definition_id: Option<EntityId>,
    pub seller_id: Option<EntityId>,
    pub brand_id: Option<EntityId>,
    pub product_group_id: Option<EntityId>,
    pub storage_condition_id: Option<EntityId>,
    pub product_type_id: Option<EntityId>,
    #[serde(rename = "SKUFollowTypeId")]
    pub sku_follow_type_id: Option<EntityId>,
    #[serde(rename = "SKUFollowUnitId")]
    pub sku_follow_unit_id: Option<EntityId>,
    /// `0` or absent means no limit.
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    #[validate(length(max = 200))]
    pub code_or_name: Option<String>,
}
