//! Explicit entity → DTO mapping.

use super::responses::{
    HeaderWithDetails, LookupDto, NormDetails, ProductGroupTypeDto, ProductSummary,
    RecipeDetailDto, RecipeDetails, SemiProductSummary, SpecDetails, StockDto,
};
use crate::db::EntityGraph;
use crate::entities::{
    EntityId, Lookup, LookupKind, Norm, Product, ProductGroupTypeDefinition, Recipe, RecipeOwner,
    SemiProduct, Spec, Stock, StockOwner,
};

impl From<&Lookup> for LookupDto {
    fn from(lookup: &Lookup) -> Self {
        Self {
            id: lookup.id,
            name: lookup.name.clone(),
        }
    }
}

impl From<&ProductGroupTypeDefinition> for LookupDto {
    fn from(definition: &ProductGroupTypeDefinition) -> Self {
        Self {
            id: definition.id,
            name: definition.name.clone(),
        }
    }
}

impl ProductGroupTypeDto {
    pub fn new(group_type: &Lookup, definitions: Vec<LookupDto>) -> Self {
        Self {
            id: group_type.id,
            name: group_type.name.clone(),
            definitions,
        }
    }
}

impl StockDto {
    /// Ledger fields copied from `row`; totals are left for the aggregator.
    pub fn for_owner(owner: StockOwner, row: Option<&Stock>) -> Self {
        let mut dto = StockDto::default();
        match owner {
            StockOwner::Product(id) => dto.product_id = Some(id),
            StockOwner::SemiProduct(id) => dto.semi_product_id = Some(id),
            StockOwner::RawMaterial(id) => dto.raw_material_id = Some(id),
        }
        if let Some(row) = row {
            dto.code1 = row.code1.clone();
            dto.code2 = row.code2.clone();
            dto.code3 = row.code3.clone();
            dto.code1_stock = row.code1_stock;
            dto.code2_stock = row.code2_stock;
            dto.code3_stock = row.code3_stock;
        }
        dto
    }
}

fn lookup_dto(graph: &EntityGraph, kind: LookupKind, id: Option<EntityId>) -> Option<LookupDto> {
    id.and_then(|id| graph.lookup(kind, id)).map(LookupDto::from)
}

pub fn product_summary(graph: &EntityGraph, product: &Product) -> ProductSummary {
    ProductSummary {
        id: product.id,
        code: product.code.clone(),
        name: product.name.clone(),
        name2: product.name2.clone(),
        seller: lookup_dto(graph, LookupKind::Seller, product.seller_id),
        brand: lookup_dto(graph, LookupKind::Brand, product.brand_id),
        product_group: lookup_dto(graph, LookupKind::ProductGroup, product.product_group_id),
        product_type: lookup_dto(graph, LookupKind::ProductType, product.product_type_id),
        storage_condition: lookup_dto(
            graph,
            LookupKind::StorageCondition,
            product.storage_condition_id,
        ),
        sku_follow_type: lookup_dto(graph, LookupKind::SkuFollowType, product.sku_follow_type_id),
        sku_follow_unit: lookup_dto(graph, LookupKind::SkuFollowUnit, product.sku_follow_unit_id),
        qty_in_box: product.qty_in_box,
        weight: product.weight,
        volume: product.volume,
        is_blocked: product.is_blocked,
        product_status: product.product_status.clone(),
        created_by: product.created_by.clone(),
        updated_by: product.updated_by.clone(),
        created_at: product.created_at,
        updated_at: product.updated_at,
    }
}

pub fn semi_product_summary(graph: &EntityGraph, semi: &SemiProduct) -> SemiProductSummary {
    SemiProductSummary {
        id: semi.id,
        code: semi.code.clone(),
        name: semi.name.clone(),
        code1: semi.code1.clone(),
        code2: semi.code2.clone(),
        code3: semi.code3.clone(),
        semi_product_group: lookup_dto(
            graph,
            LookupKind::SemiProductGroup,
            semi.semi_product_group_id,
        ),
        unit: semi.unit.clone(),
        qty_in_box: semi.qty_in_box,
    }
}

fn owner_header<D>(
    graph: &EntityGraph,
    id: EntityId,
    name: &str,
    owner: RecipeOwner,
    details: Vec<D>,
) -> HeaderWithDetails<D> {
    let (code, owner_name) = graph.describe(owner).unwrap_or(("", ""));
    let (product_id, semi_product_id) = match owner {
        RecipeOwner::Product(id) => (Some(id), None),
        RecipeOwner::SemiProduct(id) => (None, Some(id)),
    };
    HeaderWithDetails {
        id,
        name: name.to_string(),
        product_code: code.to_string(),
        product_name: owner_name.to_string(),
        product_id,
        semi_product_id,
        details,
    }
}

/// Recipe header and its rows in sequence order. Rows that reference an
/// unknown or ambiguous ingredient keep their amount but carry no identity.
pub fn recipe_details(graph: &EntityGraph, recipe: &Recipe, owner: RecipeOwner) -> RecipeDetails {
    let rows = graph
        .recipe_details(recipe.id)
        .iter()
        .map(|detail| {
            let ingredient = detail.ingredient().ok();
            let described = ingredient.and_then(|i| graph.describe_ingredient(i));
            RecipeDetailDto {
                id: detail.id,
                ingredient_kind: ingredient.map(|i| i.kind),
                ingredient_id: ingredient.map(|i| i.id),
                code: described.map(|(code, _, _)| code.to_string()),
                name: described.map(|(_, name, _)| name.to_string()),
                amount: detail.amount,
                unit: detail.unit.clone(),
                sequence: detail.sequence,
            }
        })
        .collect();
    owner_header(graph, recipe.id, &recipe.name, owner, rows)
}

pub fn norm_details(graph: &EntityGraph, norm: &Norm) -> NormDetails {
    let rows = graph.norm_details(norm.id).to_vec();
    owner_header(
        graph,
        norm.id,
        &norm.name,
        RecipeOwner::Product(norm.product_id),
        rows,
    )
}

pub fn spec_details(graph: &EntityGraph, spec: &Spec) -> SpecDetails {
    let rows = graph.spec_details(spec.id).to_vec();
    owner_header(
        graph,
        spec.id,
        &spec.name,
        RecipeOwner::Product(spec.product_id),
        rows,
    )
}
