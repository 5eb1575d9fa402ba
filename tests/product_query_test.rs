//! End-to-end tests of the service facade used by the CRUD layer

mod common;

use common::*;
use recipe_engine::{
    db::{Catalog, EntityGraph},
    dto::FilterCriteria,
    entities::{IngredientKind, IngredientRef, RecipeOwner, StockOwner},
    errors::ServiceError,
    services::{FacetKind, GroupKind, ProductQueryService, StockFlag},
};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[test]
fn product_detail_assembles_every_section() {
    let service = bakery_service();
    let detail = service.product_detail(CAKE).unwrap();
    assert!(detail.found);
    let view = detail.data.expect("cake is present");

    assert_eq!(view.product.code, "P-CAKE");
    assert_eq!(view.product.brand.as_ref().map(|b| b.name.as_str()), Some("Brand A"));
    assert_eq!(view.stock.total_stock, 15);
    assert_eq!(view.stock.total_stock_in_box, 30.0);

    let definitions: Vec<_> = view
        .product_group_type_definitions
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(definitions, vec!["Winter"]);

    let recipe = view.recipe.expect("cake has a recipe");
    assert_eq!(recipe.product_code, "P-CAKE");
    let rows: Vec<_> = recipe
        .details
        .iter()
        .map(|d| (d.ingredient_kind, d.code.clone()))
        .collect();
    assert_eq!(
        rows,
        vec![
            (Some(IngredientKind::SemiProduct), Some("S-DOUGH".to_string())),
            (Some(IngredientKind::RawMaterial), Some("R-SUGAR".to_string())),
        ]
    );

    let bom = view.bom.expect("cake resolves");
    assert!(view.bom_error.is_none());
    assert_eq!(bom.lines.len(), 4);

    assert_eq!(view.norms.len(), 1);
    let parameters: Vec<_> = view.norms[0]
        .details
        .iter()
        .map(|d| d.parameter.as_str())
        .collect();
    assert_eq!(parameters, vec!["Weight", "Moisture"]);
    assert_eq!(view.specs[0].details[0].name, "Shelf life");
}

#[test]
fn missing_entities_are_reported_as_not_found() {
    let service = bakery_service();
    let detail = service.product_detail(999).unwrap();
    assert!(!detail.found);
    assert!(detail.data.is_none());

    assert!(!service.semi_product_detail(999).unwrap().found);
    assert!(!service.norm_details(9).found);
    assert!(!service.spec_details(9).found);
    assert!(!service.recipe_details(RecipeOwner::Product(BUN)).found);
    assert!(matches!(
        service.stock(StockOwner::Product(999)),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn cyclic_recipe_surfaces_as_bom_error() {
    let graph = Arc::new(EntityGraph::from_catalog(cyclic_catalog()));
    let service = ProductQueryService::new(graph, test_config());

    let view = service.product_detail(1).unwrap().data.expect("product exists");
    assert!(view.recipe.is_some());
    assert!(view.bom.is_none());
    let error = view.bom_error.expect("cycle is reported");
    assert_eq!(error.kind, "cycle_detected");

    assert!(!service.validate_graph().is_empty());
    assert!(bakery_service().validate_graph().is_empty());
}

#[test]
fn semi_product_detail_lists_consumers() {
    let service = bakery_service();
    let view = service
        .semi_product_detail(DOUGH)
        .unwrap()
        .data
        .expect("dough exists");

    assert_eq!(view.semi_product.code, "S-DOUGH");
    assert_eq!(
        view.semi_product.semi_product_group.as_ref().map(|g| g.name.as_str()),
        Some("Doughs")
    );
    assert_eq!(view.stock.total_stock, 6);
    assert_eq!(view.stock.total_product_stock, 19);

    let recipe = view.recipe.expect("dough has a recipe");
    assert_eq!(recipe.product_code, "S-DOUGH");
    assert_eq!(recipe.semi_product_id, Some(DOUGH));

    let consumers: Vec<_> = view.used_by.iter().map(|u| u.owner).collect();
    assert_eq!(
        consumers,
        vec![RecipeOwner::Product(CAKE), RecipeOwner::Product(TART)]
    );
}

#[test]
fn web_filter_pages_summaries_and_optional_details() {
    let service = bakery_service();
    let mut criteria = FilterCriteria::default();
    criteria.facet_mut(FacetKind::Brand).push("Brand A".to_string());

    let response = service.web_filter(&criteria, false).unwrap();
    assert_eq!(response.row_count, 2);
    let codes: Vec<_> = response.products.iter().map(|p| p.code.as_str()).collect();
    assert_eq!(codes, vec!["P-CAKE", "P-TART"]);
    assert!(response.products_with_details.is_empty());

    criteria.limit = Some(1);
    criteria.offset = Some(1);
    let response = service.web_filter(&criteria, true).unwrap();
    assert_eq!(response.row_count, 2);
    assert_eq!(response.products_with_details.len(), 1);
    assert_eq!(response.products_with_details[0].product.id, TART);
}

#[test]
fn list_products_applies_id_filters() {
    let service = bakery_service();
    let response = service
        .list_products(&recipe_engine::dto::ProductListFilter {
            brand_id: Some(2),
            ..Default::default()
        })
        .unwrap();
    let ids: Vec<_> = response.products.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![BREAD, COOKIE]);
    assert_eq!(response.row_count, 2);
}

#[test]
fn requirements_scale_with_quantity() {
    let service = bakery_service();
    let requirements = service
        .requirements(RecipeOwner::Product(CAKE), dec!(2))
        .unwrap();
    let raw: Vec<_> = requirements
        .iter()
        .filter(|r| r.ingredient.kind == IngredientKind::RawMaterial)
        .map(|r| (r.ingredient.id, r.total_amount))
        .collect();
    assert_eq!(raw, vec![(FLOUR, dec!(12)), (SUGAR, dec!(2)), (BUTTER, dec!(2))]);

    let used_by = service.where_used(IngredientRef::raw_material(SUGAR)).unwrap();
    let owners: Vec<_> = used_by.iter().map(|u| u.owner).collect();
    assert_eq!(
        owners,
        vec![RecipeOwner::Product(CAKE), RecipeOwner::SemiProduct(CREAM)]
    );
}

#[test]
fn stock_views_cover_every_owner_kind() {
    let service = bakery_service();
    assert_eq!(service.stock(StockOwner::RawMaterial(FLOUR)).unwrap().total_stock, 8);
    assert_eq!(service.stock(StockOwner::SemiProduct(DOUGH)).unwrap().total_stock, 6);
    assert_eq!(service.stock(StockOwner::Product(TART)).unwrap().total_stock, 4);

    let empty = service.stock(StockOwner::RawMaterial(LEMON)).unwrap();
    assert_eq!(empty.total_stock, 0);
    assert_eq!(empty.code1_stock, None);
}

#[test]
fn header_views_keep_detail_order() {
    let service = bakery_service();
    let norm = service.norm_details(1).data.expect("norm exists");
    assert_eq!(norm.product_id, Some(CAKE));
    assert_eq!(norm.product_name, "Chocolate Cake");
    let ids: Vec<_> = norm.details.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![1, 2]);

    let cream = service
        .recipe_details(RecipeOwner::SemiProduct(CREAM))
        .data
        .expect("cream recipe exists");
    let ids: Vec<_> = cream.details.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![7, 8]);
}

#[tokio::test]
async fn loads_from_a_graph_source() {
    let catalog: Catalog = bakery_catalog();
    let service = ProductQueryService::load(&catalog, test_config()).await.unwrap();
    assert_eq!(service.graph().product_count(), 5);
    assert!(service.graph().issues().is_empty());
}

#[tokio::test]
async fn filter_items_ignore_paging() {
    let service = bakery_service();
    let criteria = FilterCriteria {
        limit: Some(1),
        ..Default::default()
    };
    let items = service.filter_items(&criteria).await.unwrap();
    let brands: Vec<_> = items.brands.iter().map(|b| b.id).collect();
    assert_eq!(brands, vec![1, 2, 3]);
}

#[tokio::test]
async fn group_rollups_respect_cancellation() {
    let service = bakery_service();

    let rollups = service
        .group_rollups(GroupKind::RawMaterialGroup, CancellationToken::new())
        .await
        .unwrap();
    let totals: Vec<_> = rollups.iter().map(|r| (r.group_id, r.total_stock)).collect();
    assert_eq!(totals, vec![(1, 16), (2, 0), (3, 0)]);

    let token = CancellationToken::new();
    token.cancel();
    let rollups = service
        .group_rollups(GroupKind::RawMaterialGroup, token)
        .await
        .unwrap();
    assert_eq!(rollups.len(), 3);
    assert!(rollups
        .iter()
        .all(|r| r.flags.contains(&StockFlag::Cancelled)));
}
