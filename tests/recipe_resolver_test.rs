//! Integration tests for recipe resolution over the bakery catalog
//!
//! Tests cover:
//! - Multi-level and single-level flattening
//! - Linear scaling by quantity
//! - Cycle and depth-limit detection
//! - Consolidated requirements and where-used lookups
//! - Closure loading through a `GraphSource`

mod common;

use assert_matches::assert_matches;
use common::*;
use recipe_engine::{
    db::{Catalog, EntityGraph},
    entities::{IngredientKind, IngredientRef, RecipeOwner},
    errors::ServiceError,
    services::{RecipeResolver, ResolveMode},
};
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn lines(graph: &EntityGraph, root: RecipeOwner, quantity: Decimal) -> Vec<(String, Decimal, u32)> {
    RecipeResolver::new(graph, 32)
        .resolve(root, quantity, ResolveMode::MultiLevel)
        .expect("resolution succeeds")
        .lines
        .into_iter()
        .map(|l| (l.code, l.amount, l.level))
        .collect()
}

#[test]
fn two_level_recipe_scales_semi_product_ingredients() {
    let catalog = Catalog {
        products: vec![product(1, "P", "P")],
        semi_products: vec![semi_product(10, "S", None)],
        raw_materials: vec![raw_material(100, "R", None), raw_material(200, "R2", None)],
        recipes: vec![product_recipe(1, 1), semi_recipe(2, 10)],
        recipe_details: vec![
            uses_semi(1, 1, 10, dec!(2)),
            uses_raw(2, 1, 100, dec!(1)),
            uses_raw(3, 2, 200, dec!(3)),
        ],
        ..Default::default()
    };
    let graph = EntityGraph::from_catalog(catalog);

    assert_eq!(
        lines(&graph, RecipeOwner::Product(1), dec!(1)),
        vec![
            ("S".to_string(), dec!(2), 1),
            ("R2".to_string(), dec!(6), 2),
            ("R".to_string(), dec!(1), 1),
        ]
    );
}

#[test]
fn bakery_tart_flattens_depth_first() {
    let graph = bakery_graph();
    let bom = RecipeResolver::new(&graph, 32)
        .resolve(RecipeOwner::Product(TART), dec!(1), ResolveMode::MultiLevel)
        .unwrap();

    let codes: Vec<_> = bom.lines.iter().map(|l| l.code.as_str()).collect();
    assert_eq!(
        codes,
        vec!["S-DOUGH", "R-FLOUR", "R-BUTTER", "S-CREAM", "R-LEMON", "R-SUGAR"]
    );
    assert_eq!(bom.lines[5].amount, dec!(0.125));
    assert_eq!(bom.lines[5].parent, RecipeOwner::SemiProduct(CREAM));
    assert_eq!(bom.lines[1].unit.as_deref(), Some("kg"));
    assert!(bom.issues.is_empty());
}

#[test]
fn single_level_lists_only_the_immediate_recipe() {
    let graph = bakery_graph();
    let bom = RecipeResolver::new(&graph, 32)
        .resolve(RecipeOwner::Product(TART), dec!(2), ResolveMode::SingleLevel)
        .unwrap();

    let entries: Vec<_> = bom
        .lines
        .iter()
        .map(|l| (l.ingredient, l.amount))
        .collect();
    assert_eq!(
        entries,
        vec![
            (IngredientRef::semi_product(DOUGH), dec!(2)),
            (IngredientRef::semi_product(CREAM), dec!(0.5)),
        ]
    );
}

#[rstest]
#[case(dec!(0))]
#[case(dec!(1))]
#[case(dec!(3))]
#[case(dec!(2.5))]
fn resolution_is_linear_in_quantity(#[case] k: Decimal) {
    let graph = bakery_graph();
    let unit = lines(&graph, RecipeOwner::Product(CAKE), dec!(1));
    let scaled = lines(&graph, RecipeOwner::Product(CAKE), k);

    assert_eq!(unit.len(), scaled.len());
    for ((code, one, _), (scaled_code, amount, _)) in unit.iter().zip(&scaled) {
        assert_eq!(code, scaled_code);
        assert_eq!(*amount, *one * k);
    }
}

#[test]
fn product_without_recipe_resolves_to_nothing() {
    let graph = bakery_graph();
    let bom = RecipeResolver::new(&graph, 32)
        .resolve(RecipeOwner::Product(BUN), dec!(1), ResolveMode::MultiLevel)
        .unwrap();
    assert!(bom.lines.is_empty());
    assert!(bom.requirements().is_empty());
}

#[test]
fn mutual_semi_product_reference_terminates_with_cycle() {
    let graph = EntityGraph::from_catalog(cyclic_catalog());
    let resolver = RecipeResolver::new(&graph, 32);

    assert_matches!(
        resolver.resolve(RecipeOwner::Product(1), dec!(1), ResolveMode::MultiLevel),
        Err(ServiceError::CycleDetected { .. })
    );
    assert_matches!(
        resolver.resolve(RecipeOwner::SemiProduct(11), dec!(1), ResolveMode::MultiLevel),
        Err(ServiceError::CycleDetected { ref node, .. }) if node == "SemiProduct 11"
    );
    // Single level never follows the loop.
    assert_eq!(
        resolver
            .resolve(RecipeOwner::Product(1), dec!(1), ResolveMode::SingleLevel)
            .unwrap()
            .lines
            .len(),
        1
    );
}

#[test]
fn validate_graph_reports_every_cyclic_owner() {
    let graph = EntityGraph::from_catalog(cyclic_catalog());
    let reports = RecipeResolver::new(&graph, 32).validate_graph();
    let roots: Vec<_> = reports.iter().map(|r| r.root).collect();
    assert_eq!(
        roots,
        vec![
            RecipeOwner::Product(1),
            RecipeOwner::SemiProduct(10),
            RecipeOwner::SemiProduct(11)
        ]
    );

    assert!(RecipeResolver::new(&bakery_graph(), 32)
        .validate_graph()
        .is_empty());
}

#[test]
fn requirements_sum_across_branches() {
    let graph = bakery_graph();
    let bom = RecipeResolver::new(&graph, 32)
        .resolve(RecipeOwner::Product(TART), dec!(4), ResolveMode::MultiLevel)
        .unwrap();

    let raw: Vec<_> = bom
        .requirements()
        .into_iter()
        .filter(|r| r.ingredient.kind == IngredientKind::RawMaterial)
        .map(|r| (r.ingredient.id, r.total_amount))
        .collect();
    assert_eq!(
        raw,
        vec![
            (FLOUR, dec!(12)),
            (SUGAR, dec!(0.5)),
            (BUTTER, dec!(2)),
            (LEMON, dec!(2)),
        ]
    );
}

#[test]
fn where_used_returns_direct_consumers_in_order() {
    let graph = bakery_graph();
    let resolver = RecipeResolver::new(&graph, 32);

    let sugar: Vec<_> = resolver
        .where_used(IngredientRef::raw_material(SUGAR))
        .unwrap()
        .into_iter()
        .map(|u| (u.owner, u.amount))
        .collect();
    assert_eq!(
        sugar,
        vec![
            (RecipeOwner::Product(CAKE), dec!(1)),
            (RecipeOwner::SemiProduct(CREAM), dec!(0.5)),
        ]
    );

    let dough: Vec<_> = resolver
        .where_used(IngredientRef::semi_product(DOUGH))
        .unwrap()
        .into_iter()
        .map(|u| u.code)
        .collect();
    assert_eq!(dough, vec!["P-CAKE", "P-TART"]);
}

#[tokio::test]
async fn closure_load_resolves_like_the_full_graph() {
    let source = bakery_catalog();
    let partial = EntityGraph::load_for_root(&source, RecipeOwner::Product(TART))
        .await
        .unwrap();
    let full = EntityGraph::load(&source).await.unwrap();

    assert_eq!(
        lines(&partial, RecipeOwner::Product(TART), dec!(1)),
        lines(&full, RecipeOwner::Product(TART), dec!(1))
    );
    assert!(partial.product(BREAD).is_none());
    assert!(partial.raw_material(LEMON).is_some());
}
