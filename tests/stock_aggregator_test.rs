//! Integration tests for stock totals and group rollups

mod common;

use std::sync::Arc;

use common::*;
use recipe_engine::{
    db::{Catalog, EntityGraph},
    entities::StockOwner,
    services::{
        stock_aggregator::{rollup_groups, rollup_total},
        GroupKind, StockAggregator, StockFlag,
    },
};
use tokio_util::sync::CancellationToken;

fn grouped_raw_materials() -> Catalog {
    let mut stocks = Vec::new();
    for (row, raw) in (1..=3).zip([1, 2, 3]) {
        let mut stock = ledgers(row, Some(5), Some(0), Some(3));
        stock.raw_material_id = Some(raw);
        stocks.push(stock);
    }
    Catalog {
        raw_materials: vec![
            raw_material(1, "R-1", Some(7)),
            raw_material(2, "R-2", Some(7)),
            raw_material(3, "R-3", Some(7)),
            raw_material(4, "R-4", Some(8)),
        ],
        raw_material_groups: vec![lookup(7, "Grains"), lookup(8, "Spices")],
        stocks,
        ..Default::default()
    }
}

#[test]
fn each_raw_material_totals_its_ledgers() {
    let graph = EntityGraph::from_catalog(grouped_raw_materials());
    let aggregator = StockAggregator::new(&graph);

    for id in 1..=3 {
        let stock = aggregator.raw_material_stock(id).unwrap();
        assert_eq!(stock.total_stock, 8);
        assert_eq!(stock.raw_material_id, Some(id));
        assert_eq!(stock.code1.as_deref(), Some("MAIN"));
    }

    let missing = aggregator.raw_material_stock(4).unwrap();
    assert_eq!(missing.total_stock, 0);
    assert_eq!(missing.code1_stock, None);
}

#[test]
fn group_rollup_sums_member_totals() {
    let graph = EntityGraph::from_catalog(grouped_raw_materials());
    let aggregator = StockAggregator::new(&graph);

    let grains = aggregator.group_rollup(GroupKind::RawMaterialGroup, 7);
    assert_eq!(grains.total_stock, 24);
    assert_eq!(grains.member_count, 3);
    assert_eq!(grains.group_name.as_deref(), Some("Grains"));

    let spices = aggregator.group_rollup(GroupKind::RawMaterialGroup, 8);
    assert_eq!(spices.total_stock, 0);
    assert_eq!(spices.members_without_stock, 1);
    assert!(spices.flags.is_empty());
}

#[test]
fn semi_product_grand_total_folds_in_consuming_products() {
    let graph = bakery_graph();
    let dough = StockAggregator::new(&graph).semi_product_stock(DOUGH).unwrap();

    assert_eq!(dough.total_stock, 6);
    assert_eq!(dough.total_stock_in_box, 3.0);
    // CAKE: 15 × 2 boxes, TART: 4 × 4 boxes
    assert_eq!(dough.total_product_stock, 19);
    assert_eq!(dough.total_product_stock_in_box, 46.0);
    assert_eq!(dough.grand_total_in_box, 49.0);
}

#[test]
fn product_stock_uses_its_box_factor() {
    let graph = bakery_graph();
    let aggregator = StockAggregator::new(&graph);

    let cake = aggregator.product_stock(CAKE).unwrap();
    assert_eq!(cake.total_stock, 15);
    assert_eq!(cake.total_stock_in_box, 30.0);
    assert_eq!(cake.grand_total_in_box, cake.total_stock_in_box);

    let bread = aggregator.product_stock(BREAD).unwrap();
    assert_eq!(bread.total_stock, 0);
    assert_eq!(bread.total_stock_in_box, 0.0);

    assert!(aggregator.product_stock(999).is_err());
}

#[test]
fn overflowing_member_is_zeroed_and_flagged() {
    let mut catalog = grouped_raw_materials();
    let mut huge = ledgers(9, Some(i64::MAX), Some(1), None);
    huge.raw_material_id = Some(4);
    catalog.stocks.push(huge);
    let graph = EntityGraph::from_catalog(catalog);
    let aggregator = StockAggregator::new(&graph);

    let stock = aggregator.raw_material_stock(4).unwrap();
    assert_eq!(stock.total_stock, 0);
    assert_eq!(stock.total_stock_in_box, 0.0);
    assert_eq!(stock.grand_total_in_box, 0.0);
    assert_eq!(stock.code1_stock, Some(i64::MAX));
    assert_eq!(stock.code2_stock, Some(1));
    assert_eq!(stock.flags, vec![StockFlag::Overflow]);

    let spices = aggregator.group_rollup(GroupKind::RawMaterialGroup, 8);
    assert_eq!(spices.total_stock, 0);
    assert_eq!(spices.flags, vec![StockFlag::Overflow]);
}

#[tokio::test]
async fn concurrent_rollups_match_sequential_sums() {
    let graph = bakery_graph();
    let sequential: Vec<_> = {
        let aggregator = StockAggregator::new(&graph);
        aggregator
            .group_ids(GroupKind::RawMaterialGroup)
            .into_iter()
            .map(|id| aggregator.group_rollup(GroupKind::RawMaterialGroup, id))
            .collect()
    };

    let concurrent = rollup_groups(
        Arc::clone(&graph),
        GroupKind::RawMaterialGroup,
        3,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(concurrent, sequential);
    assert_eq!(rollup_total(&concurrent), Some(16));
}

#[tokio::test]
async fn product_group_rollup_covers_products() {
    let graph = bakery_graph();
    let rollups = rollup_groups(graph, GroupKind::ProductGroup, 1, CancellationToken::new())
        .await
        .unwrap();

    let totals: Vec<_> = rollups.iter().map(|r| (r.group_id, r.total_stock)).collect();
    assert_eq!(totals, vec![(1, 15), (2, 4), (3, 0)]);
}

#[test]
fn stock_rows_with_two_owners_are_ignored() {
    let mut catalog = grouped_raw_materials();
    let mut ambiguous = ledgers(10, Some(100), None, None);
    ambiguous.raw_material_id = Some(4);
    ambiguous.product_id = Some(1);
    catalog.stocks.push(ambiguous);
    let graph = EntityGraph::from_catalog(catalog);

    assert!(graph.stock_for(StockOwner::RawMaterial(4)).is_none());
    assert_eq!(graph.issues().len(), 1);
}
