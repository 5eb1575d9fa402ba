//! Shared bakery catalog used by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use recipe_engine::{
    config::EngineConfig,
    db::{Catalog, EntityGraph},
    entities::{
        EntityId, Lookup, Norm, NormDetail, Product, ProductGroupTypeDefinition,
        ProductToProductGroupTypeDefinition, RawMaterial, Recipe, RecipeDetail, SemiProduct, Spec,
        SpecDetail, Stock,
    },
    services::ProductQueryService,
};

pub const CAKE: EntityId = 1;
pub const TART: EntityId = 2;
pub const BREAD: EntityId = 3;
pub const BUN: EntityId = 4;
pub const COOKIE: EntityId = 5;

pub const DOUGH: EntityId = 10;
pub const CREAM: EntityId = 11;

pub const FLOUR: EntityId = 100;
pub const SUGAR: EntityId = 101;
pub const BUTTER: EntityId = 102;
pub const LEMON: EntityId = 103;

pub fn lookup(id: EntityId, name: &str) -> Lookup {
    Lookup {
        id,
        name: name.to_string(),
    }
}

pub fn product(id: EntityId, code: &str, name: &str) -> Product {
    Product {
        id,
        code: code.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn semi_product(id: EntityId, code: &str, group: Option<EntityId>) -> SemiProduct {
    SemiProduct {
        id,
        code: code.to_string(),
        name: code.to_string(),
        semi_product_group_id: group,
        ..Default::default()
    }
}

pub fn raw_material(id: EntityId, code: &str, group: Option<EntityId>) -> RawMaterial {
    RawMaterial {
        id,
        code: code.to_string(),
        name: code.to_string(),
        raw_material_group_id: group,
        unit: Some("kg".to_string()),
        ..Default::default()
    }
}

pub fn product_recipe(id: EntityId, product_id: EntityId) -> Recipe {
    Recipe {
        id,
        name: format!("Recipe {}", id),
        product_id: Some(product_id),
        ..Default::default()
    }
}

pub fn semi_recipe(id: EntityId, semi_product_id: EntityId) -> Recipe {
    Recipe {
        id,
        name: format!("Recipe {}", id),
        semi_product_id: Some(semi_product_id),
        ..Default::default()
    }
}

pub fn uses_raw(id: EntityId, recipe_id: EntityId, raw: EntityId, amount: Decimal) -> RecipeDetail {
    RecipeDetail {
        id,
        recipe_id,
        raw_material_id: Some(raw),
        amount,
        sequence: Some(id as i32),
        ..Default::default()
    }
}

pub fn uses_semi(id: EntityId, recipe_id: EntityId, semi: EntityId, amount: Decimal) -> RecipeDetail {
    RecipeDetail {
        id,
        recipe_id,
        semi_product_id: Some(semi),
        amount,
        sequence: Some(id as i32),
        ..Default::default()
    }
}

pub fn ledgers(id: EntityId, code1: Option<i64>, code2: Option<i64>, code3: Option<i64>) -> Stock {
    Stock {
        id,
        code1: Some("MAIN".to_string()),
        code2: Some("COLD".to_string()),
        code3: Some("TRANSIT".to_string()),
        code1_stock: code1,
        code2_stock: code2,
        code3_stock: code3,
        ..Default::default()
    }
}

/// Five products, two semi products and four raw materials.
///
/// ```text
/// CAKE  = DOUGH×2, SUGAR×1
/// TART  = DOUGH×1, CREAM×0.25
/// BREAD = FLOUR×1.2
/// DOUGH = FLOUR×3, BUTTER×0.5
/// CREAM = LEMON×2, SUGAR×0.5
/// ```
pub fn bakery_catalog() -> Catalog {
    let mut cake = product(CAKE, "P-CAKE", "Chocolate Cake");
    cake.brand_id = Some(1);
    cake.seller_id = Some(1);
    cake.product_group_id = Some(1);
    cake.product_type_id = Some(1);
    cake.sku_follow_type_id = Some(1);
    cake.qty_in_box = Some(2.0);
    cake.budget_group = Some("Premium".to_string());
    cake.created_by = Some("alice".to_string());
    cake.weight = Some(1.5);

    let mut tart = product(TART, "P-TART", "Lemon Tart");
    tart.brand_id = Some(1);
    tart.seller_id = Some(2);
    tart.product_group_id = Some(2);
    tart.sku_follow_unit_id = Some(1);
    tart.qty_in_box = Some(4.0);
    tart.budget_group = Some("Economy".to_string());
    tart.weight = Some(0.4);

    let mut bread = product(BREAD, "P-BREAD", "Rye Bread");
    bread.brand_id = Some(2);
    bread.product_group_id = Some(3);
    bread.budget_group = Some("premium ".to_string());
    bread.weight = Some(0.8);

    let mut bun = product(BUN, "P-BUN", "Sweet Bun");
    bun.brand_id = Some(3);
    bun.weight = Some(0.4);

    let mut cookie = product(COOKIE, "P-COOKIE", "Butter Cookie");
    cookie.brand_id = Some(2);
    cookie.name2 = Some("Biscuit".to_string());

    let mut dough = semi_product(DOUGH, "S-DOUGH", Some(1));
    dough.qty_in_box = Some(0.5);
    dough.unit = Some("kg".to_string());

    let mut cake_stock = ledgers(1, Some(10), Some(5), None);
    cake_stock.product_id = Some(CAKE);
    let mut tart_stock = ledgers(2, Some(4), None, None);
    tart_stock.product_id = Some(TART);
    let mut dough_stock = ledgers(3, Some(6), Some(0), Some(0));
    dough_stock.semi_product_id = Some(DOUGH);
    let mut flour_stock = ledgers(4, Some(5), Some(0), Some(3));
    flour_stock.raw_material_id = Some(FLOUR);
    let mut sugar_stock = ledgers(5, Some(5), None, Some(3));
    sugar_stock.raw_material_id = Some(SUGAR);

    Catalog {
        products: vec![cake, tart, bread, bun, cookie],
        semi_products: vec![dough, semi_product(CREAM, "S-CREAM", Some(2))],
        raw_materials: vec![
            raw_material(FLOUR, "R-FLOUR", Some(1)),
            raw_material(SUGAR, "R-SUGAR", Some(1)),
            raw_material(BUTTER, "R-BUTTER", Some(2)),
            raw_material(LEMON, "R-LEMON", Some(3)),
        ],
        recipes: vec![
            product_recipe(1, CAKE),
            semi_recipe(2, DOUGH),
            product_recipe(3, TART),
            semi_recipe(4, CREAM),
            product_recipe(5, BREAD),
        ],
        recipe_details: vec![
            uses_semi(1, 1, DOUGH, dec!(2)),
            uses_raw(2, 1, SUGAR, dec!(1)),
            uses_raw(3, 2, FLOUR, dec!(3)),
            uses_raw(4, 2, BUTTER, dec!(0.5)),
            uses_semi(5, 3, DOUGH, dec!(1)),
            uses_semi(6, 3, CREAM, dec!(0.25)),
            uses_raw(7, 4, LEMON, dec!(2)),
            uses_raw(8, 4, SUGAR, dec!(0.5)),
            uses_raw(9, 5, FLOUR, dec!(1.2)),
        ],
        stocks: vec![cake_stock, tart_stock, dough_stock, flour_stock, sugar_stock],
        norms: vec![Norm {
            id: 1,
            name: "Cake norm".to_string(),
            product_id: CAKE,
        }],
        norm_details: vec![
            NormDetail {
                id: 2,
                norm_id: 1,
                parameter: "Moisture".to_string(),
                max_value: Some(dec!(18)),
                unit: Some("%".to_string()),
                sequence: Some(2),
                ..Default::default()
            },
            NormDetail {
                id: 1,
                norm_id: 1,
                parameter: "Weight".to_string(),
                min_value: Some(dec!(1.4)),
                target_value: Some(dec!(1.5)),
                unit: Some("kg".to_string()),
                sequence: Some(1),
                ..Default::default()
            },
        ],
        specs: vec![Spec {
            id: 1,
            name: "Cake spec".to_string(),
            product_id: CAKE,
        }],
        spec_details: vec![SpecDetail {
            id: 1,
            spec_id: 1,
            name: "Shelf life".to_string(),
            value: Some("5".to_string()),
            unit: Some("days".to_string()),
            sequence: None,
        }],
        sellers: vec![lookup(1, "North"), lookup(2, "South")],
        brands: vec![lookup(1, "Brand A"), lookup(2, "Brand B"), lookup(3, "Brand C")],
        product_groups: vec![lookup(1, "Cakes"), lookup(2, "Tarts"), lookup(3, "Breads")],
        product_types: vec![lookup(1, "Finished")],
        sku_follow_types: vec![lookup(1, "Piece")],
        sku_follow_units: vec![lookup(1, "Box")],
        product_group_types: vec![lookup(1, "Season")],
        raw_material_groups: vec![lookup(1, "Dry goods"), lookup(2, "Dairy"), lookup(3, "Fruit")],
        semi_product_groups: vec![lookup(1, "Doughs"), lookup(2, "Fillings")],
        product_group_type_definitions: vec![
            ProductGroupTypeDefinition {
                id: 1,
                name: "Summer".to_string(),
                product_group_type_id: 1,
            },
            ProductGroupTypeDefinition {
                id: 2,
                name: "Winter".to_string(),
                product_group_type_id: 1,
            },
        ],
        product_to_product_group_type_definitions: vec![
            ProductToProductGroupTypeDefinition {
                product_id: TART,
                product_group_type_definition_id: 1,
            },
            ProductToProductGroupTypeDefinition {
                product_id: CAKE,
                product_group_type_definition_id: 2,
            },
        ],
        ..Default::default()
    }
}

pub fn bakery_graph() -> Arc<EntityGraph> {
    Arc::new(EntityGraph::from_catalog(bakery_catalog()))
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        max_page_size: 50,
        rollup_workers: 2,
        facet_chunk_size: 2,
        ..Default::default()
    }
}

pub fn bakery_service() -> ProductQueryService {
    ProductQueryService::new(bakery_graph(), test_config())
}

/// Catalog whose semi products consume each other: A → B → A.
pub fn cyclic_catalog() -> Catalog {
    Catalog {
        products: vec![product(1, "P-LOOP", "Loop")],
        semi_products: vec![semi_product(10, "S-A", None), semi_product(11, "S-B", None)],
        raw_materials: vec![raw_material(100, "R-1", None)],
        recipes: vec![product_recipe(1, 1), semi_recipe(2, 10), semi_recipe(3, 11)],
        recipe_details: vec![
            uses_semi(1, 1, 10, dec!(1)),
            uses_semi(2, 2, 11, dec!(2)),
            uses_raw(3, 3, 100, dec!(1)),
            uses_semi(4, 3, 10, dec!(1)),
        ],
        ..Default::default()
    }
}
