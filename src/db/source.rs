//! Data-access capability the engine loads its graph through.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entities::{
    EntityId, Lookup, LookupKind, Norm, NormDetail, Product, ProductGroupTypeDefinition,
    ProductToProductGroupTypeDefinition, RawMaterial, Recipe, RecipeDetail, SemiProduct, Spec,
    SpecDetail, Stock,
};
use crate::errors::ServiceError;

/// Table a record is fetched from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Product,
    SemiProduct,
    RawMaterial,
    Recipe,
    RecipeDetail,
    Stock,
    Norm,
    NormDetail,
    Spec,
    SpecDetail,
    Lookup(LookupKind),
    ProductGroupTypeDefinition,
    ProductTypeDefinitionLink,
}

impl EntityKind {
    pub fn all() -> Vec<EntityKind> {
        use strum::IntoEnumIterator;

        let mut kinds = vec![
            EntityKind::Product,
            EntityKind::SemiProduct,
            EntityKind::RawMaterial,
            EntityKind::Recipe,
            EntityKind::RecipeDetail,
            EntityKind::Stock,
            EntityKind::Norm,
            EntityKind::NormDetail,
            EntityKind::Spec,
            EntityKind::SpecDetail,
            EntityKind::ProductGroupTypeDefinition,
            EntityKind::ProductTypeDefinitionLink,
        ];
        kinds.extend(LookupKind::iter().map(EntityKind::Lookup));
        kinds
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Lookup(kind) => write!(f, "{}", kind),
            other => write!(f, "{:?}", other),
        }
    }
}

/// One row of any entity table.
#[derive(Clone, Debug, PartialEq)]
pub enum EntityRecord {
    Product(Product),
    SemiProduct(SemiProduct),
    RawMaterial(RawMaterial),
    Recipe(Recipe),
    RecipeDetail(RecipeDetail),
    Stock(Stock),
    Norm(Norm),
    NormDetail(NormDetail),
    Spec(Spec),
    SpecDetail(SpecDetail),
    Lookup(LookupKind, Lookup),
    ProductGroupTypeDefinition(ProductGroupTypeDefinition),
    ProductTypeDefinitionLink(ProductToProductGroupTypeDefinition),
}

impl EntityRecord {
    /// Primary key. Link rows have none of their own and are keyed by product.
    pub fn id(&self) -> EntityId {
        match self {
            EntityRecord::Product(r) => r.id,
            EntityRecord::SemiProduct(r) => r.id,
            EntityRecord::RawMaterial(r) => r.id,
            EntityRecord::Recipe(r) => r.id,
            EntityRecord::RecipeDetail(r) => r.id,
            EntityRecord::Stock(r) => r.id,
            EntityRecord::Norm(r) => r.id,
            EntityRecord::NormDetail(r) => r.id,
            EntityRecord::Spec(r) => r.id,
            EntityRecord::SpecDetail(r) => r.id,
            EntityRecord::Lookup(_, r) => r.id,
            EntityRecord::ProductGroupTypeDefinition(r) => r.id,
            EntityRecord::ProductTypeDefinitionLink(r) => r.product_id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRecord::Product(_) => EntityKind::Product,
            EntityRecord::SemiProduct(_) => EntityKind::SemiProduct,
            EntityRecord::RawMaterial(_) => EntityKind::RawMaterial,
            EntityRecord::Recipe(_) => EntityKind::Recipe,
            EntityRecord::RecipeDetail(_) => EntityKind::RecipeDetail,
            EntityRecord::Stock(_) => EntityKind::Stock,
            EntityRecord::Norm(_) => EntityKind::Norm,
            EntityRecord::NormDetail(_) => EntityKind::NormDetail,
            EntityRecord::Spec(_) => EntityKind::Spec,
            EntityRecord::SpecDetail(_) => EntityKind::SpecDetail,
            EntityRecord::Lookup(kind, _) => EntityKind::Lookup(*kind),
            EntityRecord::ProductGroupTypeDefinition(_) => EntityKind::ProductGroupTypeDefinition,
            EntityRecord::ProductTypeDefinitionLink(_) => EntityKind::ProductTypeDefinitionLink,
        }
    }
}

pub type RecordPredicate<'a> = dyn Fn(&EntityRecord) -> bool + Send + Sync + 'a;

/// Narrow read capability over the entity tables.
///
/// Only `fetch_all` is required; stores that can push filtering down should
/// override `fetch_where` and `fetch_by_id`.
#[async_trait]
pub trait GraphSource: Send + Sync {
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<EntityRecord>, ServiceError>;

    async fn fetch_where(
        &self,
        kind: EntityKind,
        predicate: &RecordPredicate<'_>,
    ) -> Result<Vec<EntityRecord>, ServiceError> {
        let records = self.fetch_all(kind).await?;
        Ok(records.into_iter().filter(|r| predicate(r)).collect())
    }

    async fn fetch_by_id(
        &self,
        kind: EntityKind,
        id: EntityId,
    ) -> Result<Option<EntityRecord>, ServiceError> {
        let by_id = move |r: &EntityRecord| r.id() == id;
        let records = self.fetch_where(kind, &by_id).await?;
        Ok(records.into_iter().next())
    }
}

/// In-memory snapshot of every table, as exported by the CRUD layer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Catalog {
    pub products: Vec<Product>,
    pub semi_products: Vec<SemiProduct>,
    pub raw_materials: Vec<RawMaterial>,
    pub recipes: Vec<Recipe>,
    pub recipe_details: Vec<RecipeDetail>,
    pub stocks: Vec<Stock>,
    pub norms: Vec<Norm>,
    pub norm_details: Vec<NormDetail>,
    pub specs: Vec<Spec>,
    pub spec_details: Vec<SpecDetail>,

    pub sellers: Vec<Lookup>,
    pub brands: Vec<Lookup>,
    pub product_groups: Vec<Lookup>,
    pub storage_conditions: Vec<Lookup>,
    pub product_types: Vec<Lookup>,
    #[serde(rename = "SKUFollowTypes")]
    pub sku_follow_types: Vec<Lookup>,
    #[serde(rename = "SKUFollowUnits")]
    pub sku_follow_units: Vec<Lookup>,
    pub product_group_types: Vec<Lookup>,
    pub raw_material_groups: Vec<Lookup>,
    pub semi_product_groups: Vec<Lookup>,
    pub product_group_type_definitions: Vec<ProductGroupTypeDefinition>,
    pub product_to_product_group_type_definitions: Vec<ProductToProductGroupTypeDefinition>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, ServiceError> {
        serde_json::from_str(json)
            .map_err(|e| ServiceError::DataAccess(format!("invalid catalog snapshot: {}", e)))
    }

    pub fn lookups(&self, kind: LookupKind) -> &[Lookup] {
        match kind {
            LookupKind::Seller => &self.sellers,
            LookupKind::Brand => &self.brands,
            LookupKind::ProductGroup => &self.product_groups,
            LookupKind::StorageCondition => &self.storage_conditions,
            LookupKind::ProductType => &self.product_types,
            LookupKind::SkuFollowType => &self.sku_follow_types,
            LookupKind::SkuFollowUnit => &self.sku_follow_units,
            LookupKind::ProductGroupType => &self.product_group_types,
            LookupKind::RawMaterialGroup => &self.raw_material_groups,
            LookupKind::SemiProductGroup => &self.semi_product_groups,
        }
    }

    fn lookups_mut(&mut self, kind: LookupKind) -> &mut Vec<Lookup> {
        match kind {
            LookupKind::Seller => &mut self.sellers,
            LookupKind::Brand => &mut self.brands,
            LookupKind::ProductGroup => &mut self.product_groups,
            LookupKind::StorageCondition => &mut self.storage_conditions,
            LookupKind::ProductType => &mut self.product_types,
            LookupKind::SkuFollowType => &mut self.sku_follow_types,
            LookupKind::SkuFollowUnit => &mut self.sku_follow_units,
            LookupKind::ProductGroupType => &mut self.product_group_types,
            LookupKind::RawMaterialGroup => &mut self.raw_material_groups,
            LookupKind::SemiProductGroup => &mut self.semi_product_groups,
        }
    }

    /// Adds a fetched record to the table it came from.
    pub fn insert(&mut self, record: EntityRecord) {
        match record {
            EntityRecord::Product(r) => self.products.push(r),
            EntityRecord::SemiProduct(r) => self.semi_products.push(r),
            EntityRecord::RawMaterial(r) => self.raw_materials.push(r),
            EntityRecord::Recipe(r) => self.recipes.push(r),
            EntityRecord::RecipeDetail(r) => self.recipe_details.push(r),
            EntityRecord::Stock(r) => self.stocks.push(r),
            EntityRecord::Norm(r) => self.norms.push(r),
            EntityRecord::NormDetail(r) => self.norm_details.push(r),
            EntityRecord::Spec(r) => self.specs.push(r),
            EntityRecord::SpecDetail(r) => self.spec_details.push(r),
            EntityRecord::Lookup(kind, r) => self.lookups_mut(kind).push(r),
            EntityRecord::ProductGroupTypeDefinition(r) => {
                self.product_group_type_definitions.push(r)
            }
            EntityRecord::ProductTypeDefinitionLink(r) => {
                self.product_to_product_group_type_definitions.push(r)
            }
        }
    }

    pub fn records(&self, kind: EntityKind) -> Vec<EntityRecord> {
        fn wrap<T: Clone>(rows: &[T], f: impl Fn(T) -> EntityRecord) -> Vec<EntityRecord> {
            rows.iter().cloned().map(f).collect()
        }

        match kind {
            EntityKind::Product => wrap(&self.products, EntityRecord::Product),
            EntityKind::SemiProduct => wrap(&self.semi_products, EntityRecord::SemiProduct),
            EntityKind::RawMaterial => wrap(&self.raw_materials, EntityRecord::RawMaterial),
            EntityKind::Recipe => wrap(&self.recipes, EntityRecord::Recipe),
            EntityKind::RecipeDetail => wrap(&self.recipe_details, EntityRecord::RecipeDetail),
            EntityKind::Stock => wrap(&self.stocks, EntityRecord::Stock),
            EntityKind::Norm => wrap(&self.norms, EntityRecord::Norm),
            EntityKind::NormDetail => wrap(&self.norm_details, EntityRecord::NormDetail),
            EntityKind::Spec => wrap(&self.specs, EntityRecord::Spec),
            EntityKind::SpecDetail => wrap(&self.spec_details, EntityRecord::SpecDetail),
            EntityKind::Lookup(kind) => wrap(self.lookups(kind), |r| EntityRecord::Lookup(kind, r)),
            EntityKind::ProductGroupTypeDefinition => wrap(
                &self.product_group_type_definitions,
                EntityRecord::ProductGroupTypeDefinition,
            ),
            EntityKind::ProductTypeDefinitionLink => wrap(
                &self.product_to_product_group_type_definitions,
                EntityRecord::ProductTypeDefinitionLink,
            ),
        }
    }
}

impl FromIterator<EntityRecord> for Catalog {
    fn from_iter<I: IntoIterator<Item = EntityRecord>>(iter: I) -> Self {
        let mut catalog = Catalog::default();
        for record in iter {
            catalog.insert(record);
        }
        catalog
    }
}

#[async_trait]
impl GraphSource for Catalog {
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<EntityRecord>, ServiceError> {
        Ok(self.records(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog {
            raw_materials: vec![
                RawMaterial {
                    id: 1,
                    code: "RM-1".into(),
                    ..Default::default()
                },
                RawMaterial {
                    id: 2,
                    code: "RM-2".into(),
                    ..Default::default()
                },
            ],
            brands: vec![Lookup {
                id: 7,
                name: "Brand A".into(),
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn default_fetches_filter_fetch_all() {
        let source = catalog();

        let found = source
            .fetch_by_id(EntityKind::RawMaterial, 2)
            .await
            .unwrap()
            .expect("raw material 2");
        assert_eq!(found.id(), 2);
        assert_eq!(found.kind(), EntityKind::RawMaterial);

        assert!(source
            .fetch_by_id(EntityKind::RawMaterial, 99)
            .await
            .unwrap()
            .is_none());

        let brands = source
            .fetch_where(EntityKind::Lookup(LookupKind::Brand), &|r: &EntityRecord| {
                r.id() == 7
            })
            .await
            .unwrap();
        assert_eq!(brands.len(), 1);
    }

    #[test]
    fn catalog_rebuilds_from_records() {
        let source = catalog();
        let rebuilt: Catalog = EntityKind::all()
            .into_iter()
            .flat_map(|kind| source.records(kind))
            .collect();
        assert_eq!(rebuilt.raw_materials, source.raw_materials);
        assert_eq!(rebuilt.brands, source.brands);
    }

    #[test]
    fn snapshot_parses_pascal_case_json() {
        let json = r#"{
            "Products": [{"Id": 1, "Code": "P-1", "Name": "Cake", "SKUFollowTypeId": 3}],
            "SKUFollowTypes": [{"Id": 3, "Name": "Piece"}]
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.products[0].sku_follow_type_id, Some(3));
        assert_eq!(catalog.lookups(LookupKind::SkuFollowType)[0].name, "Piece");

        assert!(matches!(
            Catalog::from_json("{not json"),
            Err(ServiceError::DataAccess(_))
        ));
    }
}
