use metrics::{counter, histogram};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};
use validator::Validate;

use crate::{
    config::EngineConfig,
    db::EntityGraph,
    dto::{FilterCriteria, FilterItems, LookupDto, OrderType, ProductGroupTypeDto, ProductListFilter},
    entities::{EntityId, IngredientKind, LookupKind, Product, RecipeOwner},
    errors::ServiceError,
    services::recipe_resolver::{RecipeResolver, ResolveMode},
};

/// One independent multi-select filter dimension.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum FacetKind {
    Seller,
    Brand,
    BudgetGroup,
    SalesGroup,
    ProductionPlace,
    RawMaterialGroup,
    Packaging,
    StorageCondition,
    SalesBased,
    CuttingType,
    QualityType,
    ColorType,
    ProductStatus,
    ProductGroup,
    SemiProductGroup,
    ProductGroupTypeDefinition,
    CreatedBy,
    UpdatedBy,
}

impl FacetKind {
    /// Lookup table behind facets that reference a classification row.
    pub fn lookup_kind(self) -> Option<LookupKind> {
        match self {
            FacetKind::Seller => Some(LookupKind::Seller),
            FacetKind::Brand => Some(LookupKind::Brand),
            FacetKind::StorageCondition => Some(LookupKind::StorageCondition),
            FacetKind::ProductGroup => Some(LookupKind::ProductGroup),
            FacetKind::RawMaterialGroup => Some(LookupKind::RawMaterialGroup),
            FacetKind::SemiProductGroup => Some(LookupKind::SemiProductGroup),
            _ => None,
        }
    }

    fn attribute(self, product: &Product) -> Option<&str> {
        let value = match self {
            FacetKind::BudgetGroup => &product.budget_group,
            FacetKind::SalesGroup => &product.sales_group,
            FacetKind::ProductionPlace => &product.production_place,
            FacetKind::Packaging => &product.packaging,
            FacetKind::SalesBased => &product.sales_based,
            FacetKind::CuttingType => &product.cutting_type,
            FacetKind::QualityType => &product.quality_type,
            FacetKind::ColorType => &product.color_type,
            FacetKind::ProductStatus => &product.product_status,
            FacetKind::CreatedBy => &product.created_by,
            FacetKind::UpdatedBy => &product.updated_by,
            _ => return None,
        };
        value.as_deref()
    }
}

/// Field a result set can be ordered by.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum SortField {
    #[default]
    Id,
    Code,
    Name,
    Name2,
    Seller,
    Brand,
    ProductGroup,
    Weight,
    Volume,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    /// Absent or blank names order by id; unknown names are an error.
    pub fn parse(name: Option<&str>) -> Result<Self, ServiceError> {
        match name.map(str::trim) {
            None | Some("") => Ok(SortField::Id),
            Some(name) => SortField::from_str(name)
                .map_err(|_| ServiceError::UnknownFacetField(name.to_string())),
        }
    }
}

/// Filtered, ordered product ids plus the page selected from them.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FilterOutcome {
    /// Whole filtered set in result order.
    pub matched_ids: Vec<EntityId>,
    /// Ids of the requested page.
    pub product_ids: Vec<EntityId>,
    pub row_count: u64,
    pub sort_field: SortField,
    /// Requested order field that was not recognised.
    pub order_fallback: Option<String>,
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn compare_opt_text(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => compare_text(a, b),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

fn compare_opt_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

fn page(ids: &[EntityId], offset: Option<u64>, limit: Option<u64>) -> Vec<EntityId> {
    let offset = usize::try_from(offset.unwrap_or(0)).unwrap_or(usize::MAX);
    let limit = limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
    ids.iter().skip(offset).take(limit).copied().collect()
}

/// Accepted values of one active facet, normalized.
struct ActiveFacet {
    kind: FacetKind,
    accepted: HashSet<String>,
}

#[derive(Default)]
struct BomGroups {
    raw_material_groups: BTreeSet<EntityId>,
    semi_product_groups: BTreeSet<EntityId>,
}

/// Composes facet predicates over the products of an [`EntityGraph`].
pub struct FacetFilterEngine<'g> {
    graph: &'g EntityGraph,
    max_recipe_depth: u32,
    max_page_size: u64,
}

impl<'g> FacetFilterEngine<'g> {
    pub fn new(graph: &'g EntityGraph, config: &EngineConfig) -> Self {
        Self {
            graph,
            max_recipe_depth: config.max_recipe_depth,
            max_page_size: config.max_page_size,
        }
    }

    /// Caps a requested page size. `Some(0)` is treated as absent.
    fn clamp(&self, limit: Option<u64>) -> Option<u64> {
        limit.filter(|l| *l > 0).map(|l| l.min(self.max_page_size))
    }

    fn lookup_keys(&self, kind: LookupKind, id: Option<EntityId>, keys: &mut Vec<String>) {
        if let Some(id) = id {
            keys.push(id.to_string());
            if let Some(lookup) = self.graph.lookup(kind, id) {
                keys.push(normalize(&lookup.name));
            }
        }
    }

    /// Ingredient groups anywhere in the product's multi-level BOM. A BOM
    /// that fails to resolve contributes no groups.
    fn bom_groups(&self, product_id: EntityId) -> BomGroups {
        let resolver = RecipeResolver::new(self.graph, self.max_recipe_depth);
        let bom = match resolver.resolve(
            RecipeOwner::Product(product_id),
            Decimal::ONE,
            ResolveMode::MultiLevel,
        ) {
            Ok(bom) => bom,
            Err(err) => {
                debug!(product_id, error = %err, "BOM unavailable for group facet");
                return BomGroups::default();
            }
        };

        BomGroups {
            raw_material_groups: bom
                .ingredient_ids(IngredientKind::RawMaterial)
                .into_iter()
                .filter_map(|id| self.graph.raw_material(id)?.raw_material_group_id)
                .collect(),
            semi_product_groups: bom
                .ingredient_ids(IngredientKind::SemiProduct)
                .into_iter()
                .filter_map(|id| self.graph.semi_product(id)?.semi_product_group_id)
                .collect(),
        }
    }

    /// Normalized keys a facet value may match for this product.
    fn candidate_keys(
        &self,
        kind: FacetKind,
        product: &Product,
        bom: &mut Option<BomGroups>,
    ) -> Vec<String> {
        let mut keys = Vec::new();
        match kind {
            FacetKind::Seller => self.lookup_keys(LookupKind::Seller, product.seller_id, &mut keys),
            FacetKind::Brand => self.lookup_keys(LookupKind::Brand, product.brand_id, &mut keys),
            FacetKind::StorageCondition => self.lookup_keys(
                LookupKind::StorageCondition,
                product.storage_condition_id,
                &mut keys,
            ),
            FacetKind::ProductGroup => {
                self.lookup_keys(LookupKind::ProductGroup, product.product_group_id, &mut keys)
            }
            FacetKind::ProductGroupTypeDefinition => {
                for definition in self.graph.type_definitions_for(product.id) {
                    keys.push(definition.id.to_string());
                    keys.push(normalize(&definition.name));
                }
            }
            FacetKind::RawMaterialGroup | FacetKind::SemiProductGroup => {
                let groups = bom.get_or_insert_with(|| self.bom_groups(product.id));
                let (lookup, ids) = if kind == FacetKind::RawMaterialGroup {
                    (LookupKind::RawMaterialGroup, &groups.raw_material_groups)
                } else {
                    (LookupKind::SemiProductGroup, &groups.semi_product_groups)
                };
                for id in ids.iter().copied() {
                    self.lookup_keys(lookup, Some(id), &mut keys);
                }
            }
            other => {
                if let Some(value) = other.attribute(product) {
                    keys.push(normalize(value));
                }
            }
        }
        keys
    }

    fn active_facets(criteria: &FilterCriteria) -> Vec<ActiveFacet> {
        FacetKind::iter()
            .filter_map(|kind| {
                let accepted: HashSet<String> = criteria
                    .facet(kind)
                    .iter()
                    .map(|v| normalize(v))
                    .filter(|v| !v.is_empty())
                    .collect();
                (!accepted.is_empty()).then_some(ActiveFacet { kind, accepted })
            })
            .collect()
    }

    fn matches_text(criteria: &FilterCriteria, product: &Product) -> bool {
        let needles = [
            (criteria.code.as_deref(), Some(product.code.as_str())),
            (criteria.name.as_deref(), Some(product.name.as_str())),
            (criteria.name2.as_deref(), product.name2.as_deref()),
        ];
        let mut constrained = false;
        let mut hit = false;
        for (needle, field) in needles {
            let Some(needle) = needle.map(normalize).filter(|n| !n.is_empty()) else {
                continue;
            };
            constrained = true;
            if field.map_or(false, |f| f.to_lowercase().contains(&needle)) {
                hit = true;
            }
        }
        !constrained || hit
    }

    fn matches(&self, facets: &[ActiveFacet], criteria: &FilterCriteria, product: &Product) -> bool {
        if !Self::matches_text(criteria, product) {
            return false;
        }
        let mut bom = None;
        facets.iter().all(|facet| {
            self.candidate_keys(facet.kind, product, &mut bom)
                .iter()
                .any(|key| facet.accepted.contains(key))
        })
    }

    fn compare(&self, field: SortField, a: &Product, b: &Product) -> Ordering {
        let lookup_name = |kind: LookupKind, id: Option<EntityId>| {
            id.and_then(|id| self.graph.lookup(kind, id))
                .map(|l| l.name.as_str())
        };
        match field {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Code => compare_text(&a.code, &b.code),
            SortField::Name => compare_text(&a.name, &b.name),
            SortField::Name2 => compare_opt_text(a.name2.as_deref(), b.name2.as_deref()),
            SortField::Seller => compare_opt_text(
                lookup_name(LookupKind::Seller, a.seller_id),
                lookup_name(LookupKind::Seller, b.seller_id),
            ),
            SortField::Brand => compare_opt_text(
                lookup_name(LookupKind::Brand, a.brand_id),
                lookup_name(LookupKind::Brand, b.brand_id),
            ),
            SortField::ProductGroup => compare_opt_text(
                lookup_name(LookupKind::ProductGroup, a.product_group_id),
                lookup_name(LookupKind::ProductGroup, b.product_group_id),
            ),
            SortField::Weight => compare_opt_f64(a.weight, b.weight),
            SortField::Volume => compare_opt_f64(a.volume, b.volume),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }

    /// Runs a facet query: filter, sort, then page.
    #[instrument(skip(self, criteria))]
    pub fn filter(&self, criteria: &FilterCriteria) -> Result<FilterOutcome, ServiceError> {
        criteria.validate()?;

        let (sort_field, order_fallback) = match SortField::parse(criteria.order_by.as_deref()) {
            Ok(field) => (field, None),
            Err(err) => {
                warn!(error = %err, "ordering by id instead");
                counter!("recipe_engine.filter.order_fallbacks", 1);
                (SortField::Id, criteria.order_by.clone())
            }
        };

        let facets = Self::active_facets(criteria);
        let mut matched: Vec<&Product> = self
            .graph
            .products()
            .filter(|p| self.matches(&facets, criteria, p))
            .collect();

        let descending = criteria.order_type == OrderType::Desc;
        matched.sort_by(|a, b| {
            let ord = self.compare(sort_field, a, b);
            let ord = if descending { ord.reverse() } else { ord };
            ord.then(a.id.cmp(&b.id))
        });

        let matched_ids: Vec<EntityId> = matched.iter().map(|p| p.id).collect();
        let product_ids = page(&matched_ids, criteria.offset, self.clamp(criteria.limit));

        counter!("recipe_engine.filter.queries", 1);
        histogram!("recipe_engine.filter.matches", matched_ids.len() as f64);
        debug!(
            active_facets = facets.len(),
            matched = matched_ids.len(),
            page = product_ids.len(),
            "facet filter applied"
        );

        Ok(FilterOutcome {
            row_count: matched_ids.len() as u64,
            matched_ids,
            product_ids,
            sort_field,
            order_fallback,
        })
    }

    /// Runs an id-based list query, ordered by id.
    #[instrument(skip(self, filter))]
    pub fn list(&self, filter: &ProductListFilter) -> Result<FilterOutcome, ServiceError> {
        filter.validate()?;

        let same = |want: Option<EntityId>, have: Option<EntityId>| {
            want.map_or(true, |w| have == Some(w))
        };
        let needle = filter
            .code_or_name
            .as_deref()
            .map(normalize)
            .filter(|n| !n.is_empty());

        let matched_ids: Vec<EntityId> = self
            .graph
            .products()
            .filter(|p| {
                same(filter.seller_id, p.seller_id)
                    && same(filter.brand_id, p.brand_id)
                    && same(filter.product_group_id, p.product_group_id)
                    && same(filter.storage_condition_id, p.storage_condition_id)
                    && same(filter.product_type_id, p.product_type_id)
                    && same(filter.sku_follow_type_id, p.sku_follow_type_id)
                    && same(filter.sku_follow_unit_id, p.sku_follow_unit_id)
            })
            .filter(|p| {
                let definitions: Vec<_> = self.graph.type_definitions_for(p.id).collect();
                filter
                    .product_group_type_definition_id
                    .map_or(true, |id| definitions.iter().any(|d| d.id == id))
                    && filter
                        .product_group_type_id
                        .map_or(true, |id| {
                            definitions.iter().any(|d| d.product_group_type_id == id)
                        })
            })
            .filter(|p| {
                needle.as_ref().map_or(true, |n| {
                    p.code.to_lowercase().contains(n) || p.name.to_lowercase().contains(n)
                })
            })
            .map(|p| p.id)
            .collect();

        let product_ids = page(&matched_ids, filter.offset, self.clamp(filter.limit));
        counter!("recipe_engine.filter.list_queries", 1);

        Ok(FilterOutcome {
            row_count: matched_ids.len() as u64,
            matched_ids,
            product_ids,
            sort_field: SortField::Id,
            order_fallback: None,
        })
    }
}

/// Distinct classification ids referenced by a set of products.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterItemsAccumulator {
    product_group_types: BTreeMap<EntityId, BTreeSet<EntityId>>,
    lookups: HashMap<LookupKind, BTreeSet<EntityId>>,
}

const LISTED_LOOKUPS: [LookupKind; 7] = [
    LookupKind::Seller,
    LookupKind::Brand,
    LookupKind::ProductGroup,
    LookupKind::StorageCondition,
    LookupKind::ProductType,
    LookupKind::SkuFollowType,
    LookupKind::SkuFollowUnit,
];

impl FilterItemsAccumulator {
    pub fn add_product(&mut self, graph: &EntityGraph, product: &Product) {
        let referenced = [
            (LookupKind::Seller, product.seller_id),
            (LookupKind::Brand, product.brand_id),
            (LookupKind::ProductGroup, product.product_group_id),
            (LookupKind::StorageCondition, product.storage_condition_id),
            (LookupKind::ProductType, product.product_type_id),
            (LookupKind::SkuFollowType, product.sku_follow_type_id),
            (LookupKind::SkuFollowUnit, product.sku_follow_unit_id),
        ];
        for (kind, id) in referenced {
            if let Some(id) = id {
                self.lookups.entry(kind).or_default().insert(id);
            }
        }
        for definition in graph.type_definitions_for(product.id) {
            self.product_group_types
                .entry(definition.product_group_type_id)
                .or_default()
                .insert(definition.id);
        }
    }

    /// Set union with another partial result.
    pub fn merge(&mut self, other: FilterItemsAccumulator) {
        for (type_id, definitions) in other.product_group_types {
            self.product_group_types
                .entry(type_id)
                .or_default()
                .extend(definitions);
        }
        for (kind, ids) in other.lookups {
            self.lookups.entry(kind).or_default().extend(ids);
        }
    }

    /// Resolves ids to names, dropping ids with no lookup row.
    pub fn into_items(self, graph: &EntityGraph) -> FilterItems {
        let named = |kind: LookupKind| -> Vec<LookupDto> {
            self.lookups
                .get(&kind)
                .into_iter()
                .flatten()
                .filter_map(|id| graph.lookup(kind, *id))
                .map(LookupDto::from)
                .collect()
        };

        let mut items = FilterItems::default();
        for kind in LISTED_LOOKUPS {
            let values = named(kind);
            match kind {
                LookupKind::Seller => items.sellers = values,
                LookupKind::Brand => items.brands = values,
                LookupKind::ProductGroup => items.product_groups = values,
                LookupKind::StorageCondition => items.storage_conditions = values,
                LookupKind::ProductType => items.product_types = values,
                LookupKind::SkuFollowType => items.sku_follow_types = values,
                LookupKind::SkuFollowUnit => items.sku_follow_units = values,
                _ => {}
            }
        }
        items.product_group_types = self
            .product_group_types
            .iter()
            .filter_map(|(type_id, definitions)| {
                let group_type = graph.lookup(LookupKind::ProductGroupType, *type_id)?;
                let definitions = definitions
                    .iter()
                    .filter_map(|id| graph.type_definition(*id))
                    .map(LookupDto::from)
                    .collect();
                Some(ProductGroupTypeDto::new(group_type, definitions))
            })
            .collect();
        items
    }
}

/// Builds [`FilterItems`] for `product_ids`, one task per chunk, at most
/// `workers` chunks at a time.
#[instrument(skip(graph, product_ids), fields(products = product_ids.len()))]
pub async fn collect_filter_items(
    graph: Arc<EntityGraph>,
    product_ids: Vec<EntityId>,
    chunk_size: usize,
    workers: usize,
) -> Result<FilterItems, ServiceError> {
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();

    for chunk in product_ids.chunks(chunk_size.max(1)) {
        let chunk = chunk.to_vec();
        let graph = graph.clone();
        let permits = permits.clone();
        tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| ServiceError::InternalError(format!("facet pool closed: {}", e)))?;
            let mut partial = FilterItemsAccumulator::default();
            for id in chunk {
                if let Some(product) = graph.product(id) {
                    partial.add_product(&graph, product);
                }
            }
            Ok::<_, ServiceError>(partial)
        });
    }

    let mut merged = FilterItemsAccumulator::default();
    while let Some(joined) = tasks.join_next().await {
        let partial = joined
            .map_err(|e| ServiceError::InternalError(format!("facet task failed: {}", e)))??;
        merged.merge(partial);
    }
    Ok(merged.into_items(&graph))
}
