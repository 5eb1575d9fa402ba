use metrics::counter;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::{
    config::EngineConfig,
    db::{EntityGraph, GraphSource},
    dto::{
        conversions, Detail, FilterCriteria, FilterItems, NormDetails, ProductListFilter,
        ProductListResponse, ProductWithDetails, RecipeDetails, SemiProductWithDetails,
        SpecDetails, StockDto, WebFilterResponse,
    },
    entities::{EntityId, IngredientRef, Product, RecipeOwner, StockOwner},
    errors::{ErrorResponse, ServiceError},
    services::{
        facet_filter::{collect_filter_items, FacetFilterEngine, FilterOutcome},
        recipe_resolver::{CycleReport, RecipeResolver, Requirement, ResolveMode, ResolvedBom, Usage},
        stock_aggregator::{rollup_groups, GroupKind, GroupRollup, StockAggregator},
    },
};

/// Entry point for the CRUD layer: answers detail, filter and rollup
/// requests from one shared graph snapshot.
#[derive(Clone)]
pub struct ProductQueryService {
    graph: Arc<EntityGraph>,
    config: EngineConfig,
}

impl ProductQueryService {
    pub fn new(graph: Arc<EntityGraph>, config: EngineConfig) -> Self {
        Self { graph, config }
    }

    /// Loads the whole graph from `source`.
    pub async fn load(source: &dyn GraphSource, config: EngineConfig) -> Result<Self, ServiceError> {
        let graph = EntityGraph::load(source).await?;
        Ok(Self::new(Arc::new(graph), config))
    }

    pub fn graph(&self) -> &Arc<EntityGraph> {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn resolver(&self) -> RecipeResolver<'_> {
        RecipeResolver::new(&self.graph, self.config.max_recipe_depth)
    }

    fn filter_engine(&self) -> FacetFilterEngine<'_> {
        FacetFilterEngine::new(&self.graph, &self.config)
    }

    /// Raw filter outcome, including the sort fallback report.
    pub fn filter(&self, criteria: &FilterCriteria) -> Result<FilterOutcome, ServiceError> {
        self.filter_engine().filter(criteria)
    }

    /// Paged product summaries, with full detail views when requested.
    #[instrument(skip(self, criteria))]
    pub fn web_filter(
        &self,
        criteria: &FilterCriteria,
        include_details: bool,
    ) -> Result<WebFilterResponse, ServiceError> {
        let outcome = self.filter(criteria)?;
        let page: Vec<&Product> = outcome
            .product_ids
            .iter()
            .filter_map(|id| self.graph.product(*id))
            .collect();

        let products = page
            .iter()
            .map(|p| conversions::product_summary(&self.graph, p))
            .collect();
        let products_with_details = if include_details {
            page.iter()
                .map(|p| self.product_view(p))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };

        Ok(WebFilterResponse {
            products_with_details,
            products,
            row_count: outcome.row_count,
        })
    }

    /// Facet values available over the whole filtered set, ignoring paging.
    #[instrument(skip(self, criteria))]
    pub async fn filter_items(&self, criteria: &FilterCriteria) -> Result<FilterItems, ServiceError> {
        let outcome = self.filter(criteria)?;
        collect_filter_items(
            self.graph.clone(),
            outcome.matched_ids,
            self.config.facet_chunk_size,
            self.config.rollup_workers,
        )
        .await
    }

    pub fn list_products(&self, filter: &ProductListFilter) -> Result<ProductListResponse, ServiceError> {
        let outcome = self.filter_engine().list(filter)?;
        let products = outcome
            .product_ids
            .iter()
            .filter_map(|id| self.graph.product(*id))
            .map(|p| conversions::product_summary(&self.graph, p))
            .collect();
        Ok(ProductListResponse {
            products,
            row_count: outcome.row_count,
        })
    }

    fn bom_for(&self, owner: RecipeOwner) -> (Option<ResolvedBom>, Option<ErrorResponse>) {
        if self.graph.recipe_for(owner).is_none() {
            return (None, None);
        }
        match self
            .resolver()
            .resolve(owner, Decimal::ONE, ResolveMode::MultiLevel)
        {
            Ok(bom) => (Some(bom), None),
            Err(err) => (None, Some(err.to_response())),
        }
    }

    fn product_view(&self, product: &Product) -> Result<ProductWithDetails, ServiceError> {
        let graph = &*self.graph;
        let owner = RecipeOwner::Product(product.id);
        let stock = StockAggregator::new(graph).product_stock(product.id)?;
        let recipe = graph
            .recipe_for(owner)
            .map(|r| conversions::recipe_details(graph, r, owner));
        let (bom, bom_error) = self.bom_for(owner);

        Ok(ProductWithDetails {
            product: conversions::product_summary(graph, product),
            stock,
            product_group_type_definitions: graph
                .type_definitions_for(product.id)
                .map(Into::into)
                .collect(),
            recipe,
            bom,
            bom_error,
            norms: graph
                .norms_for(product.id)
                .map(|n| conversions::norm_details(graph, n))
                .collect(),
            specs: graph
                .specs_for(product.id)
                .map(|s| conversions::spec_details(graph, s))
                .collect(),
        })
    }

    #[instrument(skip(self))]
    pub fn product_detail(&self, product_id: EntityId) -> Result<Detail<ProductWithDetails>, ServiceError> {
        match self.graph.product(product_id) {
            Some(product) => Ok(Detail::found(self.product_view(product)?)),
            None => {
                counter!("recipe_engine.detail.not_found", 1);
                Ok(Detail::not_found())
            }
        }
    }

    #[instrument(skip(self))]
    pub fn semi_product_detail(
        &self,
        semi_product_id: EntityId,
    ) -> Result<Detail<SemiProductWithDetails>, ServiceError> {
        let graph = &*self.graph;
        let Some(semi) = graph.semi_product(semi_product_id) else {
            counter!("recipe_engine.detail.not_found", 1);
            return Ok(Detail::not_found());
        };
        let owner = RecipeOwner::SemiProduct(semi_product_id);
        let (bom, bom_error) = self.bom_for(owner);

        Ok(Detail::found(SemiProductWithDetails {
            semi_product: conversions::semi_product_summary(graph, semi),
            stock: StockAggregator::new(graph).semi_product_stock(semi_product_id)?,
            recipe: graph
                .recipe_for(owner)
                .map(|r| conversions::recipe_details(graph, r, owner)),
            bom,
            bom_error,
            used_by: self
                .resolver()
                .where_used(IngredientRef::semi_product(semi_product_id))?,
        }))
    }

    pub fn resolve(
        &self,
        root: RecipeOwner,
        quantity: Decimal,
        mode: ResolveMode,
    ) -> Result<ResolvedBom, ServiceError> {
        self.resolver().resolve(root, quantity, mode)
    }

    pub fn requirements(
        &self,
        root: RecipeOwner,
        quantity: Decimal,
    ) -> Result<Vec<Requirement>, ServiceError> {
        Ok(self
            .resolve(root, quantity, ResolveMode::MultiLevel)?
            .requirements())
    }

    pub fn where_used(&self, ingredient: IngredientRef) -> Result<Vec<Usage>, ServiceError> {
        self.resolver().where_used(ingredient)
    }

    pub fn stock(&self, owner: StockOwner) -> Result<StockDto, ServiceError> {
        let aggregator = StockAggregator::new(&self.graph);
        match owner {
            StockOwner::Product(id) => aggregator.product_stock(id),
            StockOwner::SemiProduct(id) => aggregator.semi_product_stock(id),
            StockOwner::RawMaterial(id) => aggregator.raw_material_stock(id),
        }
    }

    pub async fn group_rollups(
        &self,
        kind: GroupKind,
        cancel: CancellationToken,
    ) -> Result<Vec<GroupRollup>, ServiceError> {
        rollup_groups(self.graph.clone(), kind, self.config.rollup_workers, cancel).await
    }

    pub fn recipe_details(&self, owner: RecipeOwner) -> Detail<RecipeDetails> {
        match self.graph.recipe_for(owner) {
            Some(recipe) => Detail::found(conversions::recipe_details(&self.graph, recipe, owner)),
            None => Detail::not_found(),
        }
    }

    pub fn norm_details(&self, norm_id: EntityId) -> Detail<NormDetails> {
        match self.graph.norm(norm_id) {
            Some(norm) => Detail::found(conversions::norm_details(&self.graph, norm)),
            None => Detail::not_found(),
        }
    }

    pub fn spec_details(&self, spec_id: EntityId) -> Detail<SpecDetails> {
        match self.graph.spec(spec_id) {
            Some(spec) => Detail::found(conversions::spec_details(&self.graph, spec)),
            None => Detail::not_found(),
        }
    }

    pub fn validate_graph(&self) -> Vec<CycleReport> {
        let cycles = self.resolver().validate_graph();
        info!(
            cycles = cycles.len(),
            integrity_issues = self.graph.issues().len(),
            "graph validated"
        );
        cycles
    }
}
