use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::source::{Catalog, EntityKind, EntityRecord, GraphSource};
use crate::entities::{
    EntityId, IngredientRef, Lookup, LookupKind, Norm, NormDetail, Product,
    ProductGroupTypeDefinition, RawMaterial, Recipe, RecipeDetail, RecipeOwner, SemiProduct,
    Spec, SpecDetail, Stock, StockOwner,
};
use crate::errors::ServiceError;

/// Row excluded from the index because it breaks an ownership rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GraphIssue {
    #[serde(serialize_with = "serialize_kind")]
    pub kind: EntityKind,
    pub id: EntityId,
    pub message: String,
}

fn serialize_kind<S: serde::Serializer>(kind: &EntityKind, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(kind)
}

/// Read-only, id-indexed view over one snapshot of the entity tables.
///
/// Ordered maps keep every listing in primary key order. Derived indices
/// replace the navigation properties of the CRUD layer: recipe by owner,
/// details by recipe, stock by owner and the reverse "consumed by" index.
#[derive(Debug, Default)]
pub struct EntityGraph {
    products: BTreeMap<EntityId, Product>,
    semi_products: BTreeMap<EntityId, SemiProduct>,
    raw_materials: BTreeMap<EntityId, RawMaterial>,
    recipes: BTreeMap<EntityId, Recipe>,
    stocks: BTreeMap<EntityId, Stock>,
    norms: BTreeMap<EntityId, Norm>,
    specs: BTreeMap<EntityId, Spec>,
    lookups: HashMap<LookupKind, BTreeMap<EntityId, Lookup>>,
    type_definitions: BTreeMap<EntityId, ProductGroupTypeDefinition>,

    recipe_by_owner: HashMap<RecipeOwner, EntityId>,
    details_by_recipe: HashMap<EntityId, Vec<RecipeDetail>>,
    stock_by_owner: HashMap<StockOwner, EntityId>,
    type_defs_by_product: HashMap<EntityId, BTreeSet<EntityId>>,
    consumers: HashMap<IngredientRef, BTreeSet<RecipeOwner>>,
    norms_by_product: HashMap<EntityId, Vec<EntityId>>,
    specs_by_product: HashMap<EntityId, Vec<EntityId>>,
    norm_details: HashMap<EntityId, Vec<NormDetail>>,
    spec_details: HashMap<EntityId, Vec<SpecDetail>>,

    issues: Vec<GraphIssue>,
}

impl EntityGraph {
    pub fn from_catalog(catalog: Catalog) -> Self {
        let mut graph = EntityGraph::default();

        graph.products = catalog.products.into_iter().map(|p| (p.id, p)).collect();
        graph.semi_products = catalog.semi_products.into_iter().map(|s| (s.id, s)).collect();
        graph.raw_materials = catalog.raw_materials.into_iter().map(|r| (r.id, r)).collect();

        let lookup_tables = [
            (LookupKind::Seller, catalog.sellers),
            (LookupKind::Brand, catalog.brands),
            (LookupKind::ProductGroup, catalog.product_groups),
            (LookupKind::StorageCondition, catalog.storage_conditions),
            (LookupKind::ProductType, catalog.product_types),
            (LookupKind::SkuFollowType, catalog.sku_follow_types),
            (LookupKind::SkuFollowUnit, catalog.sku_follow_units),
            (LookupKind::ProductGroupType, catalog.product_group_types),
            (LookupKind::RawMaterialGroup, catalog.raw_material_groups),
            (LookupKind::SemiProductGroup, catalog.semi_product_groups),
        ];
        for (kind, rows) in lookup_tables {
            graph
                .lookups
                .insert(kind, rows.into_iter().map(|l| (l.id, l)).collect());
        }
        graph.type_definitions = catalog
            .product_group_type_definitions
            .into_iter()
            .map(|d| (d.id, d))
            .collect();
        for link in catalog.product_to_product_group_type_definitions {
            graph
                .type_defs_by_product
                .entry(link.product_id)
                .or_default()
                .insert(link.product_group_type_definition_id);
        }

        graph.index_recipes(catalog.recipes, catalog.recipe_details);
        graph.index_stocks(catalog.stocks);
        graph.index_quality(
            catalog.norms,
            catalog.norm_details,
            catalog.specs,
            catalog.spec_details,
        );

        for issue in &graph.issues {
            warn!(kind = %issue.kind, id = issue.id, "{}", issue.message);
        }
        debug!(
            products = graph.products.len(),
            semi_products = graph.semi_products.len(),
            raw_materials = graph.raw_materials.len(),
            recipes = graph.recipe_by_owner.len(),
            issues = graph.issues.len(),
            "entity graph indexed"
        );
        graph
    }

    /// Loads every table from `source` and indexes it.
    #[instrument(skip(source))]
    pub async fn load(source: &dyn GraphSource) -> Result<Self, ServiceError> {
        let mut catalog = Catalog::default();
        for kind in EntityKind::all() {
            for record in source.fetch_all(kind).await? {
                catalog.insert(record);
            }
        }
        let graph = Self::from_catalog(catalog);
        info!(products = graph.products.len(), "entity graph loaded");
        Ok(graph)
    }

    /// Loads only what resolving and aggregating `root` needs: the recipe
    /// closure below it, the products consuming it, their stock, the root's
    /// quality sheets and the lookup tables.
    #[instrument(skip(source), fields(root = %root))]
    pub async fn load_for_root(
        source: &dyn GraphSource,
        root: RecipeOwner,
    ) -> Result<Self, ServiceError> {
        let mut catalog = Catalog::default();

        let root_record = match root {
            RecipeOwner::Product(id) => source.fetch_by_id(EntityKind::Product, id).await?,
            RecipeOwner::SemiProduct(id) => source.fetch_by_id(EntityKind::SemiProduct, id).await?,
        };
        let Some(root_record) = root_record else {
            return Err(ServiceError::NotFound(format!("{} not found", root)));
        };
        catalog.insert(root_record);

        let mut seen: HashSet<RecipeOwner> = HashSet::from([root]);
        let mut stock_owners: HashSet<StockOwner> = HashSet::from([stock_owner_of(root)]);
        let mut queue = VecDeque::from([root]);

        while let Some(owner) = queue.pop_front() {
            let by_owner = move |r: &EntityRecord| match r {
                EntityRecord::Recipe(recipe) => recipe.owner().ok() == Some(owner),
                _ => false,
            };
            for recipe in source.fetch_where(EntityKind::Recipe, &by_owner).await? {
                let recipe_id = recipe.id();
                catalog.insert(recipe);

                let by_recipe = move |r: &EntityRecord| {
                    matches!(r, EntityRecord::RecipeDetail(d) if d.recipe_id == recipe_id)
                };
                for detail in source.fetch_where(EntityKind::RecipeDetail, &by_recipe).await? {
                    if let EntityRecord::RecipeDetail(d) = &detail {
                        if let Ok(ingredient) = d.ingredient() {
                            match ingredient.as_owner() {
                                Some(next) if seen.insert(next) => {
                                    if let Some(r) = source
                                        .fetch_by_id(EntityKind::SemiProduct, ingredient.id)
                                        .await?
                                    {
                                        catalog.insert(r);
                                    }
                                    stock_owners.insert(StockOwner::SemiProduct(ingredient.id));
                                    queue.push_back(next);
                                }
                                Some(_) => {}
                                None => {
                                    if stock_owners.insert(StockOwner::RawMaterial(ingredient.id)) {
                                        if let Some(r) = source
                                            .fetch_by_id(EntityKind::RawMaterial, ingredient.id)
                                            .await?
                                        {
                                            catalog.insert(r);
                                        }
                                    }
                                }
                            }
                        }
                    }
                    catalog.insert(detail);
                }
            }
        }

        match root {
            RecipeOwner::SemiProduct(id) => {
                for product in load_consumers(source, &mut catalog, id).await? {
                    stock_owners.insert(StockOwner::Product(product));
                }
            }
            RecipeOwner::Product(id) => load_quality(source, &mut catalog, id).await?,
        }

        let owned = move |r: &EntityRecord| match r {
            EntityRecord::Stock(s) => s.owner().map_or(false, |o| stock_owners.contains(&o)),
            _ => false,
        };
        for stock in source.fetch_where(EntityKind::Stock, &owned).await? {
            catalog.insert(stock);
        }

        for kind in EntityKind::all() {
            if matches!(
                kind,
                EntityKind::Lookup(_) | EntityKind::ProductGroupTypeDefinition
            ) {
                for record in source.fetch_all(kind).await? {
                    catalog.insert(record);
                }
            }
        }
        if let RecipeOwner::Product(id) = root {
            let links = move |r: &EntityRecord| {
                matches!(r, EntityRecord::ProductTypeDefinitionLink(l) if l.product_id == id)
            };
            for link in source
                .fetch_where(EntityKind::ProductTypeDefinitionLink, &links)
                .await?
            {
                catalog.insert(link);
            }
        }

        Ok(Self::from_catalog(catalog))
    }

    fn index_recipes(&mut self, recipes: Vec<Recipe>, details: Vec<RecipeDetail>) {
        let mut recipes = recipes;
        recipes.sort_by_key(|r| r.id);
        for recipe in recipes {
            let owner = match recipe.owner() {
                Ok(owner) => owner,
                Err(message) => {
                    self.issue(EntityKind::Recipe, recipe.id, message);
                    continue;
                }
            };
            if let Some(existing) = self.recipe_by_owner.get(&owner) {
                let message = format!("{} already owns recipe {}", owner, existing);
                self.issue(EntityKind::Recipe, recipe.id, message);
                continue;
            }
            self.recipe_by_owner.insert(owner, recipe.id);
            self.recipes.insert(recipe.id, recipe);
        }

        for detail in details {
            let Some(recipe) = self.recipes.get(&detail.recipe_id) else {
                let message = format!("recipe {} is not indexed", detail.recipe_id);
                self.issue(EntityKind::RecipeDetail, detail.id, message);
                continue;
            };
            if let (Ok(ingredient), Ok(owner)) = (detail.ingredient(), recipe.owner()) {
                self.consumers.entry(ingredient).or_default().insert(owner);
            }
            self.details_by_recipe
                .entry(detail.recipe_id)
                .or_default()
                .push(detail);
        }
        for rows in self.details_by_recipe.values_mut() {
            rows.sort_by_key(|d| (d.sequence.unwrap_or(i32::MAX), d.id));
        }
    }

    fn index_stocks(&mut self, stocks: Vec<Stock>) {
        let mut stocks = stocks;
        stocks.sort_by_key(|s| s.id);
        for stock in stocks {
            let Some(owner) = stock.owner() else {
                self.issue(EntityKind::Stock, stock.id, "stock row must have exactly one owner");
                continue;
            };
            if self.stock_by_owner.contains_key(&owner) {
                let message = format!("second stock row for {:?}", owner);
                self.issue(EntityKind::Stock, stock.id, message);
                continue;
            }
            self.stock_by_owner.insert(owner, stock.id);
            self.stocks.insert(stock.id, stock);
        }
    }

    fn index_quality(
        &mut self,
        norms: Vec<Norm>,
        norm_details: Vec<NormDetail>,
        specs: Vec<Spec>,
        spec_details: Vec<SpecDetail>,
    ) {
        self.norms = norms.into_iter().map(|n| (n.id, n)).collect();
        self.specs = specs.into_iter().map(|s| (s.id, s)).collect();
        for norm in self.norms.values() {
            self.norms_by_product
                .entry(norm.product_id)
                .or_default()
                .push(norm.id);
        }
        for spec in self.specs.values() {
            self.specs_by_product
                .entry(spec.product_id)
                .or_default()
                .push(spec.id);
        }
        for detail in norm_details {
            self.norm_details.entry(detail.norm_id).or_default().push(detail);
        }
        for detail in spec_details {
            self.spec_details.entry(detail.spec_id).or_default().push(detail);
        }
        for rows in self.norm_details.values_mut() {
            rows.sort_by_key(|d| (d.sequence.unwrap_or(i32::MAX), d.id));
        }
        for rows in self.spec_details.values_mut() {
            rows.sort_by_key(|d| (d.sequence.unwrap_or(i32::MAX), d.id));
        }
    }

    fn issue(&mut self, kind: EntityKind, id: EntityId, message: impl Into<String>) {
        self.issues.push(GraphIssue {
            kind,
            id,
            message: message.into(),
        });
    }

    pub fn issues(&self) -> &[GraphIssue] {
        &self.issues
    }

    pub fn product(&self, id: EntityId) -> Option<&Product> {
        self.products.get(&id)
    }

    pub fn products(&self) -> impl Iterator<Item = &Product> + '_ {
        self.products.values()
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    pub fn semi_product(&self, id: EntityId) -> Option<&SemiProduct> {
        self.semi_products.get(&id)
    }

    pub fn semi_products(&self) -> impl Iterator<Item = &SemiProduct> + '_ {
        self.semi_products.values()
    }

    pub fn raw_material(&self, id: EntityId) -> Option<&RawMaterial> {
        self.raw_materials.get(&id)
    }

    pub fn raw_materials(&self) -> impl Iterator<Item = &RawMaterial> + '_ {
        self.raw_materials.values()
    }

    pub fn contains(&self, owner: RecipeOwner) -> bool {
        match owner {
            RecipeOwner::Product(id) => self.products.contains_key(&id),
            RecipeOwner::SemiProduct(id) => self.semi_products.contains_key(&id),
        }
    }

    /// Code and name of a recipe owner.
    pub fn describe(&self, owner: RecipeOwner) -> Option<(&str, &str)> {
        match owner {
            RecipeOwner::Product(id) => self.product(id).map(|p| (p.code.as_str(), p.name.as_str())),
            RecipeOwner::SemiProduct(id) => self
                .semi_product(id)
                .map(|s| (s.code.as_str(), s.name.as_str())),
        }
    }

    /// Code, name and default unit of an ingredient.
    pub fn describe_ingredient(
        &self,
        ingredient: IngredientRef,
    ) -> Option<(&str, &str, Option<&str>)> {
        use crate::entities::IngredientKind;

        match ingredient.kind {
            IngredientKind::RawMaterial => self
                .raw_material(ingredient.id)
                .map(|r| (r.code.as_str(), r.name.as_str(), r.unit.as_deref())),
            IngredientKind::SemiProduct => self
                .semi_product(ingredient.id)
                .map(|s| (s.code.as_str(), s.name.as_str(), s.unit.as_deref())),
        }
    }

    pub fn recipe_for(&self, owner: RecipeOwner) -> Option<&Recipe> {
        self.recipe_by_owner
            .get(&owner)
            .and_then(|id| self.recipes.get(id))
    }

    /// Every owner with an indexed recipe, in (kind, id) order.
    pub fn recipe_owners(&self) -> Vec<RecipeOwner> {
        let mut owners: Vec<_> = self.recipe_by_owner.keys().copied().collect();
        owners.sort();
        owners
    }

    /// Detail rows of a recipe ordered by sequence, then id.
    pub fn recipe_details(&self, recipe_id: EntityId) -> &[RecipeDetail] {
        self.details_by_recipe
            .get(&recipe_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn stock_for(&self, owner: StockOwner) -> Option<&Stock> {
        self.stock_by_owner
            .get(&owner)
            .and_then(|id| self.stocks.get(id))
    }

    /// Recipe owners whose recipe references `ingredient` directly.
    pub fn consumers_of(&self, ingredient: IngredientRef) -> impl Iterator<Item = RecipeOwner> + '_ {
        self.consumers
            .get(&ingredient)
            .into_iter()
            .flat_map(|owners| owners.iter().copied())
    }

    pub fn lookup(&self, kind: LookupKind, id: EntityId) -> Option<&Lookup> {
        self.lookups.get(&kind).and_then(|rows| rows.get(&id))
    }

    pub fn lookups(&self, kind: LookupKind) -> impl Iterator<Item = &Lookup> + '_ {
        self.lookups
            .get(&kind)
            .into_iter()
            .flat_map(|rows| rows.values())
    }

    pub fn type_definition(&self, id: EntityId) -> Option<&ProductGroupTypeDefinition> {
        self.type_definitions.get(&id)
    }

    /// Type definitions linked to a product, in id order. Dangling links are skipped.
    pub fn type_definitions_for(
        &self,
        product_id: EntityId,
    ) -> impl Iterator<Item = &ProductGroupTypeDefinition> + '_ {
        self.type_defs_by_product
            .get(&product_id)
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| self.type_definitions.get(id))
    }

    pub fn norms_for(&self, product_id: EntityId) -> impl Iterator<Item = &Norm> + '_ {
        self.norms_by_product
            .get(&product_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.norms.get(id))
    }

    pub fn norm(&self, id: EntityId) -> Option<&Norm> {
        self.norms.get(&id)
    }

    pub fn norm_details(&self, norm_id: EntityId) -> &[NormDetail] {
        self.norm_details
            .get(&norm_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn specs_for(&self, product_id: EntityId) -> impl Iterator<Item = &Spec> + '_ {
        self.specs_by_product
            .get(&product_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.specs.get(id))
    }

    pub fn spec(&self, id: EntityId) -> Option<&Spec> {
        self.specs.get(&id)
    }

    pub fn spec_details(&self, spec_id: EntityId) -> &[SpecDetail] {
        self.spec_details
            .get(&spec_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn recipe(&self, id: EntityId) -> Option<&Recipe> {
        self.recipes.get(&id)
    }
}

fn stock_owner_of(owner: RecipeOwner) -> StockOwner {
    match owner {
        RecipeOwner::Product(id) => StockOwner::Product(id),
        RecipeOwner::SemiProduct(id) => StockOwner::SemiProduct(id),
    }
}

/// Fetches the products whose recipes use `semi_product_id` directly.
async fn load_consumers(
    source: &dyn GraphSource,
    catalog: &mut Catalog,
    semi_product_id: EntityId,
) -> Result<Vec<EntityId>, ServiceError> {
    let uses = move |r: &EntityRecord| {
        matches!(r, EntityRecord::RecipeDetail(d) if d.semi_product_id == Some(semi_product_id))
    };
    let recipe_ids: BTreeSet<EntityId> = source
        .fetch_where(EntityKind::RecipeDetail, &uses)
        .await?
        .into_iter()
        .filter_map(|r| match r {
            EntityRecord::RecipeDetail(d) => Some(d.recipe_id),
            _ => None,
        })
        .collect();

    let mut product_ids = Vec::new();
    for recipe_id in recipe_ids {
        let Some(EntityRecord::Recipe(recipe)) =
            source.fetch_by_id(EntityKind::Recipe, recipe_id).await?
        else {
            continue;
        };
        let Ok(RecipeOwner::Product(product_id)) = recipe.owner() else {
            continue;
        };
        let Some(product) = source.fetch_by_id(EntityKind::Product, product_id).await? else {
            continue;
        };
        let by_recipe = move |r: &EntityRecord| {
            matches!(r, EntityRecord::RecipeDetail(d) if d.recipe_id == recipe_id)
        };
        for detail in source.fetch_where(EntityKind::RecipeDetail, &by_recipe).await? {
            catalog.insert(detail);
        }
        catalog.insert(product);
        catalog.insert(EntityRecord::Recipe(recipe));
        product_ids.push(product_id);
    }
    Ok(product_ids)
}

async fn load_quality(
    source: &dyn GraphSource,
    catalog: &mut Catalog,
    product_id: EntityId,
) -> Result<(), ServiceError> {
    let norms = move |r: &EntityRecord| matches!(r, EntityRecord::Norm(n) if n.product_id == product_id);
    let specs = move |r: &EntityRecord| matches!(r, EntityRecord::Spec(s) if s.product_id == product_id);

    let norm_ids: HashSet<EntityId> = source
        .fetch_where(EntityKind::Norm, &norms)
        .await?
        .into_iter()
        .map(|r| {
            let id = r.id();
            catalog.insert(r);
            id
        })
        .collect();
    let spec_ids: HashSet<EntityId> = source
        .fetch_where(EntityKind::Spec, &specs)
        .await?
        .into_iter()
        .map(|r| {
            let id = r.id();
            catalog.insert(r);
            id
        })
        .collect();

    let norm_rows = move |r: &EntityRecord| {
        matches!(r, EntityRecord::NormDetail(d) if norm_ids.contains(&d.norm_id))
    };
    for detail in source.fetch_where(EntityKind::NormDetail, &norm_rows).await? {
        catalog.insert(detail);
    }
    let spec_rows = move |r: &EntityRecord| {
        matches!(r, EntityRecord::SpecDetail(d) if spec_ids.contains(&d.spec_id))
    };
    for detail in source.fetch_where(EntityKind::SpecDetail, &spec_rows).await? {
        catalog.insert(detail);
    }
    Ok(())
}
