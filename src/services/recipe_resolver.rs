use metrics::{counter, histogram};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use strum::{Display, EnumString};
use tracing::{debug, instrument, warn};

use crate::{
    db::EntityGraph,
    entities::{EntityId, IngredientKind, IngredientRef, RecipeOwner},
    errors::ServiceError,
};

/// Whether nested semi product recipes are expanded.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum ResolveMode {
    /// Immediate recipe only.
    SingleLevel,
    #[default]
    MultiLevel,
}

/// One entry of a flattened bill of materials.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BomLine {
    pub ingredient: IngredientRef,
    pub code: String,
    pub name: String,
    /// Quantity needed for the requested root quantity.
    pub amount: Decimal,
    pub unit: Option<String>,
    /// 1 for the root's own recipe.
    pub level: u32,
    pub parent: RecipeOwner,
    pub detail_id: EntityId,
}

/// Recipe detail excluded from a resolution.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolutionIssue {
    pub recipe_id: EntityId,
    pub detail_id: EntityId,
    pub kind: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolvedBom {
    pub root: RecipeOwner,
    pub quantity: Decimal,
    pub mode: ResolveMode,
    /// Depth-first, pre-order: every semi product precedes its own ingredients.
    pub lines: Vec<BomLine>,
    pub issues: Vec<ResolutionIssue>,
}

/// Consolidated need for one ingredient across a whole BOM.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Requirement {
    pub ingredient: IngredientRef,
    pub code: String,
    pub name: String,
    pub unit: Option<String>,
    pub total_amount: Decimal,
    pub occurrences: u32,
}

impl ResolvedBom {
    /// Sums amounts per ingredient, ordered by (kind, id).
    pub fn requirements(&self) -> Vec<Requirement> {
        let mut totals: BTreeMap<IngredientRef, Requirement> = BTreeMap::new();
        for line in &self.lines {
            totals
                .entry(line.ingredient)
                .and_modify(|r| {
                    r.total_amount = r.total_amount.saturating_add(line.amount);
                    r.occurrences += 1;
                })
                .or_insert_with(|| Requirement {
                    ingredient: line.ingredient,
                    code: line.code.clone(),
                    name: line.name.clone(),
                    unit: line.unit.clone(),
                    total_amount: line.amount,
                    occurrences: 1,
                });
        }
        totals.into_values().collect()
    }

    /// Ingredient ids of the given kind present anywhere in the BOM.
    pub fn ingredient_ids(&self, kind: IngredientKind) -> HashSet<EntityId> {
        self.lines
            .iter()
            .filter(|l| l.ingredient.kind == kind)
            .map(|l| l.ingredient.id)
            .collect()
    }
}

/// Direct consumer of an ingredient.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Usage {
    pub owner: RecipeOwner,
    pub code: String,
    pub name: String,
    pub recipe_id: EntityId,
    /// Amount per one unit of the consumer, summed over its detail rows.
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CycleReport {
    pub root: RecipeOwner,
    pub node: String,
    pub depth: u32,
}

#[derive(Default)]
struct Walk {
    lines: Vec<BomLine>,
    issues: Vec<ResolutionIssue>,
    path: HashSet<RecipeOwner>,
}

impl Walk {
    fn reject(&mut self, recipe_id: EntityId, detail_id: EntityId, err: ServiceError) {
        warn!(recipe_id, detail_id, error = %err, "recipe detail excluded");
        self.issues.push(ResolutionIssue {
            recipe_id,
            detail_id,
            kind: err.kind().to_string(),
            message: err.to_string(),
        });
    }
}

/// Expands recipes over an [`EntityGraph`].
#[derive(Clone, Copy)]
pub struct RecipeResolver<'g> {
    graph: &'g EntityGraph,
    max_depth: u32,
}

impl<'g> RecipeResolver<'g> {
    pub fn new(graph: &'g EntityGraph, max_depth: u32) -> Self {
        Self { graph, max_depth }
    }

    /// Flattens the BOM of `root` scaled to `quantity` units.
    ///
    /// Invalid detail rows are reported in [`ResolvedBom::issues`] and left
    /// out. A cycle or a chain deeper than the configured limit fails the
    /// whole resolution with [`ServiceError::CycleDetected`].
    #[instrument(skip(self), fields(root = %root))]
    pub fn resolve(
        &self,
        root: RecipeOwner,
        quantity: Decimal,
        mode: ResolveMode,
    ) -> Result<ResolvedBom, ServiceError> {
        if quantity < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "quantity must not be negative, got {}",
                quantity
            )));
        }
        if !self.graph.contains(root) {
            return Err(ServiceError::NotFound(format!("{} not found", root)));
        }

        let started = Instant::now();
        let mut walk = Walk::default();
        walk.path.insert(root);

        if let Err(err) = self.expand(root, quantity, 1, mode, &mut walk) {
            if matches!(err, ServiceError::CycleDetected { .. }) {
                counter!("recipe_engine.resolver.cycles", 1);
            }
            warn!(error = %err, "recipe resolution failed");
            return Err(err);
        }

        counter!("recipe_engine.resolver.resolutions", 1);
        histogram!("recipe_engine.resolver.lines", walk.lines.len() as f64);
        histogram!(
            "recipe_engine.resolver.duration_seconds",
            started.elapsed().as_secs_f64()
        );
        debug!(
            lines = walk.lines.len(),
            issues = walk.issues.len(),
            "recipe resolved"
        );

        Ok(ResolvedBom {
            root,
            quantity,
            mode,
            lines: walk.lines,
            issues: walk.issues,
        })
    }

    fn expand(
        &self,
        owner: RecipeOwner,
        multiplier: Decimal,
        level: u32,
        mode: ResolveMode,
        walk: &mut Walk,
    ) -> Result<(), ServiceError> {
        let Some(recipe) = self.graph.recipe_for(owner) else {
            return Ok(());
        };
        if level > self.max_depth {
            return Err(ServiceError::CycleDetected {
                node: owner.to_string(),
                depth: level,
            });
        }

        for detail in self.graph.recipe_details(recipe.id) {
            let ingredient = match detail.ingredient() {
                Ok(ingredient) => ingredient,
                Err(err) => {
                    walk.reject(recipe.id, detail.id, err);
                    continue;
                }
            };
            if detail.amount < Decimal::ZERO {
                let err = ServiceError::invalid_detail(
                    detail.id,
                    format!("negative amount {}", detail.amount),
                );
                walk.reject(recipe.id, detail.id, err);
                continue;
            }
            let Some((code, name, default_unit)) = self.graph.describe_ingredient(ingredient)
            else {
                let err = ServiceError::NotFound(format!("{} not found", ingredient));
                walk.reject(recipe.id, detail.id, err);
                continue;
            };
            let Some(amount) = multiplier.checked_mul(detail.amount) else {
                let err = ServiceError::invalid_detail(detail.id, "scaled amount overflows");
                walk.reject(recipe.id, detail.id, err);
                continue;
            };

            walk.lines.push(BomLine {
                ingredient,
                code: code.to_string(),
                name: name.to_string(),
                amount,
                unit: detail
                    .unit
                    .clone()
                    .or_else(|| default_unit.map(str::to_string)),
                level,
                parent: owner,
                detail_id: detail.id,
            });

            if mode == ResolveMode::SingleLevel {
                continue;
            }
            if let Some(next) = ingredient.as_owner() {
                if !walk.path.insert(next) {
                    return Err(ServiceError::CycleDetected {
                        node: next.to_string(),
                        depth: level + 1,
                    });
                }
                self.expand(next, amount, level + 1, mode, walk)?;
                walk.path.remove(&next);
            }
        }
        Ok(())
    }

    /// Products or semi products whose recipes reference `ingredient` directly.
    #[instrument(skip(self), fields(ingredient = %ingredient))]
    pub fn where_used(&self, ingredient: IngredientRef) -> Result<Vec<Usage>, ServiceError> {
        if self.graph.describe_ingredient(ingredient).is_none() {
            return Err(ServiceError::NotFound(format!("{} not found", ingredient)));
        }

        let mut usages = Vec::new();
        for owner in self.graph.consumers_of(ingredient) {
            let (Some(recipe), Some((code, name))) =
                (self.graph.recipe_for(owner), self.graph.describe(owner))
            else {
                continue;
            };
            let amount = self
                .graph
                .recipe_details(recipe.id)
                .iter()
                .filter(|d| d.ingredient().ok() == Some(ingredient))
                .fold(Decimal::ZERO, |acc, d| acc.saturating_add(d.amount));
            usages.push(Usage {
                owner,
                code: code.to_string(),
                name: name.to_string(),
                recipe_id: recipe.id,
                amount,
            });
        }
        Ok(usages)
    }

    /// Resolves every recipe owner and collects the cycles found.
    #[instrument(skip(self))]
    pub fn validate_graph(&self) -> Vec<CycleReport> {
        let mut reports = Vec::new();
        for root in self.graph.recipe_owners() {
            if !self.graph.contains(root) {
                continue;
            }
            if let Err(ServiceError::CycleDetected { node, depth }) =
                self.resolve(root, Decimal::ONE, ResolveMode::MultiLevel)
            {
                reports.push(CycleReport { root, node, depth });
            }
        }
        if !reports.is_empty() {
            warn!(cycles = reports.len(), "recipe graph contains cycles");
        }
        reports
    }
}
