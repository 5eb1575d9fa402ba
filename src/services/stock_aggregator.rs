use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use strum::{Display, EnumIter, EnumString};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::{
    db::EntityGraph,
    dto::StockDto,
    entities::{EntityId, IngredientRef, LookupKind, RecipeOwner, Stock, StockOwner},
    errors::ServiceError,
};

/// Marks a figure that was not computed normally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
pub enum StockFlag {
    /// A sum exceeded `i64`; the affected subtree reads as zero.
    Overflow,
    /// Skipped because the rollup was cancelled.
    Cancelled,
}

/// Classification a rollup groups members by.
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
pub enum GroupKind {
    RawMaterialGroup,
    SemiProductGroup,
    ProductGroup,
}

impl GroupKind {
    pub fn lookup_kind(self) -> LookupKind {
        match self {
            GroupKind::RawMaterialGroup => LookupKind::RawMaterialGroup,
            GroupKind::SemiProductGroup => LookupKind::SemiProductGroup,
            GroupKind::ProductGroup => LookupKind::ProductGroup,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupRollup {
    pub kind: GroupKind,
    pub group_id: EntityId,
    pub group_name: Option<String>,
    pub member_count: usize,
    pub members_without_stock: usize,
    pub total_stock: i64,
    pub flags: Vec<StockFlag>,
}

/// Sum of the three ledgers; `None` when it overflows. A missing row is zero.
pub fn total_stock(stock: Option<&Stock>) -> Option<i64> {
    match stock {
        Some(stock) => stock
            .ledgers()
            .iter()
            .try_fold(0i64, |acc, v| acc.checked_add(*v)),
        None => Some(0),
    }
}

/// Converts a unit count into boxes. An absent factor yields 0.0.
pub fn in_box(total: i64, qty_in_box: Option<f64>) -> f64 {
    total as f64 * qty_in_box.unwrap_or(0.0)
}

/// Checked sum over group totals; `None` on overflow.
pub fn rollup_total(rollups: &[GroupRollup]) -> Option<i64> {
    rollups
        .iter()
        .try_fold(0i64, |acc, r| acc.checked_add(r.total_stock))
}

/// Stock figures over an [`EntityGraph`].
#[derive(Clone, Copy)]
pub struct StockAggregator<'g> {
    graph: &'g EntityGraph,
}

impl<'g> StockAggregator<'g> {
    pub fn new(graph: &'g EntityGraph) -> Self {
        Self { graph }
    }

    fn own_stock(&self, owner: StockOwner, qty_in_box: Option<f64>) -> StockDto {
        let row = self.graph.stock_for(owner);
        let mut dto = StockDto::for_owner(owner, row);
        match total_stock(row) {
            Some(total) => {
                dto.total_stock = total;
                dto.total_stock_in_box = in_box(total, qty_in_box);
            }
            None => {
                warn!(?owner, "ledger sum overflowed");
                counter!("recipe_engine.stock.overflows", 1);
                dto.flags.push(StockFlag::Overflow);
            }
        }
        dto.grand_total_in_box = dto.total_stock_in_box;
        dto
    }

    pub fn product_stock(&self, product_id: EntityId) -> Result<StockDto, ServiceError> {
        let product = self
            .graph
            .product(product_id)
            .ok_or_else(|| ServiceError::not_found("Product", product_id))?;
        Ok(self.own_stock(StockOwner::Product(product_id), product.qty_in_box))
    }

    pub fn raw_material_stock(&self, raw_material_id: EntityId) -> Result<StockDto, ServiceError> {
        if self.graph.raw_material(raw_material_id).is_none() {
            return Err(ServiceError::not_found("RawMaterial", raw_material_id));
        }
        Ok(self.own_stock(StockOwner::RawMaterial(raw_material_id), None))
    }

    /// Own stock plus the stock of every product whose recipe uses the semi
    /// product directly. Each consuming product counts in full.
    pub fn semi_product_stock(&self, semi_product_id: EntityId) -> Result<StockDto, ServiceError> {
        let semi = self
            .graph
            .semi_product(semi_product_id)
            .ok_or_else(|| ServiceError::not_found("SemiProduct", semi_product_id))?;
        let mut dto = self.own_stock(StockOwner::SemiProduct(semi_product_id), semi.qty_in_box);

        let mut product_total = Some(0i64);
        let mut product_in_box = 0.0;
        for consumer in self
            .graph
            .consumers_of(IngredientRef::semi_product(semi_product_id))
        {
            let RecipeOwner::Product(product_id) = consumer else {
                continue;
            };
            let Some(product) = self.graph.product(product_id) else {
                continue;
            };
            let total = total_stock(self.graph.stock_for(StockOwner::Product(product_id)));
            product_total = match (product_total, total) {
                (Some(acc), Some(t)) => acc.checked_add(t),
                _ => None,
            };
            if let Some(t) = total {
                product_in_box += in_box(t, product.qty_in_box);
            }
        }

        match product_total {
            Some(total) => {
                dto.total_product_stock = total;
                dto.total_product_stock_in_box = product_in_box;
            }
            None => {
                warn!(semi_product_id, "consuming product stock overflowed");
                counter!("recipe_engine.stock.overflows", 1);
                if !dto.flags.contains(&StockFlag::Overflow) {
                    dto.flags.push(StockFlag::Overflow);
                }
            }
        }
        dto.grand_total_in_box = dto.total_stock_in_box + dto.total_product_stock_in_box;
        Ok(dto)
    }

    /// Members of a group as stock owners, in id order.
    fn members(&self, kind: GroupKind, group_id: EntityId) -> Vec<StockOwner> {
        match kind {
            GroupKind::RawMaterialGroup => self
                .graph
                .raw_materials()
                .filter(|r| r.raw_material_group_id == Some(group_id))
                .map(|r| StockOwner::RawMaterial(r.id))
                .collect(),
            GroupKind::SemiProductGroup => self
                .graph
                .semi_products()
                .filter(|s| s.semi_product_group_id == Some(group_id))
                .map(|s| StockOwner::SemiProduct(s.id))
                .collect(),
            GroupKind::ProductGroup => self
                .graph
                .products()
                .filter(|p| p.product_group_id == Some(group_id))
                .map(|p| StockOwner::Product(p.id))
                .collect(),
        }
    }

    /// Ids of every group known to the lookup table or referenced by a member.
    pub fn group_ids(&self, kind: GroupKind) -> Vec<EntityId> {
        let mut ids: BTreeSet<EntityId> = self
            .graph
            .lookups(kind.lookup_kind())
            .map(|l| l.id)
            .collect();
        match kind {
            GroupKind::RawMaterialGroup => {
                ids.extend(self.graph.raw_materials().filter_map(|r| r.raw_material_group_id))
            }
            GroupKind::SemiProductGroup => {
                ids.extend(self.graph.semi_products().filter_map(|s| s.semi_product_group_id))
            }
            GroupKind::ProductGroup => {
                ids.extend(self.graph.products().filter_map(|p| p.product_group_id))
            }
        }
        ids.into_iter().collect()
    }

    fn group_name(&self, kind: GroupKind, group_id: EntityId) -> Option<String> {
        self.graph
            .lookup(kind.lookup_kind(), group_id)
            .map(|l| l.name.clone())
    }

    /// Σ TotalStock over the members of one group.
    pub fn group_rollup(&self, kind: GroupKind, group_id: EntityId) -> GroupRollup {
        let members = self.members(kind, group_id);
        let mut flags = Vec::new();
        let mut without_stock = 0;
        let mut sum = Some(0i64);

        for owner in &members {
            let row = self.graph.stock_for(*owner);
            if row.is_none() {
                without_stock += 1;
            }
            let member_total = total_stock(row).unwrap_or_else(|| {
                if !flags.contains(&StockFlag::Overflow) {
                    flags.push(StockFlag::Overflow);
                }
                0
            });
            sum = sum.and_then(|acc| acc.checked_add(member_total));
        }

        let total_stock = sum.unwrap_or_else(|| {
            if !flags.contains(&StockFlag::Overflow) {
                flags.push(StockFlag::Overflow);
            }
            0
        });
        if flags.contains(&StockFlag::Overflow) {
            counter!("recipe_engine.stock.overflows", 1);
        }

        GroupRollup {
            kind,
            group_id,
            group_name: self.group_name(kind, group_id),
            member_count: members.len(),
            members_without_stock: without_stock,
            total_stock,
            flags,
        }
    }

    fn cancelled_rollup(&self, kind: GroupKind, group_id: EntityId) -> GroupRollup {
        GroupRollup {
            kind,
            group_id,
            group_name: self.group_name(kind, group_id),
            member_count: 0,
            members_without_stock: 0,
            total_stock: 0,
            flags: vec![StockFlag::Cancelled],
        }
    }
}

/// Computes every group of `kind` concurrently, at most `workers` at a time.
///
/// The token is checked when a group task starts; groups started after
/// cancellation report zero with [`StockFlag::Cancelled`].
#[instrument(skip(graph, cancel))]
pub async fn rollup_groups(
    graph: Arc<EntityGraph>,
    kind: GroupKind,
    workers: usize,
    cancel: CancellationToken,
) -> Result<Vec<GroupRollup>, ServiceError> {
    let group_ids = StockAggregator::new(&graph).group_ids(kind);
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();

    for group_id in group_ids {
        let graph = graph.clone();
        let permits = permits.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| ServiceError::InternalError(format!("rollup pool closed: {}", e)))?;
            let aggregator = StockAggregator::new(&graph);
            if cancel.is_cancelled() {
                debug!(group_id, "rollup skipped after cancellation");
                return Ok::<_, ServiceError>(aggregator.cancelled_rollup(kind, group_id));
            }
            Ok(aggregator.group_rollup(kind, group_id))
        });
    }

    let mut rollups = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let rollup = joined
            .map_err(|e| ServiceError::InternalError(format!("rollup task failed: {}", e)))??;
        rollups.push(rollup);
    }
    rollups.sort_by_key(|r| r.group_id);

    let cancelled = rollups
        .iter()
        .filter(|r| r.flags.contains(&StockFlag::Cancelled))
        .count();
    counter!("recipe_engine.stock.rollups", rollups.len() as u64);
    info!(
        groups = rollups.len(),
        cancelled,
        "group rollups computed"
    );
    Ok(rollups)
}
