use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use recipe_engine::{
    config::{self, EngineConfig},
    db::{Catalog, EntityGraph},
    dto::{FilterCriteria, OrderType},
    entities::{EntityId, IngredientRef, RecipeOwner, StockOwner},
    services::{
        facet_filter::FacetKind, recipe_resolver::ResolvedBom, stock_aggregator::rollup_total,
        GroupKind, ProductQueryService, ResolveMode,
    },
};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize(&cli.catalog).await?;

    match cli.command {
        Commands::Resolve(args) => handle_resolve(&context, args, cli.json)?,
        Commands::Requirements(args) => handle_requirements(&context, args, cli.json)?,
        Commands::WhereUsed(args) => handle_where_used(&context, args, cli.json)?,
        Commands::Stock(args) => handle_stock(&context, args, cli.json)?,
        Commands::Rollups(args) => handle_rollups(&context, args, cli.json).await?,
        Commands::Filter(args) => handle_filter(&context, args, cli.json)?,
        Commands::Facets(args) => handle_facets(&context, args, cli.json).await?,
        Commands::Detail(args) => handle_detail(&context, args)?,
        Commands::Validate => handle_validate(&context, cli.json)?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "recipe-cli",
    about = "Resolve recipes, aggregate stock and query a catalog snapshot",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "catalog.json",
        help = "Path to the JSON catalog snapshot"
    )]
    catalog: PathBuf,
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flatten the bill of materials of a product or semi product
    Resolve(ResolveArgs),
    /// Total ingredient needs for a quantity
    Requirements(ResolveArgs),
    /// Recipes that use an ingredient directly
    WhereUsed(IngredientArgs),
    /// Ledger balances and derived totals
    Stock(StockArgs),
    /// Stock totals per group
    Rollups(RollupArgs),
    /// Run a facet query
    Filter(FilterArgs),
    /// Facet values available for a query
    Facets(FilterArgs),
    /// Full detail view (always JSON)
    Detail(OwnerArgs),
    /// Report recipe cycles and rejected rows
    Validate,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct OwnerArgs {
    #[arg(long)]
    product: Option<EntityId>,
    #[arg(long)]
    semi_product: Option<EntityId>,
}

impl OwnerArgs {
    fn owner(&self) -> Result<RecipeOwner> {
        match (self.product, self.semi_product) {
            (Some(id), None) => Ok(RecipeOwner::Product(id)),
            (None, Some(id)) => Ok(RecipeOwner::SemiProduct(id)),
            _ => Err(anyhow!("pass exactly one of --product or --semi-product")),
        }
    }
}

#[derive(Args)]
struct ResolveArgs {
    #[command(flatten)]
    owner: OwnerArgs,
    #[arg(long, default_value = "1")]
    quantity: Decimal,
    #[arg(long, action = ArgAction::SetTrue, help = "Expand only the immediate recipe")]
    single_level: bool,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct IngredientArgs {
    #[arg(long)]
    raw_material: Option<EntityId>,
    #[arg(long)]
    semi_product: Option<EntityId>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct StockArgs {
    #[arg(long)]
    product: Option<EntityId>,
    #[arg(long)]
    semi_product: Option<EntityId>,
    #[arg(long)]
    raw_material: Option<EntityId>,
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupKindArg {
    RawMaterialGroup,
    SemiProductGroup,
    ProductGroup,
}

impl From<GroupKindArg> for GroupKind {
    fn from(value: GroupKindArg) -> Self {
        match value {
            GroupKindArg::RawMaterialGroup => GroupKind::RawMaterialGroup,
            GroupKindArg::SemiProductGroup => GroupKind::SemiProductGroup,
            GroupKindArg::ProductGroup => GroupKind::ProductGroup,
        }
    }
}

#[derive(Args)]
struct RollupArgs {
    #[arg(long, value_enum, default_value = "raw-material-group")]
    kind: GroupKindArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortDirectionArg {
    Asc,
    Desc,
}

impl From<SortDirectionArg> for OrderType {
    fn from(value: SortDirectionArg) -> Self {
        match value {
            SortDirectionArg::Asc => OrderType::Asc,
            SortDirectionArg::Desc => OrderType::Desc,
        }
    }
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long, help = "JSON file with a full FilterCriteria document")]
    criteria: Option<PathBuf>,
    #[arg(
        long = "facet",
        value_name = "KIND=VALUE",
        help = "Add a facet value, e.g. --facet Brand=\"Brand A\" (repeatable)"
    )]
    facets: Vec<String>,
    #[arg(long)]
    code: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    order_by: Option<String>,
    #[arg(long, value_enum)]
    order: Option<SortDirectionArg>,
    #[arg(long)]
    limit: Option<u64>,
    #[arg(long)]
    offset: Option<u64>,
    #[arg(long, action = ArgAction::SetTrue, help = "Include full detail views per product")]
    details: bool,
}

impl FilterArgs {
    fn criteria(&self) -> Result<FilterCriteria> {
        let mut criteria = match &self.criteria {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("failed to read criteria {}", path.display()))?;
                serde_json::from_str(&raw).context("failed to parse filter criteria")?
            }
            None => FilterCriteria::default(),
        };

        for facet in &self.facets {
            let (kind, value) = facet
                .split_once('=')
                .ok_or_else(|| anyhow!("facet `{}` must look like KIND=VALUE", facet))?;
            let kind: FacetKind = kind
                .trim()
                .parse()
                .map_err(|_| anyhow!("unknown facet `{}`", kind))?;
            criteria.facet_mut(kind).push(value.to_string());
        }
        if self.code.is_some() {
            criteria.code = self.code.clone();
        }
        if self.name.is_some() {
            criteria.name = self.name.clone();
        }
        if self.order_by.is_some() {
            criteria.order_by = self.order_by.clone();
        }
        if let Some(order) = self.order {
            criteria.order_type = order.into();
        }
        criteria.limit = self.limit.or(criteria.limit);
        criteria.offset = self.offset.or(criteria.offset);
        Ok(criteria)
    }
}

struct CliContext {
    service: ProductQueryService,
}

impl CliContext {
    async fn initialize(catalog_path: &Path) -> Result<Self> {
        let config = config::load_config().unwrap_or_else(|err| {
            eprintln!("falling back to default engine config: {}", err);
            EngineConfig::default()
        });
        config::init_tracing(config.log_level(), config.log_json);

        let raw = fs::read_to_string(catalog_path)
            .with_context(|| format!("failed to read catalog {}", catalog_path.display()))?;
        let catalog = Catalog::from_json(&raw).context("failed to parse catalog")?;
        let graph = EntityGraph::load(&catalog)
            .await
            .context("failed to index catalog")?;
        for issue in graph.issues() {
            debug!(target: "recipe_cli", kind = %issue.kind, id = issue.id, "{}", issue.message);
        }

        Ok(Self {
            service: ProductQueryService::new(Arc::new(graph), config),
        })
    }
}

fn resolve_bom(context: &CliContext, args: &ResolveArgs) -> Result<ResolvedBom> {
    let mode = if args.single_level {
        ResolveMode::SingleLevel
    } else {
        ResolveMode::MultiLevel
    };
    let bom = context
        .service
        .resolve(args.owner.owner()?, args.quantity, mode)
        .context("failed to resolve recipe")?;
    Ok(bom)
}

fn handle_resolve(context: &CliContext, args: ResolveArgs, json: bool) -> Result<()> {
    let bom = resolve_bom(context, &args)?;
    if json {
        return print_json(&bom);
    }

    println!("{} × {} ({} lines)", bom.root, bom.quantity, bom.lines.len());
    for line in &bom.lines {
        println!(
            "{}- {} {} • {} {}",
            "  ".repeat(line.level.saturating_sub(1) as usize),
            line.code,
            line.name,
            line.amount,
            line.unit.as_deref().unwrap_or("")
        );
    }
    for issue in &bom.issues {
        warn!(detail_id = issue.detail_id, "{}", issue.message);
        println!("! detail {}: {}", issue.detail_id, issue.message);
    }
    Ok(())
}

fn handle_requirements(context: &CliContext, args: ResolveArgs, json: bool) -> Result<()> {
    let requirements = resolve_bom(context, &args)?.requirements();
    if json {
        return print_json(&requirements);
    }
    for r in &requirements {
        println!(
            "- {} {} {} • {} {} ({}×)",
            r.ingredient.kind,
            r.code,
            r.name,
            r.total_amount,
            r.unit.as_deref().unwrap_or(""),
            r.occurrences
        );
    }
    Ok(())
}

fn handle_where_used(context: &CliContext, args: IngredientArgs, json: bool) -> Result<()> {
    let ingredient = match (args.raw_material, args.semi_product) {
        (Some(id), None) => IngredientRef::raw_material(id),
        (None, Some(id)) => IngredientRef::semi_product(id),
        _ => bail!("pass exactly one of --raw-material or --semi-product"),
    };
    let usages = context
        .service
        .where_used(ingredient)
        .context("failed to look up consumers")?;
    if json {
        return print_json(&usages);
    }
    if usages.is_empty() {
        println!("{} is not used by any recipe", ingredient);
    }
    for usage in &usages {
        println!(
            "- {} {} {} • recipe {} • {} per unit",
            usage.owner, usage.code, usage.name, usage.recipe_id, usage.amount
        );
    }
    Ok(())
}

fn handle_stock(context: &CliContext, args: StockArgs, json: bool) -> Result<()> {
    let owner = match (args.product, args.semi_product, args.raw_material) {
        (Some(id), None, None) => StockOwner::Product(id),
        (None, Some(id), None) => StockOwner::SemiProduct(id),
        (None, None, Some(id)) => StockOwner::RawMaterial(id),
        _ => bail!("pass exactly one stock owner"),
    };
    let stock = context.service.stock(owner).context("failed to aggregate stock")?;
    if json {
        return print_json(&stock);
    }
    println!(
        "ledgers {} / {} / {} • total {} • in box {:.2} • products {} ({:.2} boxes) • grand total {:.2} boxes",
        stock.code1_stock.unwrap_or(0),
        stock.code2_stock.unwrap_or(0),
        stock.code3_stock.unwrap_or(0),
        stock.total_stock,
        stock.total_stock_in_box,
        stock.total_product_stock,
        stock.total_product_stock_in_box,
        stock.grand_total_in_box
    );
    if !stock.flags.is_empty() {
        println!("flags: {:?}", stock.flags);
    }
    Ok(())
}

async fn handle_rollups(context: &CliContext, args: RollupArgs, json: bool) -> Result<()> {
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let rollups = context
        .service
        .group_rollups(args.kind.into(), cancel)
        .await
        .context("failed to compute rollups")?;
    if json {
        return print_json(&rollups);
    }
    for rollup in &rollups {
        println!(
            "- {} {} • {} members ({} without stock) • total {}{}",
            rollup.group_id,
            rollup.group_name.as_deref().unwrap_or("-"),
            rollup.member_count,
            rollup.members_without_stock,
            rollup.total_stock,
            if rollup.flags.is_empty() {
                String::new()
            } else {
                format!(" {:?}", rollup.flags)
            }
        );
    }
    match rollup_total(&rollups) {
        Some(total) => println!("grand total {}", total),
        None => println!("grand total overflowed"),
    }
    Ok(())
}

fn handle_filter(context: &CliContext, args: FilterArgs, json: bool) -> Result<()> {
    let criteria = args.criteria()?;
    let response = context
        .service
        .web_filter(&criteria, args.details)
        .context("filter failed")?;
    if json {
        return print_json(&response);
    }
    println!("{} matching products", response.row_count);
    for product in &response.products {
        println!(
            "- {} {} {} • {}",
            product.id,
            product.code,
            product.name,
            product
                .brand
                .as_ref()
                .map(|b| b.name.as_str())
                .unwrap_or("-")
        );
    }
    Ok(())
}

async fn handle_facets(context: &CliContext, args: FilterArgs, json: bool) -> Result<()> {
    let criteria = args.criteria()?;
    let items = context
        .service
        .filter_items(&criteria)
        .await
        .context("failed to collect facet values")?;
    if json {
        return print_json(&items);
    }
    let render = |label: &str, values: &[recipe_engine::dto::LookupDto]| {
        let names: Vec<_> = values.iter().map(|v| v.name.as_str()).collect();
        println!("{}: {}", label, names.join(", "));
    };
    render("Sellers", &items.sellers);
    render("Brands", &items.brands);
    render("ProductGroups", &items.product_groups);
    render("StorageConditions", &items.storage_conditions);
    render("ProductTypes", &items.product_types);
    render("SKUFollowTypes", &items.sku_follow_types);
    render("SKUFollowUnits", &items.sku_follow_units);
    for group_type in &items.product_group_types {
        render(&group_type.name, &group_type.definitions);
    }
    Ok(())
}

fn handle_detail(context: &CliContext, args: OwnerArgs) -> Result<()> {
    match args.owner()? {
        RecipeOwner::Product(id) => print_json(&context.service.product_detail(id)?),
        RecipeOwner::SemiProduct(id) => print_json(&context.service.semi_product_detail(id)?),
    }
}

fn handle_validate(context: &CliContext, json: bool) -> Result<()> {
    let cycles = context.service.validate_graph();
    let issues = context.service.graph().issues();

    if json {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Report<'a> {
            cycles: &'a [recipe_engine::services::recipe_resolver::CycleReport],
            integrity_issues: &'a [recipe_engine::db::GraphIssue],
        }
        return print_json(&Report {
            cycles: &cycles,
            integrity_issues: issues,
        });
    }

    if cycles.is_empty() && issues.is_empty() {
        println!("graph is consistent");
        return Ok(());
    }
    for cycle in &cycles {
        println!(
            "cycle: resolving {} revisits {} at depth {}",
            cycle.root, cycle.node, cycle.depth
        );
    }
    for issue in issues {
        println!("rejected {} {}: {}", issue.kind, issue.id, issue.message);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
