// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hospital_capacity::{
    project, stats, write_export, AggregationMode, Category, DashboardConfig, DatasetCache,
    SortOrder, TableView,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hospital-capacity", version, about = "Hospital capacity dashboard")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "HOSPITAL_CAPACITY_CONFIG")]
    config: Option<PathBuf>,

    /// Source workbook (overrides the config file)
    #[arg(long, global = true)]
    workbook: Option<PathBuf>,

    /// Directory holding the map HTML files (overrides the config file)
    #[arg(long, global = true)]
    assets_dir: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Clone)]
struct Selection {
    /// acute | pac
    #[arg(long, default_value = "acute")]
    category: Category,

    /// region | county
    #[arg(long, default_value = "region")]
    aggregation: AggregationMode,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current configuration and quick stats
    Summary(Selection),
    /// Print the data table for a selection
    Table {
        #[command(flatten)]
        selection: Selection,
        /// Column to sort by
        #[arg(long)]
        sort: Option<String>,
        /// Sort descending
        #[arg(long)]
        desc: bool,
        /// Only rows containing this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Write the data table as CSV
    Export {
        #[command(flatten)]
        selection: Selection,
        /// Output directory (defaults to export_dir from the config)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Resolve the map file for a selection
    Map(Selection),
    /// Interactive terminal dashboard (default)
    Tui,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let command = cli.command.unwrap_or(Command::Tui);
    if !matches!(command, Command::Tui) {
        init_tracing(cli.verbose);
    }

    let cache = DatasetCache::new(&config.workbook, config.sheets.clone());

    match command {
        Command::Summary(selection) => run_summary(&config, &cache, &selection),
        Command::Table {
            selection,
            sort,
            desc,
            search,
        } => run_table(&cache, &selection, sort.as_deref(), desc, search.as_deref()),
        Command::Export { selection, out } => run_export(&config, &cache, &selection, out),
        Command::Map(selection) => run_map(&config, &selection),
        Command::Tui => run_ui_mode(config, &cache),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<DashboardConfig> {
    let mut config = DashboardConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(workbook) = &cli.workbook {
        config.workbook = workbook.clone();
    }
    if let Some(dir) = &cli.assets_dir {
        config.assets_dir = dir.clone();
    }
    Ok(config)
}

fn load_data(cache: &DatasetCache) -> Result<std::sync::Arc<hospital_capacity::Dataset>> {
    cache.get().with_context(|| {
        format!(
            "Unable to load hospital data. Please check that {} is available.",
            cache.path().display()
        )
    })
}

fn run_summary(config: &DashboardConfig, cache: &DatasetCache, selection: &Selection) -> Result<()> {
    let dataset = load_data(cache)?;
    let s = stats(selection.category, selection.aggregation, &dataset);

    println!("📊 Current Configuration");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("   Geographic View:     {}", selection.aggregation.label());
    println!("   Data Layer:          {}", selection.category.label());
    println!("   Total Facilities:    {}", s.facility_count);
    println!("   Geographic Coverage: {} counties", s.coverage);
    println!("   Total Beds:          {}", s.total_beds);
    println!();

    match selection.aggregation {
        AggregationMode::ByCounty => {
            println!("   🏥 {} Total Facilities", s.facility_count);
            println!("   📍 {} Counties Covered", s.coverage);
            println!("   🚑 {} EMS Regions", hospital_capacity::EMS_REGION_COUNT);
            println!("   🛏️  {} Total Beds", s.total_beds);
        }
        AggregationMode::ByRegion => {
            println!("   🏥 {} Total Facilities", s.facility_count);
            println!("   🚑 {} EMS Regions", hospital_capacity::EMS_REGION_COUNT);
            println!("   📍 {} Total Counties", hospital_capacity::STATE_COUNTY_COUNT);
            println!("   🛏️  {} Total Beds", s.total_beds);
        }
    }

    println!();
    println!("✓ Source: {} ({} acute, {} PAC records)", config.workbook.display(), dataset.acute.len(), dataset.pac.len());
    if dataset.dropped_acute + dataset.dropped_pac > 0 {
        println!(
            "  Skipped {} acute and {} PAC rows without a name or county",
            dataset.dropped_acute, dataset.dropped_pac
        );
    }

    Ok(())
}

fn print_table(table: &TableView) {
    let widths: Vec<usize> = (0..table.columns.len())
        .map(|i| {
            table
                .rows
                .iter()
                .map(|row| row[i].to_string().chars().count())
                .chain(std::iter::once(table.columns[i].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", line(table.columns.clone()));
    println!("{}", widths.iter().map(|w| "─".repeat(*w)).collect::<Vec<_>>().join("  "));
    for row in &table.rows {
        println!("{}", line(row.iter().map(|c| c.to_string()).collect()));
    }
}

fn run_table(
    cache: &DatasetCache,
    selection: &Selection,
    sort: Option<&str>,
    desc: bool,
    search: Option<&str>,
) -> Result<()> {
    let dataset = load_data(cache)?;
    let mut table = project(selection.category, selection.aggregation, &dataset);

    if let Some(query) = search {
        table = table.filtered(query);
    }
    if let Some(column) = sort {
        let idx = table.column_index(column).with_context(|| {
            format!("Unknown column '{}'. Columns: {}", column, table.columns.join(", "))
        })?;
        let order = if desc { SortOrder::Descending } else { SortOrder::Ascending };
        table = table.sorted_by(idx, order);
    }

    println!(
        "📋 {} - {} Data\n",
        selection.category.label(),
        selection.aggregation.label()
    );
    print_table(&table);
    println!("\n✓ {} total records displayed", table.len());

    Ok(())
}

fn run_export(
    config: &DashboardConfig,
    cache: &DatasetCache,
    selection: &Selection,
    out: Option<PathBuf>,
) -> Result<()> {
    let dataset = load_data(cache)?;
    let table = project(selection.category, selection.aggregation, &dataset);
    let dir = out.unwrap_or_else(|| config.export_dir.clone());

    let path = write_export(
        &dir,
        &config.export_prefix,
        selection.category,
        selection.aggregation,
        &table,
    )
    .context("Failed to export table")?;

    println!("📥 Exported {} rows → {}", table.len(), path.display());
    Ok(())
}

fn run_map(config: &DashboardConfig, selection: &Selection) -> Result<()> {
    let status = config.maps.locate(
        selection.category,
        selection.aggregation,
        &config.assets_dir,
        &config.asset_filter,
    );

    match status.into_result() {
        Ok(path) => {
            println!("🗺️  {}", path.display());
            Ok(())
        }
        Err(hospital_capacity::DashboardError::AssetMissing { file, available }) => {
            eprintln!("❌ Map file not found: {}", file);
            eprintln!("🔍 Available map files:");
            for name in &available {
                eprintln!("   - {}", name);
            }
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: DashboardConfig, cache: &DatasetCache) -> Result<()> {
    println!("🖥️  Loading Hospital Capacity Dashboard...\n");

    let dataset = match cache.get() {
        Ok(dataset) => dataset,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("   Unable to load hospital data. Please check that the workbook is available.");
            std::process::exit(1);
        }
    };

    println!(
        "✓ Loaded {} acute and {} PAC facilities\n",
        dataset.acute.len(),
        dataset.pac.len()
    );

    // Same pipeline as the server, driven by keyboard selection
    let initial = hospital_capacity::ViewRequest::default();
    let mut app = ui::App::new(dataset, config, initial);
    ui::run_ui(&mut app, cache)?;

    println!("\n✅ Dashboard closed");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(config: DashboardConfig, cache: &DatasetCache) -> Result<()> {
    // Without the TUI, print the default view once
    let dataset = load_data(cache)?;
    use hospital_capacity::{resolve_view, AssetContext, DisplayMode, ViewRequest};

    let request = ViewRequest::default().with_display(DisplayMode::Table);
    let assets = AssetContext {
        table: &config.maps,
        dir: &config.assets_dir,
        filter: &config.asset_filter,
    };
    let output = resolve_view(&request, &dataset, assets);

    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use web UI: cargo run --bin capacity-server --features server\n");
    println!("{}: {}", request, output.stats.summary());
    if let Some(table) = output.table() {
        print_table(table);
    }
    Ok(())
}
