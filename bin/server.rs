// Hospital Capacity Dashboard - Web Server
// REST API with Axum over the shared selector pipeline

use anyhow::{Context, Result};
use clap::Parser;
use hospital_capacity::server::{router, AppState};
use hospital_capacity::DashboardConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "capacity-server", version, about = "Hospital capacity dashboard server")]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "HOSPITAL_CAPACITY_CONFIG")]
    config: Option<PathBuf>,

    /// Source workbook (overrides the config file)
    #[arg(long)]
    workbook: Option<PathBuf>,

    /// Directory holding the map HTML files (overrides the config file)
    #[arg(long)]
    assets_dir: Option<PathBuf>,

    /// Address to listen on (overrides the config file)
    #[arg(long)]
    bind: Option<String>,
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = DashboardConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(workbook) = cli.workbook {
        config.workbook = workbook;
    }
    if let Some(dir) = cli.assets_dir {
        config.assets_dir = dir;
    }
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }

    println!("🌐 Hospital Capacity Dashboard - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let state = AppState::new(config.clone());

    // Load once up front so a bad workbook is reported at startup
    match state.cache.get() {
        Ok(dataset) => println!(
            "✓ Workbook loaded: {} acute, {} PAC facilities",
            dataset.acute.len(),
            dataset.pac.len()
        ),
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("   API requests will return 503 until the workbook is available.");
        }
    }

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    println!("\n🚀 Server running on http://{}", config.bind);
    println!("   API:  http://{}/api/view?category=acute&aggregation=region&display=table", config.bind);
    println!("   Maps: http://{}/maps/", config.bind);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
