use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use garden_hub::config;
use garden_hub::db;
use garden_hub::seed;

#[derive(Parser, Debug)]
#[command(author, version, about = "Import a YAML fixture of gardens, plants and irrigations")]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Fixture file to import
    #[arg(long)]
    fixture: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| cfg.database_url());
    let pool = db::init_pool(&database_url, cfg.app.max_connections).await?;
    db::run_migrations(&pool).await?;

    let raw = fs::read_to_string(&args.fixture)
        .with_context(|| format!("failed to read {}", args.fixture.display()))?;
    let fixture = seed::parse_fixture(&raw)?;
    let (ids, summary) = seed::import(&pool, fixture).await?;

    info!(?summary, "import finished");
    for id in ids {
        println!("{id}");
    }
    Ok(())
}
