use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use garden_hub::config;
use garden_hub::db::{self, SqliteStore};
use garden_hub::model::StorageId;
use garden_hub::GardenAggregator;

#[derive(Debug, Parser)]
#[command(author, version, about = "Compose gardens with their plants and irrigations")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print one garden with its plants and irrigations
    Garden { id: String },
    /// Print several gardens, composed concurrently
    Gardens {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Look a garden up by name
    Find { name: String },
    /// Print the image ids of a plant
    PlantImages { plant_id: String },
}

fn parse_id(raw: &str) -> Result<StorageId> {
    raw.parse::<StorageId>()
        .with_context(|| format!("'{raw}' is not a valid id"))
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

    let store = Arc::new(SqliteStore::new(pool));
    let aggregator = GardenAggregator::new(store.clone(), store.clone(), store);

    let output = match args.command {
        Command::Garden { id } => {
            let garden = aggregator.compose_garden(&parse_id(&id)?).await?;
            serde_json::to_string_pretty(&garden)?
        }
        Command::Gardens { ids } => {
            let refs = ids
                .iter()
                .map(|id| parse_id(id))
                .collect::<Result<Vec<_>>>()?;
            let gardens = aggregator.compose_gardens(&refs).await?;
            info!(requested = refs.len(), returned = gardens.len(), "gardens composed");
            serde_json::to_string_pretty(&gardens)?
        }
        Command::Find { name } => match aggregator.find_garden_by_name(&name).await? {
            Some(garden) => serde_json::to_string_pretty(&garden)?,
            None => anyhow::bail!("no garden named '{name}'"),
        },
        Command::PlantImages { plant_id } => {
            let ids = aggregator.plant_image_ids(&parse_id(&plant_id)?).await?;
            let ids: Vec<String> = ids.iter().map(StorageId::to_hex).collect();
            serde_json::to_string_pretty(&ids)?
        }
    };
    println!("{output}");
    Ok(())
}
