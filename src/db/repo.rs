use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Executor, Sqlite, SqlitePool};
use std::str::FromStr;
use tracing::{debug, instrument, warn};

use super::model::{encode_nested, GardenRow, IrrigationRow, PlantRow};
use crate::error::StoreError;
use crate::model::{Garden, Irrigation, Plant, StorageId};
use crate::normalize::Document;
use crate::store::{GardenStore, IrrigationStore, PlantStore};

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<Pool, StoreError> {
    let normalized = prepare_sqlite_url(database_url);
    let options = SqliteConnectOptions::from_str(&normalized)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. Leaves in-memory URLs untouched.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                warn!(error = %err, path = %parent.display(), "failed to create database directory");
            }
        }
    }

    let mut rebuilt = String::from("sqlite://");
    rebuilt.push_str(&expanded_path);
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|err| StoreError::Unavailable(format!("migration failed: {err}")))?;
    Ok(())
}

/// SQLite-backed implementation of all three entity accessors.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: Pool,
}

impl SqliteStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

const GARDEN_COLUMNS: &str = "id, name, started_at, ended_at";
const PLANT_COLUMNS: &str =
    "id, garden_id, name, size, genotype, phase, flavors, attributes, plagues, images";
const IRRIGATION_COLUMNS: &str = "id, garden_id, done_at, quantity, nutrients";

#[async_trait]
impl GardenStore for SqliteStore {
    #[instrument(skip_all)]
    async fn load_garden_by_id(&self, id: &StorageId) -> Result<Option<Garden>, StoreError> {
        let row = sqlx::query_as::<_, GardenRow>(&format!(
            "SELECT {GARDEN_COLUMNS} FROM gardens WHERE id = ?"
        ))
        .bind(id.as_bytes().to_vec())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Garden::try_from).transpose()
    }

    #[instrument(skip_all)]
    async fn find_garden_by_name(&self, name: &str) -> Result<Option<Garden>, StoreError> {
        let row = sqlx::query_as::<_, GardenRow>(&format!(
            "SELECT {GARDEN_COLUMNS} FROM gardens WHERE name = ? ORDER BY started_at ASC LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Garden::try_from).transpose()
    }
}

#[async_trait]
impl PlantStore for SqliteStore {
    #[instrument(skip_all)]
    async fn list_plants_by_garden_id(
        &self,
        garden_id: &StorageId,
    ) -> Result<Vec<Plant>, StoreError> {
        let rows = sqlx::query_as::<_, PlantRow>(&format!(
            "SELECT {PLANT_COLUMNS} FROM plants WHERE garden_id = ? ORDER BY created_at ASC, rowid ASC"
        ))
        .bind(garden_id.as_bytes().to_vec())
        .fetch_all(&self.pool)
        .await?;
        debug!(garden = %garden_id, count = rows.len(), "listed plants");
        rows.into_iter().map(Plant::try_from).collect()
    }

    #[instrument(skip_all)]
    async fn load_plant_by_id(&self, id: &StorageId) -> Result<Option<Plant>, StoreError> {
        let row = sqlx::query_as::<_, PlantRow>(&format!(
            "SELECT {PLANT_COLUMNS} FROM plants WHERE id = ?"
        ))
        .bind(id.as_bytes().to_vec())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Plant::try_from).transpose()
    }
}

#[async_trait]
impl IrrigationStore for SqliteStore {
    #[instrument(skip_all)]
    async fn list_irrigations_by_garden_id(
        &self,
        garden_id: &StorageId,
    ) -> Result<Vec<Irrigation>, StoreError> {
        let rows = sqlx::query_as::<_, IrrigationRow>(&format!(
            "SELECT {IRRIGATION_COLUMNS} FROM irrigations WHERE garden_id = ? ORDER BY done_at ASC, rowid ASC"
        ))
        .bind(garden_id.as_bytes().to_vec())
        .fetch_all(&self.pool)
        .await?;
        debug!(garden = %garden_id, count = rows.len(), "listed irrigations");
        rows.into_iter().map(Irrigation::try_from).collect()
    }
}

fn key_of<T: Document>(entity: &T, kind: &'static str) -> Result<Vec<u8>, StoreError> {
    entity
        .key()
        .storage_id()
        .map(|id| id.as_bytes().to_vec())
        .map_err(|err| StoreError::malformed(kind, err.to_string()))
}

/// Insert helpers accept the pool or an open transaction.
#[instrument(skip_all)]
pub async fn insert_garden<'e, E>(executor: E, garden: &Garden) -> Result<(), StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("INSERT INTO gardens (id, name, started_at, ended_at) VALUES (?, ?, ?, ?)")
        .bind(key_of(garden, "garden")?)
        .bind(&garden.name)
        .bind(garden.started_at)
        .bind(garden.ended_at)
        .execute(executor)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn insert_plant<'e, E>(executor: E, plant: &Plant) -> Result<(), StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO plants (id, garden_id, name, size, genotype, phase, flavors, attributes, plagues, images) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(key_of(plant, "plant")?)
    .bind(plant.garden_id.as_bytes().to_vec())
    .bind(&plant.name)
    .bind(plant.size)
    .bind(&plant.genotype)
    .bind(&plant.phase)
    .bind(encode_nested("flavors", plant.flavors.as_ref())?)
    .bind(encode_nested("attributes", plant.attributes.as_ref())?)
    .bind(encode_nested("plagues", plant.plagues.as_ref())?)
    .bind(encode_nested("images", plant.images.as_ref())?)
    .execute(executor)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn insert_irrigation<'e, E>(executor: E, irrigation: &Irrigation) -> Result<(), StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO irrigations (id, garden_id, done_at, quantity, nutrients) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(key_of(irrigation, "irrigation")?)
    .bind(irrigation.garden_id.as_bytes().to_vec())
    .bind(irrigation.done_at)
    .bind(irrigation.quantity)
    .bind(&irrigation.nutrients)
    .execute(executor)
    .await?;
    Ok(())
}
