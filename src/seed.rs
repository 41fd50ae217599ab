//! Import of public-form garden fixtures.
//!
//! A fixture is a YAML document listing gardens in the same shape the
//! aggregator returns them: public `id`s, with `plants` and `irrigations`
//! nested under each garden. Ids may be omitted; fresh storage ids are
//! assigned. Nested plants and irrigations carry no `garden_id`; they belong
//! to the garden they are listed under.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument};

use crate::db::{self, Pool};
use crate::error::{NormalizeError, StoreError};
use crate::model::{
    Attribute, DocKey, Flavor, Garden, Image, Irrigation, Plague, Plant, StorageId,
};
use crate::normalize::{to_storage_nested, Document};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("fixture parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("fixture id error: {0}")]
    Id(#[from] NormalizeError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub gardens: Vec<FixtureGarden>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureGarden {
    #[serde(flatten)]
    pub key: DocKey,
    pub name: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub plants: Vec<FixturePlant>,
    #[serde(default)]
    pub irrigations: Vec<FixtureIrrigation>,
}

#[derive(Debug, Deserialize)]
pub struct FixturePlant {
    #[serde(flatten)]
    pub key: DocKey,
    pub name: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub genotype: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub flavors: Option<Vec<Flavor>>,
    #[serde(default)]
    pub attributes: Option<Vec<Attribute>>,
    #[serde(default)]
    pub plagues: Option<Vec<Plague>>,
    #[serde(default)]
    pub images: Option<Vec<Image>>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureIrrigation {
    #[serde(flatten)]
    pub key: DocKey,
    pub done_at: DateTime<Utc>,
    pub quantity: f64,
    #[serde(default)]
    pub nutrients: Option<String>,
}

impl FixturePlant {
    fn into_plant(self, garden_id: StorageId) -> Plant {
        Plant {
            key: self.key,
            garden_id,
            name: self.name,
            size: self.size,
            genotype: self.genotype,
            phase: self.phase,
            flavors: self.flavors,
            attributes: self.attributes,
            plagues: self.plagues,
            images: self.images,
        }
    }
}

impl FixtureIrrigation {
    fn into_irrigation(self, garden_id: StorageId) -> Irrigation {
        Irrigation {
            key: self.key,
            garden_id,
            done_at: self.done_at,
            quantity: self.quantity,
            nutrients: self.nutrients,
        }
    }
}

impl FixtureGarden {
    /// Resolve the garden's own id first so nested records can point at it.
    fn into_garden(mut self) -> Result<Garden, SeedError> {
        assign_missing(&mut self.key);
        self.key.to_storage()?;
        let garden_id = self.key.storage_id()?;

        let mut garden = Garden {
            key: self.key,
            name: self.name,
            started_at: self.started_at,
            ended_at: self.ended_at,
            plants: Some(
                self.plants
                    .into_iter()
                    .map(|p| p.into_plant(garden_id))
                    .collect(),
            ),
            irrigations: Some(
                self.irrigations
                    .into_iter()
                    .map(|i| i.into_irrigation(garden_id))
                    .collect(),
            ),
        };
        garden.for_each_nested(&mut |key| {
            assign_missing(key);
            Ok(())
        })?;
        to_storage_nested(&mut garden)?;
        Ok(garden)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub gardens: usize,
    pub plants: usize,
    pub irrigations: usize,
}

pub fn parse_fixture(raw: &str) -> Result<Fixture, SeedError> {
    Ok(serde_yaml::from_str(raw)?)
}

fn assign_missing(key: &mut DocKey) {
    if key.storage.is_none() && key.id.is_none() {
        key.storage = Some(StorageId::generate());
    }
}

/// Convert every garden in the fixture to storage form and insert it together
/// with its plants and irrigations in a single transaction. Nothing is
/// persisted unless every record is written. Returns the storage ids of the
/// gardens in fixture order.
#[instrument(skip_all, fields(gardens = fixture.gardens.len()))]
pub async fn import(pool: &Pool, fixture: Fixture) -> Result<(Vec<StorageId>, SeedSummary), SeedError> {
    let mut summary = SeedSummary::default();
    let mut ids = Vec::with_capacity(fixture.gardens.len());
    let mut tx = pool.begin().await.map_err(StoreError::from)?;

    for entry in fixture.gardens {
        let garden = entry.into_garden()?;
        let garden_id = garden.key().storage_id()?;

        db::insert_garden(&mut *tx, &garden).await?;
        for plant in garden.plants.iter().flatten() {
            db::insert_plant(&mut *tx, plant).await?;
            summary.plants += 1;
        }
        for irrigation in garden.irrigations.iter().flatten() {
            db::insert_irrigation(&mut *tx, irrigation).await?;
            summary.irrigations += 1;
        }
        summary.gardens += 1;
        ids.push(garden_id);
    }

    tx.commit().await.map_err(StoreError::from)?;
    info!(
        gardens = summary.gardens,
        plants = summary.plants,
        irrigations = summary.irrigations,
        "fixture imported"
    );
    Ok((ids, summary))
}
