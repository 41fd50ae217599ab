//! Row types returned by repository queries and their mapping into entities.
//!
//! Nested plant collections live in JSON text columns; they are decoded here
//! so callers only ever see typed values.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;
use crate::model::{DocKey, Garden, Irrigation, Plant, StorageId};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GardenRow {
    pub id: Vec<u8>,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlantRow {
    pub id: Vec<u8>,
    pub garden_id: Vec<u8>,
    pub name: String,
    pub size: i64,
    pub genotype: Option<String>,
    pub phase: Option<String>,
    pub flavors: Option<String>,
    pub attributes: Option<String>,
    pub plagues: Option<String>,
    pub images: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IrrigationRow {
    pub id: Vec<u8>,
    pub garden_id: Vec<u8>,
    pub done_at: DateTime<Utc>,
    pub quantity: f64,
    pub nutrients: Option<String>,
}

fn storage_id(entity: &'static str, raw: &[u8]) -> Result<StorageId, StoreError> {
    StorageId::from_slice(raw)
        .ok_or_else(|| StoreError::malformed(entity, format!("id has {} bytes", raw.len())))
}

fn decode_nested<T: DeserializeOwned>(
    column: &'static str,
    raw: Option<String>,
) -> Result<Option<Vec<T>>, StoreError> {
    match raw.filter(|s| !s.trim().is_empty()) {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| StoreError::malformed("plant", format!("{column}: {err}"))),
        None => Ok(None),
    }
}

/// Encode a nested collection for its JSON column. `None` stays NULL.
pub fn encode_nested<T: Serialize>(
    column: &'static str,
    items: Option<&Vec<T>>,
) -> Result<Option<String>, StoreError> {
    items
        .map(|items| {
            serde_json::to_string(items)
                .map_err(|err| StoreError::malformed("plant", format!("{column}: {err}")))
        })
        .transpose()
}

impl TryFrom<GardenRow> for Garden {
    type Error = StoreError;

    fn try_from(row: GardenRow) -> Result<Self, Self::Error> {
        Ok(Garden {
            key: DocKey::stored(storage_id("garden", &row.id)?),
            name: row.name,
            started_at: row.started_at,
            ended_at: row.ended_at,
            plants: None,
            irrigations: None,
        })
    }
}

impl TryFrom<PlantRow> for Plant {
    type Error = StoreError;

    fn try_from(row: PlantRow) -> Result<Self, Self::Error> {
        Ok(Plant {
            key: DocKey::stored(storage_id("plant", &row.id)?),
            garden_id: storage_id("plant", &row.garden_id)?,
            name: row.name,
            size: row.size,
            genotype: row.genotype,
            phase: row.phase,
            flavors: decode_nested("flavors", row.flavors)?,
            attributes: decode_nested("attributes", row.attributes)?,
            plagues: decode_nested("plagues", row.plagues)?,
            images: decode_nested("images", row.images)?,
        })
    }
}

impl TryFrom<IrrigationRow> for Irrigation {
    type Error = StoreError;

    fn try_from(row: IrrigationRow) -> Result<Self, Self::Error> {
        Ok(Irrigation {
            key: DocKey::stored(storage_id("irrigation", &row.id)?),
            garden_id: storage_id("irrigation", &row.garden_id)?,
            done_at: row.done_at,
            quantity: row.quantity,
            nutrients: row.nutrients,
        })
    }
}
