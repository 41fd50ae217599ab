//! Read interfaces the aggregator depends on.
//!
//! Each accessor is a point-in-time read; nothing links the three calls
//! transactionally. Implementations hand out documents keyed by storage id.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{Garden, Irrigation, Plant, StorageId};

#[async_trait]
pub trait GardenStore: Send + Sync {
    /// `Ok(None)` means the garden does not exist; `Err` means the lookup failed.
    async fn load_garden_by_id(&self, id: &StorageId) -> Result<Option<Garden>, StoreError>;

    async fn find_garden_by_name(&self, name: &str) -> Result<Option<Garden>, StoreError>;
}

#[async_trait]
pub trait PlantStore: Send + Sync {
    async fn list_plants_by_garden_id(&self, garden_id: &StorageId)
        -> Result<Vec<Plant>, StoreError>;

    async fn load_plant_by_id(&self, id: &StorageId) -> Result<Option<Plant>, StoreError>;
}

#[async_trait]
pub trait IrrigationStore: Send + Sync {
    async fn list_irrigations_by_garden_id(
        &self,
        garden_id: &StorageId,
    ) -> Result<Vec<Irrigation>, StoreError>;
}
