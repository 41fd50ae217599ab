use futures::stream::{FuturesUnordered, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{ComposeError, LookupError};
use crate::model::{Garden, Irrigation, Plant, StorageId};
use crate::normalize::{normalize_many_nested, normalize_one, Document};
use crate::store::{GardenStore, IrrigationStore, PlantStore};

/// Assembles gardens together with their plants and irrigations.
///
/// Every composed object is returned in public id form. Fan-outs fail fast:
/// the first failing branch decides the result and the remaining branches are
/// dropped.
#[derive(Clone)]
pub struct GardenAggregator {
    gardens: Arc<dyn GardenStore>,
    plants: Arc<dyn PlantStore>,
    irrigations: Arc<dyn IrrigationStore>,
}

impl GardenAggregator {
    pub fn new(
        gardens: Arc<dyn GardenStore>,
        plants: Arc<dyn PlantStore>,
        irrigations: Arc<dyn IrrigationStore>,
    ) -> Self {
        Self {
            gardens,
            plants,
            irrigations,
        }
    }

    /// Load one garden and attach its plants and irrigations.
    #[instrument(skip(self), fields(garden = %id))]
    pub async fn compose_garden(&self, id: &StorageId) -> Result<Garden, ComposeError> {
        match self.load_and_attach(id).await? {
            Some(garden) => Ok(garden),
            None => Err(ComposeError::NotFound {
                entity: "garden",
                id: *id,
            }),
        }
    }

    /// Compose every referenced garden concurrently.
    ///
    /// Results are collected in completion order, not input order. References
    /// to gardens that do not exist are skipped.
    #[instrument(skip_all, fields(count = refs.len()))]
    pub async fn compose_gardens(&self, refs: &[StorageId]) -> Result<Vec<Garden>, ComposeError> {
        let tasks: FuturesUnordered<_> = refs.iter().map(|id| self.load_and_attach(id)).collect();
        let composed: Vec<Option<Garden>> = tasks.try_collect().await?;

        let total = composed.len();
        let gardens: Vec<Garden> = composed.into_iter().flatten().collect();
        if gardens.len() < total {
            warn!(
                missing = total - gardens.len(),
                "some referenced gardens do not exist"
            );
        }
        info!(composed = gardens.len(), "gardens composed");
        Ok(gardens)
    }

    /// Replace the garden's plants with the current plant list.
    pub async fn attach_plants(&self, mut garden: Garden) -> Result<Garden, LookupError> {
        let garden_id = garden.key().storage_id()?;
        garden.plants = Some(self.fetch_plants(&garden_id).await?);
        Ok(garden)
    }

    /// Replace the garden's irrigations with the current irrigation list.
    pub async fn attach_irrigations(&self, mut garden: Garden) -> Result<Garden, LookupError> {
        let garden_id = garden.key().storage_id()?;
        garden.irrigations = Some(self.fetch_irrigations(&garden_id).await?);
        Ok(garden)
    }

    /// Attach plants to every garden concurrently.
    ///
    /// Each garden is updated as soon as its own lookup succeeds, so on error
    /// some gardens may already carry their new plants.
    #[instrument(skip_all, fields(count = gardens.len()))]
    pub async fn attach_plants_to_gardens(&self, gardens: &mut [Garden]) -> Result<(), LookupError> {
        let tasks: FuturesUnordered<_> = gardens
            .iter_mut()
            .map(|garden| async move {
                let garden_id = garden.key().storage_id()?;
                garden.plants = Some(self.fetch_plants(&garden_id).await?);
                Ok::<_, LookupError>(())
            })
            .collect();
        tasks.try_collect::<Vec<()>>().await?;
        Ok(())
    }

    /// Attach irrigations to every garden concurrently. Same failure contract
    /// as [`Self::attach_plants_to_gardens`].
    #[instrument(skip_all, fields(count = gardens.len()))]
    pub async fn attach_irrigations_to_gardens(
        &self,
        gardens: &mut [Garden],
    ) -> Result<(), LookupError> {
        let tasks: FuturesUnordered<_> = gardens
            .iter_mut()
            .map(|garden| async move {
                let garden_id = garden.key().storage_id()?;
                garden.irrigations = Some(self.fetch_irrigations(&garden_id).await?);
                Ok::<_, LookupError>(())
            })
            .collect();
        tasks.try_collect::<Vec<()>>().await?;
        Ok(())
    }

    /// Look a garden up by name. The garden comes back normalized, without
    /// attachments.
    #[instrument(skip(self))]
    pub async fn find_garden_by_name(&self, name: &str) -> Result<Option<Garden>, LookupError> {
        let mut garden = self
            .gardens
            .find_garden_by_name(name)
            .await
            .map_err(|source| LookupError::Garden {
                garden: name.to_string(),
                source,
            })?;
        normalize_one(garden.as_mut())?;
        Ok(garden)
    }

    /// Storage ids of the images attached to a plant.
    #[instrument(skip(self), fields(plant = %plant_id))]
    pub async fn plant_image_ids(&self, plant_id: &StorageId) -> Result<Vec<StorageId>, ComposeError> {
        let plant = self
            .plants
            .load_plant_by_id(plant_id)
            .await
            .map_err(|source| LookupError::Plant {
                plant: *plant_id,
                source,
            })?
            .ok_or(ComposeError::NotFound {
                entity: "plant",
                id: *plant_id,
            })?;

        let ids = plant
            .images
            .unwrap_or_default()
            .iter()
            .map(|image| image.key().storage_id())
            .collect::<Result<Vec<_>, _>>()
            .map_err(LookupError::from)?;
        debug!(images = ids.len(), "resolved plant images");
        Ok(ids)
    }

    /// Load, normalize, then fetch both attachments concurrently. `Ok(None)`
    /// when the garden does not exist.
    async fn load_and_attach(&self, id: &StorageId) -> Result<Option<Garden>, LookupError> {
        let loaded = self
            .gardens
            .load_garden_by_id(id)
            .await
            .map_err(|source| LookupError::Garden {
                garden: id.to_string(),
                source,
            })?;
        let Some(mut garden) = loaded else {
            return Ok(None);
        };
        normalize_one(Some(&mut garden))?;

        let (plants, irrigations) =
            tokio::try_join!(self.fetch_plants(id), self.fetch_irrigations(id))?;
        garden.plants = Some(plants);
        garden.irrigations = Some(irrigations);
        debug!(
            plants = garden.plants.as_ref().map_or(0, Vec::len),
            irrigations = garden.irrigations.as_ref().map_or(0, Vec::len),
            "garden composed"
        );
        Ok(Some(garden))
    }

    async fn fetch_plants(&self, garden_id: &StorageId) -> Result<Vec<Plant>, LookupError> {
        let mut plants = self
            .plants
            .list_plants_by_garden_id(garden_id)
            .await
            .map_err(|source| LookupError::Plants {
                garden: *garden_id,
                source,
            })?;
        normalize_many_nested(&mut plants)?;
        Ok(plants)
    }

    async fn fetch_irrigations(
        &self,
        garden_id: &StorageId,
    ) -> Result<Vec<Irrigation>, LookupError> {
        let mut irrigations = self
            .irrigations
            .list_irrigations_by_garden_id(garden_id)
            .await
            .map_err(|source| LookupError::Irrigations {
                garden: *garden_id,
                source,
            })?;
        normalize_many_nested(&mut irrigations)?;
        Ok(irrigations)
    }
}
