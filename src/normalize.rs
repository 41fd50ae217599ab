//! Conversion between storage-native and public identifiers.
//!
//! Stores return documents keyed by `_id`. Before anything leaves the crate,
//! every node of the object graph is rewritten so that it carries only the
//! public `id`, derived from the storage id as lowercase hex. The reverse
//! direction (`to_storage`) is used when importing public-form documents.

use crate::error::NormalizeError;
use crate::model::{
    Attribute, DocKey, Flavor, Garden, Image, Irrigation, Plague, Plant, StorageId,
};

impl DocKey {
    /// Move the storage id into the public slot.
    pub fn normalize(&mut self) -> Result<(), NormalizeError> {
        match (self.storage, self.id.as_deref()) {
            (Some(storage), None) => {
                self.id = Some(storage.to_hex());
                self.storage = None;
                Ok(())
            }
            (Some(storage), Some(public)) => {
                let hex = storage.to_hex();
                if !public.eq_ignore_ascii_case(&hex) {
                    return Err(NormalizeError::Conflict {
                        storage: hex,
                        public: public.to_string(),
                    });
                }
                self.id = Some(hex);
                self.storage = None;
                Ok(())
            }
            (None, Some(_)) => Ok(()),
            (None, None) => Err(NormalizeError::MissingId),
        }
    }

    /// Parse the public id back into the storage slot.
    pub fn to_storage(&mut self) -> Result<(), NormalizeError> {
        let storage = self.storage_id()?;
        self.storage = Some(storage);
        self.id = None;
        Ok(())
    }

    /// Storage id of the document, whichever form it is currently in.
    pub fn storage_id(&self) -> Result<StorageId, NormalizeError> {
        match (self.storage, self.id.as_deref()) {
            (Some(storage), None) => Ok(storage),
            (Some(storage), Some(public)) => {
                if public.eq_ignore_ascii_case(&storage.to_hex()) {
                    Ok(storage)
                } else {
                    Err(NormalizeError::Conflict {
                        storage: storage.to_hex(),
                        public: public.to_string(),
                    })
                }
            }
            (None, Some(public)) => public
                .parse()
                .map_err(|_| NormalizeError::InvalidPublicId(public.to_string())),
            (None, None) => Err(NormalizeError::MissingId),
        }
    }
}

/// Anything carrying a [`DocKey`].
pub trait Document {
    fn key(&self) -> &DocKey;
    fn key_mut(&mut self) -> &mut DocKey;

    /// Walk the closed set of nested collections the document may carry.
    /// Leaf documents have none.
    fn for_each_nested(
        &mut self,
        _f: &mut dyn FnMut(&mut DocKey) -> Result<(), NormalizeError>,
    ) -> Result<(), NormalizeError> {
        Ok(())
    }
}

macro_rules! leaf_document {
    ($($ty:ty),* $(,)?) => {
        $(impl Document for $ty {
            fn key(&self) -> &DocKey {
                &self.key
            }
            fn key_mut(&mut self) -> &mut DocKey {
                &mut self.key
            }
        })*
    };
}

leaf_document!(Flavor, Attribute, Plague, Image, Irrigation);

fn visit_keys<T: Document>(
    items: &mut Option<Vec<T>>,
    f: &mut dyn FnMut(&mut DocKey) -> Result<(), NormalizeError>,
) -> Result<(), NormalizeError> {
    if let Some(items) = items {
        for item in items.iter_mut() {
            f(item.key_mut())?;
            item.for_each_nested(f)?;
        }
    }
    Ok(())
}

impl Document for Plant {
    fn key(&self) -> &DocKey {
        &self.key
    }

    fn key_mut(&mut self) -> &mut DocKey {
        &mut self.key
    }

    fn for_each_nested(
        &mut self,
        f: &mut dyn FnMut(&mut DocKey) -> Result<(), NormalizeError>,
    ) -> Result<(), NormalizeError> {
        visit_keys(&mut self.flavors, f)?;
        visit_keys(&mut self.attributes, f)?;
        visit_keys(&mut self.plagues, f)?;
        visit_keys(&mut self.images, f)
    }
}

impl Document for Garden {
    fn key(&self) -> &DocKey {
        &self.key
    }

    fn key_mut(&mut self) -> &mut DocKey {
        &mut self.key
    }

    fn for_each_nested(
        &mut self,
        f: &mut dyn FnMut(&mut DocKey) -> Result<(), NormalizeError>,
    ) -> Result<(), NormalizeError> {
        visit_keys(&mut self.plants, f)?;
        visit_keys(&mut self.irrigations, f)
    }
}

/// Normalize a single document's own key. An absent document is a no-op.
pub fn normalize_one<T: Document + ?Sized>(entity: Option<&mut T>) -> Result<(), NormalizeError> {
    match entity {
        Some(entity) => entity.key_mut().normalize(),
        None => Ok(()),
    }
}

/// Normalize every element in order. Stops at the first failure: elements
/// before it stay normalized, the failing one and those after it are untouched.
pub fn normalize_many<T: Document>(entities: &mut [T]) -> Result<(), NormalizeError> {
    entities
        .iter_mut()
        .try_for_each(|entity| normalize_one(Some(entity)))
}

/// Normalize a document and every known nested collection it carries.
/// Absent collections are skipped.
pub fn normalize_nested<T: Document + ?Sized>(entity: &mut T) -> Result<(), NormalizeError> {
    entity.key_mut().normalize()?;
    entity.for_each_nested(&mut |key| key.normalize())
}

pub fn normalize_many_nested<T: Document>(entities: &mut [T]) -> Result<(), NormalizeError> {
    entities.iter_mut().try_for_each(|entity| normalize_nested(entity))
}

/// Reverse of [`normalize_nested`]: turn public ids back into storage ids.
pub fn to_storage_nested<T: Document + ?Sized>(entity: &mut T) -> Result<(), NormalizeError> {
    entity.key_mut().to_storage()?;
    entity.for_each_nested(&mut |key| key.to_storage())
}
