//! Error taxonomy for the store layer, the normalizer and the aggregator.

use crate::model::StorageId;
use thiserror::Error;

/// Failure of a single entity-store call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("malformed {entity} record: {reason}")]
    Malformed {
        entity: &'static str,
        reason: String,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn malformed(entity: &'static str, reason: impl Into<String>) -> Self {
        StoreError::Malformed {
            entity,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("document carries no identifier")]
    MissingId,
    #[error("storage id {storage} disagrees with public id {public}")]
    Conflict { storage: String, public: String },
    #[error("invalid public id: {0:?}")]
    InvalidPublicId(String),
}

/// A sub-lookup of a composition failed. Carries the originating cause.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to load garden {garden}")]
    Garden {
        garden: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to list plants of garden {garden}")]
    Plants {
        garden: StorageId,
        #[source]
        source: StoreError,
    },
    #[error("failed to list irrigations of garden {garden}")]
    Irrigations {
        garden: StorageId,
        #[source]
        source: StoreError,
    },
    #[error("failed to load plant {plant}")]
    Plant {
        plant: StorageId,
        #[source]
        source: StoreError,
    },
    #[error("identifier normalization failed: {0}")]
    Normalize(#[from] NormalizeError),
}

impl LookupError {
    /// The store failure behind this lookup, if the lookup reached a store.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            LookupError::Garden { source, .. }
            | LookupError::Plants { source, .. }
            | LookupError::Irrigations { source, .. }
            | LookupError::Plant { source, .. } => Some(source),
            LookupError::Normalize(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: StorageId },
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl ComposeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ComposeError::NotFound { .. })
    }
}
