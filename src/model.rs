//! Domain entities shared by the store layer and the aggregator.
//!
//! Every entity embeds a [`DocKey`], which carries the two representations of
//! its identifier: the storage-native [`StorageId`] (`_id`) and the public hex
//! form (`id`). Stores hand out entities keyed by storage id; the normalizer
//! turns them into public form before they leave the crate.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

static PUBLIC_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{24}$").expect("valid public id regex"));

pub const STORAGE_ID_LEN: usize = 12;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid public id: {0:?}")]
pub struct ParseIdError(pub String);

/// Storage-native identifier: 12 raw bytes, persisted as a BLOB.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageId([u8; STORAGE_ID_LEN]);

impl StorageId {
    /// Fresh random id.
    pub fn generate() -> Self {
        let uuid = uuid::Uuid::new_v4();
        let mut bytes = [0u8; STORAGE_ID_LEN];
        bytes.copy_from_slice(&uuid.as_bytes()[..STORAGE_ID_LEN]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; STORAGE_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; STORAGE_ID_LEN] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; STORAGE_ID_LEN] {
        &self.0
    }

    /// Public form: 24 lowercase hex characters.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn is_public_id(s: &str) -> bool {
        PUBLIC_ID_RE.is_match(s)
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageId({})", self.to_hex())
    }
}

impl FromStr for StorageId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Self::is_public_id(s) {
            return Err(ParseIdError(s.to_string()));
        }
        let mut bytes = [0u8; STORAGE_ID_LEN];
        for (i, slot) in bytes.iter_mut().enumerate() {
            *slot = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| ParseIdError(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for StorageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for StorageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Both identifier slots of a document. At most one of them is expected to be
/// populated at a time; the normalizer moves the value from `storage` to `id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocKey {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl DocKey {
    pub fn stored(id: StorageId) -> Self {
        Self {
            storage: Some(id),
            id: None,
        }
    }

    pub fn public(id: impl Into<String>) -> Self {
        Self {
            storage: None,
            id: Some(id.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Garden {
    #[serde(flatten)]
    pub key: DocKey,
    pub name: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Attached at aggregation time, never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plants: Option<Vec<Plant>>,
    /// Attached at aggregation time, never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irrigations: Option<Vec<Irrigation>>,
}

impl Garden {
    pub fn new(name: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            key: DocKey::stored(StorageId::generate()),
            name: name.into(),
            started_at,
            ended_at: None,
            plants: None,
            irrigations: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    #[serde(flatten)]
    pub key: DocKey,
    pub garden_id: StorageId,
    pub name: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genotype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavors: Option<Vec<Flavor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<Attribute>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plagues: Option<Vec<Plague>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<Image>>,
}

impl Plant {
    pub fn new(garden_id: StorageId, name: impl Into<String>) -> Self {
        Self {
            key: DocKey::stored(StorageId::generate()),
            garden_id,
            name: name.into(),
            size: 0,
            genotype: None,
            phase: None,
            flavors: None,
            attributes: None,
            plagues: None,
            images: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flavor {
    #[serde(flatten)]
    pub key: DocKey,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(flatten)]
    pub key: DocKey,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plague {
    #[serde(flatten)]
    pub key: DocKey,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    #[serde(flatten)]
    pub key: DocKey,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Irrigation {
    #[serde(flatten)]
    pub key: DocKey,
    pub garden_id: StorageId,
    pub done_at: DateTime<Utc>,
    /// Litres of water.
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrients: Option<String>,
}

impl Irrigation {
    pub fn new(garden_id: StorageId, done_at: DateTime<Utc>, quantity: f64) -> Self {
        Self {
            key: DocKey::stored(StorageId::generate()),
            garden_id,
            done_at,
            quantity,
            nutrients: None,
        }
    }
}
