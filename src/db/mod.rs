//! Database module: row models and the SQLite entity store.
//!
//! This module is split into two submodules:
//! - `model`: row types and their mapping into domain entities.
//! - `repo`: pool setup, the `SqliteStore` accessor implementation and the
//!   write helpers used by the fixture loader.

pub mod model;
pub mod repo;

pub use repo::*;
