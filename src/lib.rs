pub mod aggregator;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod normalize;
pub mod seed;
pub mod store;

pub use aggregator::GardenAggregator;
pub use error::{ComposeError, LookupError, NormalizeError, StoreError};
