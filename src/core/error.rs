//! Error types shared across the engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Zone not found: {0:?}")]
    ZoneNotFound(crate::core::types::ZoneId),

    #[error("Live store error: {0}")]
    LiveStore(String),

    #[error("Spawn error: {0}")]
    Spawn(String),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SeedError>;
