use crate::types::{DeviceModelId, PartQualityId, RepairTypeId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PricingError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Device model {device_model_id} not found")]
    DeviceNotFound { device_model_id: DeviceModelId },

    #[error("Repair type {repair_type_id} not found")]
    RepairTypeNotFound { repair_type_id: RepairTypeId },

    #[error("Part quality {part_quality_id} not found")]
    PartQualityNotFound { part_quality_id: PartQualityId },

    #[error(
        "Concurrent write on price ({device_model_id}, {repair_type_id}, {part_quality_id})"
    )]
    PersistenceConflict {
        device_model_id: DeviceModelId,
        repair_type_id:  RepairTypeId,
        part_quality_id: PartQualityId,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type PricingResult<T> = Result<T, PricingError>;
