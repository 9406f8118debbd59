//! Price records and their audit trail.

use crate::types::{
    DeviceModelId, Money, PartQualityId, PriceRecordId, ReleaseYear, RepairTypeId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The tuple a price record is keyed on. At most one active record
/// exists per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceKey {
    pub device_model_id: DeviceModelId,
    pub repair_type_id:  RepairTypeId,
    pub part_quality_id: PartQualityId,
}

impl PriceKey {
    pub fn new(
        device_model_id: DeviceModelId,
        repair_type_id: RepairTypeId,
        part_quality_id: PartQualityId,
    ) -> Self {
        Self { device_model_id, repair_type_id, part_quality_id }
    }
}

impl fmt::Display for PriceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "device={} repair={} part={}",
            self.device_model_id, self.repair_type_id, self.part_quality_id
        )
    }
}

/// How a price was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationMethod {
    Exact,
    Interpolation,
    Extrapolation,
    CategoryAverage,
    Fallback,
}

impl EstimationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact           => "exact",
            Self::Interpolation   => "interpolation",
            Self::Extrapolation   => "extrapolation",
            Self::CategoryAverage => "category_average",
            Self::Fallback        => "fallback",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "exact"            => Some(Self::Exact),
            "interpolation"    => Some(Self::Interpolation),
            "extrapolation"    => Some(Self::Extrapolation),
            "category_average" => Some(Self::CategoryAverage),
            "fallback"         => Some(Self::Fallback),
            _ => None,
        }
    }
}

impl fmt::Display for EstimationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecord {
    pub price_record_id: PriceRecordId,
    pub key:             PriceKey,
    pub price:           Money,
    pub cost:            Option<Money>,
    pub is_estimated:    bool,
    /// Present only on estimated records.
    pub confidence:      Option<f64>,
    pub notes:           String,
    pub is_active:       bool,
    pub valid_from:      DateTime<Utc>,
    pub valid_until:     Option<DateTime<Utc>>,
    pub updated_at:      DateTime<Utc>,
}

/// Insert payload for a fresh price record.
#[derive(Debug, Clone)]
pub struct NewPriceRecord {
    pub key:          PriceKey,
    pub price:        Money,
    pub cost:         Option<Money>,
    pub is_estimated: bool,
    pub confidence:   Option<f64>,
    pub notes:        String,
    pub valid_from:   DateTime<Utc>,
}

/// An operator-entered price.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedPrice {
    pub key:    PriceKey,
    pub price:  Money,
    #[serde(default)]
    pub cost:   Option<Money>,
    #[serde(default)]
    pub notes:  String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistoryEntry {
    pub id:              Option<i64>,
    pub price_record_id: PriceRecordId,
    pub old_price:       Money,
    pub new_price:       Money,
    pub old_cost:        Option<Money>,
    pub new_cost:        Option<Money>,
    pub reason:          String,
    pub changed_at:      DateTime<Utc>,
}

/// Provenance row written alongside every persisted estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationLogEntry {
    pub id:                   Option<i64>,
    pub price_record_id:      PriceRecordId,
    pub key:                  PriceKey,
    pub old_price:            Option<Money>,
    pub new_price:            Money,
    pub method:               EstimationMethod,
    pub confidence:           f64,
    pub reference_device_ids: Vec<DeviceModelId>,
    pub algorithm_version:    String,
    pub created_at:           DateTime<Utc>,
}

/// A confirmed price on a comparable device, as used for estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePrice {
    pub price_record_id: PriceRecordId,
    pub device_model_id: DeviceModelId,
    pub release_year:    Option<ReleaseYear>,
    pub price:           Money,
    pub cost:            Option<Money>,
}
