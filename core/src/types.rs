//! Shared primitive types used across the pricing core.

pub type BrandId = i64;

pub type DeviceModelId = i64;

pub type RepairTypeId = i64;

pub type PartQualityId = i64;

pub type PriceRecordId = i64;

/// Calendar year a device model was released.
pub type ReleaseYear = i32;

/// Shop currency amount. Estimated prices are whole units after rounding.
pub type Money = f64;
