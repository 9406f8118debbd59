//! Reference set: confirmed prices on comparable devices.
//!
//! Comparable = same brand, same repair type, same part quality, released
//! within the configured window of the target (when the target's release
//! year is known).

use crate::{
    catalog::DeviceModel,
    error::{PricingError, PricingResult},
    price::{PriceKey, ReferencePrice},
    store::PriceStore,
    types::ReleaseYear,
};

#[derive(Debug, Clone)]
pub struct ReferenceSet {
    pub target: DeviceModel,
    /// Sorted by release year ascending.
    pub references: Vec<ReferencePrice>,
}

impl ReferenceSet {
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

pub struct ReferenceSetBuilder<'a> {
    store: &'a PriceStore,
    window_years: ReleaseYear,
}

impl<'a> ReferenceSetBuilder<'a> {
    pub fn new(store: &'a PriceStore, window_years: ReleaseYear) -> Self {
        Self { store, window_years }
    }

    /// Fails with `DeviceNotFound` when the key's device does not resolve.
    pub fn build(&self, key: &PriceKey) -> PricingResult<ReferenceSet> {
        let target = self
            .store
            .device_model(key.device_model_id)?
            .ok_or(PricingError::DeviceNotFound {
                device_model_id: key.device_model_id,
            })?;

        let years = year_window(target.release_year, self.window_years);
        let references = self.store.confirmed_reference_prices(
            target.brand_id,
            key.repair_type_id,
            key.part_quality_id,
            target.device_model_id,
            years,
        )?;

        log::debug!(
            "reference set for {key}: {} comparables (window={:?})",
            references.len(),
            years
        );

        Ok(ReferenceSet { target, references })
    }
}

/// Inclusive release-year range around `target_year`; None (no
/// restriction) when the year is unknown.
pub fn year_window(
    target_year: Option<ReleaseYear>,
    window_years: ReleaseYear,
) -> Option<(ReleaseYear, ReleaseYear)> {
    target_year.map(|y| (y.saturating_sub(window_years), y.saturating_add(window_years)))
}
