//! One-sided price projection from the single closest reference.

use crate::{
    price::ReferencePrice,
    types::{DeviceModelId, Money, ReleaseYear},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Extrapolated {
    pub price: Money,
    pub cost: Option<Money>,
    pub reference_device_id: DeviceModelId,
    /// Absolute years between target and reference; 0 when unknown.
    pub year_distance: u32,
}

/// The reference closest to `target_year` by absolute distance; ties go to
/// the newer device. With no target year, the newest reference with a
/// known year (else the last one).
pub fn closest_reference(
    references: &[ReferencePrice],
    target_year: Option<ReleaseYear>,
) -> Option<&ReferencePrice> {
    match target_year {
        Some(target) => references
            .iter()
            .filter_map(|r| r.release_year.map(|y| (r, y)))
            .min_by_key(|(_, y)| ((target - *y).abs(), std::cmp::Reverse(*y)))
            .map(|(r, _)| r)
            .or_else(|| references.last()),
        None => references
            .iter()
            .rev()
            .find(|r| r.release_year.is_some())
            .or_else(|| references.last()),
    }
}

/// Scale `price` by `drift_rate` per year from `reference_year` to
/// `target_year`: up for newer targets, down for older. Never negative.
pub fn project(price: Money, reference_year: ReleaseYear, target_year: ReleaseYear, drift_rate: f64) -> Money {
    let years = (target_year - reference_year) as f64;
    (price * (1.0 + drift_rate * years)).max(0.0)
}

pub fn extrapolate(
    references: &[ReferencePrice],
    target_year: Option<ReleaseYear>,
    drift_rate: f64,
) -> Option<Extrapolated> {
    let reference = closest_reference(references, target_year)?;

    let (price, cost, year_distance) = match (target_year, reference.release_year) {
        (Some(target), Some(ref_year)) => (
            project(reference.price, ref_year, target, drift_rate),
            reference.cost.map(|c| project(c, ref_year, target, drift_rate)),
            (target - ref_year).unsigned_abs(),
        ),
        _ => (reference.price, reference.cost, 0),
    };

    Some(Extrapolated {
        price,
        cost,
        reference_device_id: reference.device_model_id,
        year_distance,
    })
}
