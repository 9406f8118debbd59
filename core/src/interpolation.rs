//! Bracketing and linear interpolation over release year.
//!
//! Repair part prices are assumed to drift roughly linearly with device
//! generation, so a device released between two priced devices gets the
//! straight-line price between them.

use crate::{
    price::ReferencePrice,
    types::{DeviceModelId, Money, ReleaseYear},
};

/// Nearest priced devices released before and after the target.
#[derive(Debug, Clone, Copy)]
pub struct Bracket<'a> {
    pub older: &'a ReferencePrice,
    pub newer: &'a ReferencePrice,
    older_year: ReleaseYear,
    newer_year: ReleaseYear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Interpolated {
    pub price: Money,
    /// Only when both brackets carry a cost.
    pub cost: Option<Money>,
    pub reference_device_ids: Vec<DeviceModelId>,
}

/// Find the closest older and closest newer reference around `target_year`.
///
/// `references` must be sorted by release year ascending. References with
/// an unknown year sit on neither side. None when either side is empty.
pub fn find_bracket(references: &[ReferencePrice], target_year: ReleaseYear) -> Option<Bracket<'_>> {
    let older = references
        .iter()
        .filter_map(|r| r.release_year.map(|y| (r, y)))
        .filter(|(_, y)| *y < target_year)
        .last()?;
    let newer = references
        .iter()
        .filter_map(|r| r.release_year.map(|y| (r, y)))
        .find(|(_, y)| *y > target_year)?;

    Some(Bracket {
        older: older.0,
        newer: newer.0,
        older_year: older.1,
        newer_year: newer.1,
    })
}

impl Bracket<'_> {
    /// Both ends released the same year; no slope to interpolate along.
    pub fn is_degenerate(&self) -> bool {
        self.older_year == self.newer_year
    }

    /// None for a degenerate bracket.
    pub fn interpolate(&self, target_year: ReleaseYear) -> Option<Interpolated> {
        if self.is_degenerate() {
            return None;
        }
        let price = lerp(
            self.older_year,
            self.older.price,
            self.newer_year,
            self.newer.price,
            target_year,
        );
        let cost = match (self.older.cost, self.newer.cost) {
            (Some(oc), Some(nc)) => {
                Some(lerp(self.older_year, oc, self.newer_year, nc, target_year))
            }
            _ => None,
        };
        Some(Interpolated {
            price,
            cost,
            reference_device_ids: vec![self.older.device_model_id, self.newer.device_model_id],
        })
    }
}

/// Straight line through (older_year, older_value) and (newer_year, newer_value)
/// evaluated at `target_year`. Callers guarantee `older_year != newer_year`.
pub fn lerp(
    older_year: ReleaseYear,
    older_value: Money,
    newer_year: ReleaseYear,
    newer_value: Money,
    target_year: ReleaseYear,
) -> Money {
    let span = (newer_year - older_year) as f64;
    let offset = (target_year - older_year) as f64;
    older_value + (newer_value - older_value) * offset / span
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(device: i64, year: Option<i32>, price: f64) -> ReferencePrice {
        ReferencePrice {
            price_record_id: device * 10,
            device_model_id: device,
            release_year: year,
            price,
            cost: None,
        }
    }

    #[test]
    fn interpolates_between_brackets() {
        let refs = vec![reference(1, Some(2020), 200.0), reference(2, Some(2022), 300.0)];
        let bracket = find_bracket(&refs, 2021).unwrap();
        let result = bracket.interpolate(2021).unwrap();
        assert_eq!(result.price, 250.0);
        assert_eq!(result.reference_device_ids, vec![1, 2]);
    }

    #[test]
    fn midpoint_is_mean() {
        let refs = vec![reference(1, Some(2018), 180.0), reference(2, Some(2022), 260.0)];
        let result = find_bracket(&refs, 2020).unwrap().interpolate(2020).unwrap();
        assert_eq!(result.price, (180.0 + 260.0) / 2.0);
    }

    #[test]
    fn picks_closest_on_each_side() {
        let refs = vec![
            reference(1, Some(2017), 120.0),
            reference(2, Some(2019), 160.0),
            reference(3, Some(2023), 320.0),
            reference(4, Some(2024), 400.0),
        ];
        let bracket = find_bracket(&refs, 2021).unwrap();
        assert_eq!(bracket.older.device_model_id, 2);
        assert_eq!(bracket.newer.device_model_id, 3);
        assert_eq!(bracket.interpolate(2021).unwrap().price, 240.0);
    }

    #[test]
    fn one_sided_has_no_bracket() {
        let refs = vec![reference(1, Some(2018), 150.0), reference(2, Some(2019), 170.0)];
        assert!(find_bracket(&refs, 2021).is_none());
        assert!(find_bracket(&refs, 2017).is_none());
        // Same-year siblings are neither older nor newer.
        assert!(find_bracket(&refs, 2019).is_none());
    }

    #[test]
    fn unknown_years_are_ignored() {
        let refs = vec![
            reference(1, None, 999.0),
            reference(2, Some(2020), 200.0),
            reference(3, Some(2022), 300.0),
        ];
        let bracket = find_bracket(&refs, 2021).unwrap();
        assert_eq!(bracket.older.device_model_id, 2);
    }

    #[test]
    fn cost_interpolates_when_both_sides_have_it() {
        let mut older = reference(1, Some(2020), 200.0);
        let mut newer = reference(2, Some(2022), 300.0);
        older.cost = Some(80.0);
        newer.cost = Some(120.0);
        let refs = vec![older, newer];
        let result = find_bracket(&refs, 2021).unwrap().interpolate(2021).unwrap();
        assert_eq!(result.cost, Some(100.0));
    }
}
