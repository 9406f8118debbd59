//! Psychological price rounding: snap to a magnitude-dependent step, then
//! drop one unit so the price ends in 9 (150 -> 149, 200 -> 199).

use crate::types::Money;

/// (exclusive upper bound, step). Every step is a multiple of 10, which
/// keeps all outputs ending in 9 and the function idempotent.
const STEPS: [(Money, Money); 2] = [(200.0, 10.0), (1_000.0, 50.0)];
const LARGE_STEP: Money = 100.0;

fn step_for(price: Money) -> Money {
    STEPS
        .iter()
        .find(|(upper, _)| price < *upper)
        .map(|(_, step)| *step)
        .unwrap_or(LARGE_STEP)
}

/// Round `price` to the market convention. Non-positive and non-finite
/// input yields 0.
pub fn psychological_round(price: Money) -> Money {
    if !price.is_finite() {
        return 0.0;
    }
    let whole = price.round();
    if whole <= 0.0 {
        return 0.0;
    }
    if whole % 10.0 == 9.0 {
        return whole;
    }
    let step = step_for(whole);
    let stepped = (whole / step).round() * step;
    if stepped <= 0.0 {
        return 9.0;
    }
    stepped - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_down_to_nine_ending() {
        assert_eq!(psychological_round(152.0), 149.0);
        assert_eq!(psychological_round(201.0), 199.0);
        assert_eq!(psychological_round(150.0), 149.0);
    }

    #[test]
    fn nine_ending_is_unchanged() {
        assert_eq!(psychological_round(149.0), 149.0);
        assert_eq!(psychological_round(449.0), 449.0);
        assert_eq!(psychological_round(1_049.0), 1_049.0);
        // Cents are rounded away first.
        assert_eq!(psychological_round(148.6), 149.0);
    }

    #[test]
    fn step_grows_with_magnitude() {
        assert_eq!(psychological_round(155.0), 159.0);
        assert_eq!(psychological_round(287.5), 299.0);
        assert_eq!(psychological_round(455.0), 449.0);
        assert_eq!(psychological_round(1_234.0), 1_199.0);
    }

    #[test]
    fn tiny_and_non_positive_prices() {
        assert_eq!(psychological_round(3.0), 9.0);
        assert_eq!(psychological_round(0.2), 0.0);
        assert_eq!(psychological_round(0.0), 0.0);
        assert_eq!(psychological_round(-25.0), 0.0);
        assert_eq!(psychological_round(f64::NAN), 0.0);
    }

    #[test]
    fn rounding_is_idempotent() {
        let mut price = 0.0;
        while price < 3_000.0 {
            let once = psychological_round(price);
            assert_eq!(psychological_round(once), once, "not idempotent at {price}");
            price += 0.75;
        }
    }
}
