//! Market-tier adjustment inferred from a device's display name.
//!
//! Known weakness: names are a proxy for tier. "iPhone 12 mini" and
//! "Galaxy S23 Ultra" classify correctly; a device whose name carries no
//! marker (or a misleading one) does not. An explicit tier column on
//! device_model would replace this.

use crate::{config::TierConfig, types::Money};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceTier {
    Flagship,
    Standard,
    Budget,
}

impl DeviceTier {
    /// Premium markers win over budget markers ("iPhone SE Pro" is flagship).
    /// Markers match whole alphanumeric tokens, case-insensitively, so
    /// "Promo" is not "Pro".
    pub fn infer(name: &str, cfg: &TierConfig) -> Self {
        let tokens: Vec<String> = name
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();
        let has_marker = |markers: &[String]| {
            markers
                .iter()
                .any(|m| tokens.iter().any(|t| *t == m.to_lowercase()))
        };

        if has_marker(&cfg.premium_markers) {
            Self::Flagship
        } else if has_marker(&cfg.budget_markers) {
            Self::Budget
        } else {
            Self::Standard
        }
    }

    pub fn multiplier(&self, cfg: &TierConfig) -> f64 {
        match self {
            Self::Flagship => cfg.premium_multiplier,
            Self::Standard => 1.0,
            Self::Budget   => cfg.budget_multiplier,
        }
    }
}

/// Scale `base_price` by the tier inferred from `device_name`.
pub fn apply_tier_adjustment(base_price: Money, device_name: &str, cfg: &TierConfig) -> (Money, DeviceTier) {
    let tier = DeviceTier::infer(device_name, cfg);
    (base_price * tier.multiplier(cfg), tier)
}
