use crate::types::{Money, ReleaseYear};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── Tier adjustment ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    /// Name tokens marking a flagship device ("Pro", "Ultra", "Max").
    pub premium_markers: Vec<String>,
    /// Name tokens marking a budget device ("SE", "mini").
    pub budget_markers: Vec<String>,
    pub premium_multiplier: f64,
    pub budget_multiplier: f64,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            premium_markers: vec!["Pro".into(), "Ultra".into(), "Max".into()],
            budget_markers: vec!["SE".into(), "mini".into()],
            premium_multiplier: 1.15,
            budget_multiplier: 0.85,
        }
    }
}

// ── Confidence tiers ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    pub exact: f64,
    pub interpolation: f64,
    pub extrapolation: f64,
    /// Subtracted per year of distance beyond the first.
    pub extrapolation_decay_per_year: f64,
    pub extrapolation_floor: f64,
    pub category_average: f64,
    pub fallback: f64,
    /// Estimates below this are queued for operator review.
    pub review_threshold: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            exact: 1.0,
            interpolation: 0.85,
            extrapolation: 0.60,
            extrapolation_decay_per_year: 0.05,
            extrapolation_floor: 0.35,
            category_average: 0.40,
            fallback: 0.20,
            review_threshold: 0.5,
        }
    }
}

// ── Estimator ──────────────────────────────────────────────────────

/// Widest accepted comparable window, in years either side of the target.
pub const MAX_REFERENCE_WINDOW_YEARS: ReleaseYear = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Comparable devices must be released within ± this many years.
    pub reference_window_years: ReleaseYear,
    /// Fractional price drift per year used by extrapolation.
    pub drift_rate_per_year: f64,
    pub tier: TierConfig,
    pub confidence: ConfidenceConfig,
    /// Last-resort prices keyed by repair-type category. Hand-picked
    /// defaults, not derived from data.
    pub baseline_prices: HashMap<String, Money>,
    /// Baseline for categories missing from `baseline_prices`.
    pub default_baseline_price: Money,
    pub busy_timeout_ms: u64,
    /// Stamped on every estimation_log row.
    pub algorithm_version: String,
}

#[derive(Debug, Clone, Deserialize)]
struct EstimatorConfigFile {
    estimator: EstimatorConfig,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        let baseline_prices = [
            ("screen".to_string(), 199.0),
            ("battery".to_string(), 99.0),
            ("back_panel".to_string(), 79.0),
            ("charging_port".to_string(), 89.0),
            ("camera".to_string(), 129.0),
        ]
        .into();

        Self {
            reference_window_years: 3,
            drift_rate_per_year: 0.05,
            tier: TierConfig::default(),
            confidence: ConfidenceConfig::default(),
            baseline_prices,
            default_baseline_price: 99.0,
            busy_timeout_ms: crate::store::DEFAULT_BUSY_TIMEOUT_MS,
            algorithm_version: format!("smart-pricing-{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl EstimatorConfig {
    /// Load from `<data_dir>/pricing/estimator_config.json`.
    /// In tests, use EstimatorConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/pricing/estimator_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: EstimatorConfigFile = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        file.estimator.validate()?;
        Ok(file.estimator)
    }

    /// Config with hardcoded defaults for use in tests.
    pub fn default_test() -> Self {
        Self {
            algorithm_version: "smart-pricing-test".into(),
            ..Self::default()
        }
    }

    /// Baseline price for a repair-type category.
    pub fn baseline_price(&self, category: &str) -> Money {
        self.baseline_prices
            .get(&category.trim().to_ascii_lowercase())
            .copied()
            .unwrap_or(self.default_baseline_price)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0..=MAX_REFERENCE_WINDOW_YEARS).contains(&self.reference_window_years) {
            anyhow::bail!(
                "reference_window_years must be in [0, {MAX_REFERENCE_WINDOW_YEARS}], got {}",
                self.reference_window_years
            );
        }
        if !(0.0..1.0).contains(&self.drift_rate_per_year) {
            anyhow::bail!(
                "drift_rate_per_year must be in [0, 1), got {}",
                self.drift_rate_per_year
            );
        }
        let c = &self.confidence;
        for (name, value) in [
            ("exact", c.exact),
            ("interpolation", c.interpolation),
            ("extrapolation", c.extrapolation),
            ("extrapolation_floor", c.extrapolation_floor),
            ("category_average", c.category_average),
            ("fallback", c.fallback),
            ("review_threshold", c.review_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("confidence.{name} must be in [0, 1], got {value}");
            }
        }
        if c.extrapolation_floor > c.extrapolation {
            anyhow::bail!(
                "confidence.extrapolation_floor ({}) exceeds confidence.extrapolation ({})",
                c.extrapolation_floor,
                c.extrapolation
            );
        }
        if c.extrapolation_decay_per_year < 0.0 {
            anyhow::bail!("confidence.extrapolation_decay_per_year must be non-negative");
        }
        if self.tier.premium_multiplier <= 0.0 || self.tier.budget_multiplier <= 0.0 {
            anyhow::bail!("tier multipliers must be positive");
        }
        if let Some((category, price)) =
            self.baseline_prices.iter().find(|(_, p)| **p <= 0.0)
        {
            anyhow::bail!("baseline price for '{category}' must be positive, got {price}");
        }
        if self.default_baseline_price <= 0.0 {
            anyhow::bail!("default_baseline_price must be positive");
        }
        Ok(())
    }
}
