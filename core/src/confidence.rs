//! Confidence scoring by estimation method.

use crate::{config::ConfidenceConfig, price::EstimationMethod};

#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    cfg: ConfidenceConfig,
}

impl ConfidenceScorer {
    pub fn new(cfg: ConfidenceConfig) -> Self {
        Self { cfg }
    }

    /// `year_distance` only matters for extrapolation: the first year is
    /// free, each further year costs `extrapolation_decay_per_year`, never
    /// dropping below `extrapolation_floor`.
    pub fn score(&self, method: EstimationMethod, year_distance: u32) -> f64 {
        match method {
            EstimationMethod::Exact           => self.cfg.exact,
            EstimationMethod::Interpolation   => self.cfg.interpolation,
            EstimationMethod::Extrapolation   => {
                let extra_years = year_distance.saturating_sub(1) as f64;
                let decayed =
                    self.cfg.extrapolation - self.cfg.extrapolation_decay_per_year * extra_years;
                decayed.max(self.cfg.extrapolation_floor)
            }
            EstimationMethod::CategoryAverage => self.cfg.category_average,
            EstimationMethod::Fallback        => self.cfg.fallback,
        }
    }

    pub fn needs_review(&self, confidence: f64) -> bool {
        confidence < self.cfg.review_threshold
    }

    pub fn review_threshold(&self) -> f64 {
        self.cfg.review_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn fixed_tiers() {
        let s = ConfidenceScorer::new(ConfidenceConfig::default());
        assert_eq!(s.score(EstimationMethod::Exact, 0), 1.0);
        assert_eq!(s.score(EstimationMethod::Interpolation, 0), 0.85);
        assert_eq!(s.score(EstimationMethod::CategoryAverage, 0), 0.40);
        assert_eq!(s.score(EstimationMethod::Fallback, 0), 0.20);
    }

    #[test]
    fn extrapolation_decays_to_floor() {
        let s = ConfidenceScorer::new(ConfidenceConfig::default());
        assert!(approx(s.score(EstimationMethod::Extrapolation, 0), 0.60));
        assert!(approx(s.score(EstimationMethod::Extrapolation, 1), 0.60));
        assert!(approx(s.score(EstimationMethod::Extrapolation, 2), 0.55));
        assert!(approx(s.score(EstimationMethod::Extrapolation, 6), 0.35));
        assert!(approx(s.score(EstimationMethod::Extrapolation, 40), 0.35));
    }

    #[test]
    fn review_flag_uses_threshold() {
        let s = ConfidenceScorer::new(ConfidenceConfig::default());
        assert!(s.needs_review(0.40));
        assert!(s.needs_review(0.20));
        assert!(!s.needs_review(0.5));
        assert!(!s.needs_review(0.85));
    }
}
