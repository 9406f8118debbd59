//! Brand-agnostic fallback for devices with no same-brand comparables.

use crate::{
    catalog::RepairType,
    config::EstimatorConfig,
    error::PricingResult,
    store::PriceStore,
    types::{Money, PartQualityId},
};

#[derive(Debug, Clone, PartialEq)]
pub enum CategoryEstimate {
    /// Mean of every confirmed price for the repair type and part quality.
    Average { price: Money, cost: Option<Money>, sample_count: i64 },
    /// Hard-coded last resort from the baseline table.
    Baseline { price: Money, category: String },
}

impl CategoryEstimate {
    pub fn price(&self) -> Money {
        match self {
            Self::Average { price, .. } | Self::Baseline { price, .. } => *price,
        }
    }
}

pub fn category_average(
    store: &PriceStore,
    config: &EstimatorConfig,
    repair_type: &RepairType,
    part_quality_id: PartQualityId,
) -> PricingResult<CategoryEstimate> {
    let mean = store.confirmed_category_average(repair_type.repair_type_id, part_quality_id)?;
    let count = mean.sample_count;

    match mean.price {
        Some(price) if count > 0 => {
            log::debug!(
                "category average for repair={} part={part_quality_id}: {price:.2} over {count} prices",
                repair_type.repair_type_id
            );
            Ok(CategoryEstimate::Average { price, cost: mean.cost, sample_count: count })
        }
        _ => {
            let price = config.baseline_price(&repair_type.category);
            log::debug!(
                "no confirmed prices for repair={} part={part_quality_id}; baseline {} = {price:.2}",
                repair_type.repair_type_id,
                repair_type.category
            );
            Ok(CategoryEstimate::Baseline {
                price,
                category: repair_type.category.clone(),
            })
        }
    }
}
