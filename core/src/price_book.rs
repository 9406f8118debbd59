//! Operator-facing price maintenance: confirming prices, retiring them,
//! and the review/audit views over what the estimator wrote.

use crate::{
    config::EstimatorConfig,
    error::{PricingError, PricingResult},
    price::{ConfirmedPrice, EstimationLogEntry, NewPriceRecord, PriceHistoryEntry, PriceRecord},
    store::{PriceStore, PricingStats},
    types::PriceRecordId,
};
use chrono::Utc;

pub struct PriceBook<'a> {
    store:  &'a PriceStore,
    config: &'a EstimatorConfig,
}

impl<'a> PriceBook<'a> {
    pub fn new(store: &'a PriceStore, config: &'a EstimatorConfig) -> Self {
        Self { store, config }
    }

    /// Record an operator-confirmed price for a tuple.
    ///
    /// An existing active record (estimated or confirmed) is overwritten in
    /// place and a price_history row keeps the old values. A confirmed
    /// price is never touched by the estimator afterwards.
    pub fn set_confirmed_price(&self, input: &ConfirmedPrice) -> PricingResult<PriceRecordId> {
        let key = input.key;
        if !input.price.is_finite() || input.price < 0.0 {
            return Err(PricingError::InvalidRequest(format!(
                "{key}: price must be a non-negative number, got {}",
                input.price
            )));
        }
        if let Some(cost) = input.cost {
            if !cost.is_finite() || cost < 0.0 {
                return Err(PricingError::InvalidRequest(format!(
                    "{key}: cost must be a non-negative number, got {cost}"
                )));
            }
        }
        if self.store.device_model(key.device_model_id)?.is_none() {
            return Err(PricingError::DeviceNotFound {
                device_model_id: key.device_model_id,
            });
        }
        if self.store.repair_type(key.repair_type_id)?.is_none() {
            return Err(PricingError::RepairTypeNotFound {
                repair_type_id: key.repair_type_id,
            });
        }
        if self.store.part_quality(key.part_quality_id)?.is_none() {
            return Err(PricingError::PartQualityNotFound {
                part_quality_id: key.part_quality_id,
            });
        }

        let now = Utc::now();
        let reason = if input.reason.is_empty() {
            "Operator confirmed".to_string()
        } else {
            input.reason.clone()
        };

        let id = self.store.with_write_tx(|store| match store.active_price(&key)? {
            Some(existing) => {
                store.update_confirmed_price(
                    existing.price_record_id,
                    input.price,
                    input.cost,
                    &input.notes,
                    now,
                )?;
                if existing.is_estimated
                    || existing.price != input.price
                    || existing.cost != input.cost
                {
                    store.append_price_history(&PriceHistoryEntry {
                        id: None,
                        price_record_id: existing.price_record_id,
                        old_price: existing.price,
                        new_price: input.price,
                        old_cost: existing.cost,
                        new_cost: input.cost,
                        reason: reason.clone(),
                        changed_at: now,
                    })?;
                }
                Ok(existing.price_record_id)
            }
            None => store.insert_price_record(&NewPriceRecord {
                key,
                price: input.price,
                cost: input.cost,
                is_estimated: false,
                confidence: None,
                notes: input.notes.clone(),
                valid_from: now,
            }),
        })?;

        log::info!("{key}: confirmed price {:.2} (record {id})", input.price);
        Ok(id)
    }

    /// Retire an active record. The next estimate for its tuple starts
    /// from scratch. False when the record was already inactive or missing.
    pub fn deactivate_price(&self, price_record_id: PriceRecordId) -> PricingResult<bool> {
        let done = self.store.deactivate_price_record(price_record_id, Utc::now())?;
        if done {
            log::info!("price record {price_record_id} deactivated");
        } else {
            log::debug!("price record {price_record_id} not active; nothing to deactivate");
        }
        Ok(done)
    }

    /// Active estimates below the review threshold, lowest confidence first.
    pub fn review_queue(&self) -> PricingResult<Vec<PriceRecord>> {
        self.store
            .low_confidence_estimates(self.config.confidence.review_threshold)
    }

    pub fn price_history(
        &self,
        price_record_id: PriceRecordId,
        limit: usize,
    ) -> PricingResult<Vec<PriceHistoryEntry>> {
        self.store.price_history(price_record_id, limit)
    }

    pub fn estimation_log(&self, price_record_id: PriceRecordId) -> PricingResult<Vec<EstimationLogEntry>> {
        self.store.estimation_log_for_record(price_record_id)
    }

    pub fn stats(&self) -> PricingResult<PricingStats> {
        self.store
            .pricing_stats(self.config.confidence.review_threshold)
    }
}
