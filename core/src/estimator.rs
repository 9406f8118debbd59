//! Estimation orchestrator: the entry point callers use to price a repair.
//!
//! ORDER (fixed):
//!   1. Confirmed price for the exact tuple? Return it untouched.
//!   2. Reference set → interpolation | extrapolation | category average.
//!   3. Tier adjustment → psychological rounding → confidence.
//!   4. Persist the estimate and its estimation_log row in one transaction.
//!
//! The engine never fails to price a resolvable device; it only varies
//! confidence. A concurrent writer beating us to the same tuple is not an
//! error: the winner's record is re-read and returned.

use crate::{
    catalog::RepairType,
    category_average::{category_average, CategoryEstimate},
    confidence::ConfidenceScorer,
    config::EstimatorConfig,
    error::{PricingError, PricingResult},
    extrapolation::extrapolate,
    interpolation::find_bracket,
    price::{
        EstimationLogEntry, EstimationMethod, NewPriceRecord, PriceHistoryEntry, PriceKey,
        PriceRecord,
    },
    reference_set::{ReferenceSet, ReferenceSetBuilder},
    rounding::psychological_round,
    store::PriceStore,
    tier::apply_tier_adjustment,
    types::{DeviceModelId, Money, PartQualityId, PriceRecordId, RepairTypeId},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Validated boundary input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRequest {
    pub device_model_id: DeviceModelId,
    pub repair_type_id:  RepairTypeId,
    pub part_quality_id: PartQualityId,
}

impl EstimateRequest {
    pub fn new(
        device_model_id: DeviceModelId,
        repair_type_id: RepairTypeId,
        part_quality_id: PartQualityId,
    ) -> Self {
        Self { device_model_id, repair_type_id, part_quality_id }
    }

    pub fn validate(&self) -> PricingResult<()> {
        for (field, id) in [
            ("deviceModelId", self.device_model_id),
            ("repairTypeId", self.repair_type_id),
            ("partQualityId", self.part_quality_id),
        ] {
            if id <= 0 {
                return Err(PricingError::InvalidRequest(format!(
                    "{field} must be a positive id, got {id}"
                )));
            }
        }
        Ok(())
    }

    pub fn key(&self) -> PriceKey {
        PriceKey::new(self.device_model_id, self.repair_type_id, self.part_quality_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEstimate {
    pub price_record_id:      PriceRecordId,
    pub price:                Money,
    pub cost:                 Option<Money>,
    pub confidence:           f64,
    pub is_estimated:         bool,
    pub method:               EstimationMethod,
    pub reference_device_ids: Vec<DeviceModelId>,
    /// Confidence is below the review threshold; an operator should check
    /// the price before a customer sees it.
    pub needs_review:         bool,
}

/// Outcome of [`PriceEstimator::prepare`].
#[derive(Debug, Clone)]
pub enum Prepared {
    /// An operator price exists; nothing to persist.
    Confirmed(PriceEstimate),
    Pending(PendingEstimate),
}

/// A computed, rounded and scored estimate that has not been written yet.
#[derive(Debug, Clone)]
pub struct PendingEstimate {
    key:         PriceKey,
    price:       Money,
    cost:        Option<Money>,
    confidence:  f64,
    /// Active estimated record seen when the estimate was computed.
    existing:    Option<PriceRecord>,
    computation: Computation,
}

impl PendingEstimate {
    pub fn key(&self) -> PriceKey {
        self.key
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn method(&self) -> EstimationMethod {
        self.computation.method
    }
}

/// Persist attempts before a tuple that keeps changing underneath us is
/// reported as a conflict.
const MAX_PERSIST_ATTEMPTS: u32 = 3;

/// Numeric result before tier adjustment, rounding and persistence.
#[derive(Debug, Clone)]
struct Computation {
    raw_price:            Money,
    cost:                 Option<Money>,
    method:               EstimationMethod,
    reference_device_ids: Vec<DeviceModelId>,
    year_distance:        u32,
}

pub struct PriceEstimator<'a> {
    store:  &'a PriceStore,
    config: &'a EstimatorConfig,
    scorer: ConfidenceScorer,
}

impl<'a> PriceEstimator<'a> {
    pub fn new(store: &'a PriceStore, config: &'a EstimatorConfig) -> Self {
        Self {
            store,
            config,
            scorer: ConfidenceScorer::new(config.confidence.clone()),
        }
    }

    pub fn estimate(&self, request: &EstimateRequest) -> PricingResult<PriceEstimate> {
        match self.prepare(request)? {
            Prepared::Confirmed(estimate) => Ok(estimate),
            Prepared::Pending(pending) => self.commit(&pending),
        }
    }

    /// Compute an estimate against the current price table without writing.
    /// A confirmed price for the tuple short-circuits to `Confirmed`.
    pub fn prepare(&self, request: &EstimateRequest) -> PricingResult<Prepared> {
        request.validate()?;
        let key = request.key();

        let existing = self.store.active_price(&key)?;
        if let Some(record) = existing.as_ref().filter(|r| !r.is_estimated) {
            log::debug!("{key}: confirmed price {:.2}", record.price);
            return Ok(Prepared::Confirmed(self.exact(record)));
        }

        let set = ReferenceSetBuilder::new(self.store, self.config.reference_window_years)
            .build(&key)?;
        let repair_type = self
            .store
            .repair_type(key.repair_type_id)?
            .ok_or(PricingError::RepairTypeNotFound {
                repair_type_id: key.repair_type_id,
            })?;
        if self.store.part_quality(key.part_quality_id)?.is_none() {
            return Err(PricingError::PartQualityNotFound {
                part_quality_id: key.part_quality_id,
            });
        }

        let computation = self.compute(&set, &repair_type, key.part_quality_id)?;

        // The baseline table already holds market prices.
        let adjusted = match computation.method {
            EstimationMethod::Fallback => computation.raw_price,
            _ => {
                let (adjusted, tier) = apply_tier_adjustment(
                    computation.raw_price,
                    &set.target.name,
                    &self.config.tier,
                );
                log::debug!(
                    "{key}: '{}' tier {tier:?}, {:.2} -> {adjusted:.2}",
                    set.target.name,
                    computation.raw_price
                );
                adjusted
            }
        };

        Ok(Prepared::Pending(PendingEstimate {
            key,
            price: psychological_round(adjusted),
            cost: computation.cost.map(|c| c.round()),
            confidence: self.scorer.score(computation.method, computation.year_distance),
            existing,
            computation,
        }))
    }

    /// Persist a prepared estimate and its estimation_log row.
    ///
    /// The table may have moved since `prepare`. Another writer's active
    /// record for the tuple wins and is returned; a record retired in the
    /// meantime is replaced by a fresh insert.
    pub fn commit(&self, pending: &PendingEstimate) -> PricingResult<PriceEstimate> {
        let key = pending.key;
        let mut existing = pending.existing.as_ref();

        for attempt in 1..=MAX_PERSIST_ATTEMPTS {
            match self.persist(pending, existing) {
                Ok(price_record_id) => return Ok(self.persisted(pending, price_record_id)),
                Err(PricingError::PersistenceConflict { .. }) => {
                    if let Some(current) = self.current(&key)? {
                        log::info!("{key}: concurrent writer persisted first; returning current record");
                        return Ok(current);
                    }
                    log::info!("{key}: active record retired during estimate (attempt {attempt}); inserting");
                    existing = None;
                }
                Err(e) => return Err(e),
            }
        }

        Err(PricingError::PersistenceConflict {
            device_model_id: key.device_model_id,
            repair_type_id:  key.repair_type_id,
            part_quality_id: key.part_quality_id,
        })
    }

    /// Estimate each request independently. One failure (an unknown
    /// device, say) does not stop the rest.
    pub fn estimate_batch(
        &self,
        requests: &[EstimateRequest],
    ) -> Vec<(EstimateRequest, PricingResult<PriceEstimate>)> {
        requests
            .iter()
            .map(|request| {
                let result = self.estimate(request);
                if let Err(e) = &result {
                    log::warn!("batch estimate {}: {e}", request.key());
                }
                (*request, result)
            })
            .collect()
    }

    fn compute(
        &self,
        set: &ReferenceSet,
        repair_type: &RepairType,
        part_quality_id: PartQualityId,
    ) -> PricingResult<Computation> {
        if !set.is_empty() {
            if let Some(target_year) = set.target.release_year {
                if let Some(bracket) = find_bracket(&set.references, target_year) {
                    match bracket.interpolate(target_year) {
                        Some(i) => {
                            return Ok(Computation {
                                raw_price: i.price,
                                cost: i.cost,
                                method: EstimationMethod::Interpolation,
                                reference_device_ids: i.reference_device_ids,
                                year_distance: 0,
                            });
                        }
                        None => log::debug!(
                            "device {}: degenerate bracket, extrapolating instead",
                            set.target.device_model_id
                        ),
                    }
                }
            }

            if let Some(e) = extrapolate(
                &set.references,
                set.target.release_year,
                self.config.drift_rate_per_year,
            ) {
                return Ok(Computation {
                    raw_price: e.price,
                    cost: e.cost,
                    method: EstimationMethod::Extrapolation,
                    reference_device_ids: vec![e.reference_device_id],
                    year_distance: e.year_distance,
                });
            }
        }

        log::debug!(
            "device {}: no same-brand comparables, using category average",
            set.target.device_model_id
        );
        let computation = match category_average(self.store, self.config, repair_type, part_quality_id)? {
            CategoryEstimate::Average { price, cost, .. } => Computation {
                raw_price: price,
                cost,
                method: EstimationMethod::CategoryAverage,
                reference_device_ids: Vec::new(),
                year_distance: 0,
            },
            CategoryEstimate::Baseline { price, .. } => Computation {
                raw_price: price,
                cost: None,
                method: EstimationMethod::Fallback,
                reference_device_ids: Vec::new(),
                year_distance: 0,
            },
        };
        Ok(computation)
    }

    /// Write the estimate and its provenance row atomically. An existing
    /// active estimate is updated in place; otherwise a record is inserted.
    fn persist(
        &self,
        pending: &PendingEstimate,
        existing: Option<&PriceRecord>,
    ) -> PricingResult<PriceRecordId> {
        let key = pending.key;
        let method = pending.computation.method;
        let now = Utc::now();
        let notes = format!("Auto-estimated using {method} method");

        self.store.with_write_tx(|store| {
            let (price_record_id, old_price) = match existing {
                Some(record) => {
                    let updated = store.update_estimated_price(
                        record.price_record_id,
                        pending.price,
                        pending.cost,
                        pending.confidence,
                        &notes,
                        now,
                    )?;
                    if !updated {
                        return Err(PricingError::PersistenceConflict {
                            device_model_id: key.device_model_id,
                            repair_type_id:  key.repair_type_id,
                            part_quality_id: key.part_quality_id,
                        });
                    }
                    if record.price != pending.price || record.cost != pending.cost {
                        store.append_price_history(&PriceHistoryEntry {
                            id: None,
                            price_record_id: record.price_record_id,
                            old_price: record.price,
                            new_price: pending.price,
                            old_cost: record.cost,
                            new_cost: pending.cost,
                            reason: format!("Re-estimated using {method} method"),
                            changed_at: now,
                        })?;
                    }
                    (record.price_record_id, Some(record.price))
                }
                None => {
                    let id = store.insert_price_record(&NewPriceRecord {
                        key,
                        price: pending.price,
                        cost: pending.cost,
                        is_estimated: true,
                        confidence: Some(pending.confidence),
                        notes: notes.clone(),
                        valid_from: now,
                    })?;
                    (id, None)
                }
            };

            store.append_estimation_log(&EstimationLogEntry {
                id: None,
                price_record_id,
                key,
                old_price,
                new_price: pending.price,
                method,
                confidence: pending.confidence,
                reference_device_ids: pending.computation.reference_device_ids.clone(),
                algorithm_version: self.config.algorithm_version.clone(),
                created_at: now,
            })?;
            Ok(price_record_id)
        })
    }

    fn persisted(&self, pending: &PendingEstimate, price_record_id: PriceRecordId) -> PriceEstimate {
        let key = pending.key;
        let estimate = PriceEstimate {
            price_record_id,
            price: pending.price,
            cost: pending.cost,
            confidence: pending.confidence,
            is_estimated: true,
            method: pending.computation.method,
            reference_device_ids: pending.computation.reference_device_ids.clone(),
            needs_review: self.scorer.needs_review(pending.confidence),
        };
        log::info!(
            "{key}: estimated {:.2} via {} (confidence {:.2}, refs {:?})",
            estimate.price,
            estimate.method,
            estimate.confidence,
            estimate.reference_device_ids
        );
        if estimate.needs_review {
            log::warn!(
                "{key}: confidence {:.2} below review threshold {:.2}",
                estimate.confidence,
                self.scorer.review_threshold()
            );
        }
        estimate
    }

    /// The active record for `key` as an estimate, using its latest
    /// estimation_log row for method and references. None when the tuple
    /// has no active record.
    fn current(&self, key: &PriceKey) -> PricingResult<Option<PriceEstimate>> {
        let Some(record) = self.store.active_price(key)? else {
            return Ok(None);
        };
        if !record.is_estimated {
            return Ok(Some(self.exact(&record)));
        }

        let entry = self
            .store
            .latest_estimation_log(record.price_record_id)?
            .ok_or_else(|| {
                PricingError::Other(anyhow::anyhow!(
                    "estimated price record {} has no estimation log entry",
                    record.price_record_id
                ))
            })?;
        let confidence = record.confidence.unwrap_or(entry.confidence);
        Ok(Some(PriceEstimate {
            price_record_id: record.price_record_id,
            price: record.price,
            cost: record.cost,
            confidence,
            is_estimated: true,
            method: entry.method,
            reference_device_ids: entry.reference_device_ids,
            needs_review: self.scorer.needs_review(confidence),
        }))
    }

    fn exact(&self, record: &PriceRecord) -> PriceEstimate {
        PriceEstimate {
            price_record_id: record.price_record_id,
            price: record.price,
            cost: record.cost,
            confidence: self.scorer.score(EstimationMethod::Exact, 0),
            is_estimated: false,
            method: EstimationMethod::Exact,
            reference_device_ids: vec![record.key.device_model_id],
            needs_review: false,
        }
    }
}
