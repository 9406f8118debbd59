use super::PriceStore;
use crate::{
    error::{PricingError, PricingResult},
    price::{EstimationLogEntry, EstimationMethod, PriceHistoryEntry, PriceKey},
    types::{DeviceModelId, PriceRecordId},
};
use chrono::{DateTime, Utc};
use rusqlite::params;

/// estimation_log row before the method and reference-id columns are decoded.
struct RawLogRow {
    id:                   i64,
    price_record_id:      PriceRecordId,
    key:                  PriceKey,
    old_price:            Option<f64>,
    new_price:            f64,
    method:               String,
    confidence:           f64,
    reference_device_ids: String,
    algorithm_version:    String,
    created_at:           DateTime<Utc>,
}

impl RawLogRow {
    fn decode(self) -> PricingResult<EstimationLogEntry> {
        let method = EstimationMethod::parse(&self.method).ok_or_else(|| {
            PricingError::Other(anyhow::anyhow!(
                "estimation_log {}: unknown method '{}'",
                self.id,
                self.method
            ))
        })?;
        let reference_device_ids: Vec<DeviceModelId> =
            serde_json::from_str(&self.reference_device_ids)?;
        Ok(EstimationLogEntry {
            id: Some(self.id),
            price_record_id: self.price_record_id,
            key: self.key,
            old_price: self.old_price,
            new_price: self.new_price,
            method,
            confidence: self.confidence,
            reference_device_ids,
            algorithm_version: self.algorithm_version,
            created_at: self.created_at,
        })
    }
}

const LOG_COLUMNS: &str =
    "id, price_record_id, device_model_id, repair_type_id, part_quality_id, old_price,
     new_price, method, confidence, reference_device_ids, algorithm_version, created_at";

impl PriceStore {
    // ── Price history ─────────────────────────────────────────────

    pub fn append_price_history(&self, entry: &PriceHistoryEntry) -> PricingResult<()> {
        self.conn.execute(
            "INSERT INTO price_history (
                 price_record_id, old_price, new_price, old_cost, new_cost, reason, changed_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.price_record_id,
                entry.old_price,
                entry.new_price,
                entry.old_cost,
                entry.new_cost,
                entry.reason,
                entry.changed_at,
            ],
        )?;
        Ok(())
    }

    /// Most recent changes first.
    pub fn price_history(
        &self,
        price_record_id: PriceRecordId,
        limit: usize,
    ) -> PricingResult<Vec<PriceHistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, price_record_id, old_price, new_price, old_cost, new_cost,
                    reason, changed_at
             FROM price_history WHERE price_record_id = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![price_record_id, limit as i64], |r| {
            Ok(PriceHistoryEntry {
                id:              Some(r.get(0)?),
                price_record_id: r.get(1)?,
                old_price:       r.get(2)?,
                new_price:       r.get(3)?,
                old_cost:        r.get(4)?,
                new_cost:        r.get(5)?,
                reason:          r.get(6)?,
                changed_at:      r.get(7)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Estimation log ────────────────────────────────────────────

    pub fn append_estimation_log(&self, entry: &EstimationLogEntry) -> PricingResult<()> {
        let reference_ids = serde_json::to_string(&entry.reference_device_ids)?;
        self.conn.execute(
            "INSERT INTO estimation_log (
                 price_record_id, device_model_id, repair_type_id, part_quality_id,
                 old_price, new_price, method, confidence, reference_device_ids,
                 algorithm_version, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                entry.price_record_id,
                entry.key.device_model_id,
                entry.key.repair_type_id,
                entry.key.part_quality_id,
                entry.old_price,
                entry.new_price,
                entry.method.as_str(),
                entry.confidence,
                reference_ids,
                entry.algorithm_version,
                entry.created_at,
            ],
        )?;
        Ok(())
    }

    /// Oldest first.
    pub fn estimation_log_for_record(
        &self,
        price_record_id: PriceRecordId,
    ) -> PricingResult<Vec<EstimationLogEntry>> {
        self.query_estimation_log(
            &format!(
                "SELECT {LOG_COLUMNS} FROM estimation_log
                 WHERE price_record_id = ?1 ORDER BY id ASC"
            ),
            price_record_id,
        )
    }

    pub fn latest_estimation_log(
        &self,
        price_record_id: PriceRecordId,
    ) -> PricingResult<Option<EstimationLogEntry>> {
        let mut rows = self.query_estimation_log(
            &format!(
                "SELECT {LOG_COLUMNS} FROM estimation_log
                 WHERE price_record_id = ?1 ORDER BY id DESC LIMIT 1"
            ),
            price_record_id,
        )?;
        Ok(rows.pop())
    }

    pub fn estimation_log_count_for_key(&self, key: &PriceKey) -> PricingResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM estimation_log
             WHERE device_model_id = ?1 AND repair_type_id = ?2 AND part_quality_id = ?3",
            params![key.device_model_id, key.repair_type_id, key.part_quality_id],
            |r| r.get(0),
        )?)
    }

    pub fn estimation_log_count(&self) -> PricingResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM estimation_log", [], |r| r.get(0))?)
    }

    /// Estimated records (active or superseded) with no provenance row.
    /// Always empty while the persist-then-log pair stays atomic.
    pub fn estimated_records_without_log(&self) -> PricingResult<Vec<PriceRecordId>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.price_record_id FROM price_record p
             WHERE p.is_estimated = 1
               AND NOT EXISTS (
                   SELECT 1 FROM estimation_log l WHERE l.price_record_id = p.price_record_id
               )
             ORDER BY p.price_record_id ASC",
        )?;
        let rows = stmt.query_map([], |r| r.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn query_estimation_log(
        &self,
        sql: &str,
        price_record_id: PriceRecordId,
    ) -> PricingResult<Vec<EstimationLogEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let raw = stmt
            .query_map(params![price_record_id], |r| {
                Ok(RawLogRow {
                    id:              r.get(0)?,
                    price_record_id: r.get(1)?,
                    key: PriceKey {
                        device_model_id: r.get(2)?,
                        repair_type_id:  r.get(3)?,
                        part_quality_id: r.get(4)?,
                    },
                    old_price:            r.get(5)?,
                    new_price:            r.get(6)?,
                    method:               r.get(7)?,
                    confidence:           r.get(8)?,
                    reference_device_ids: r.get(9)?,
                    algorithm_version:    r.get(10)?,
                    created_at:           r.get(11)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(RawLogRow::decode).collect()
    }
}
