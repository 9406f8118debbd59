use super::{conflict_or, CategoryMean, PriceStore, PricingStats};
use crate::{
    error::PricingResult,
    price::{NewPriceRecord, PriceKey, PriceRecord, ReferencePrice},
    types::{BrandId, DeviceModelId, Money, PartQualityId, PriceRecordId, ReleaseYear, RepairTypeId},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

/// Column list shared across price_record queries.
const COLUMNS: &str =
    "price_record_id, device_model_id, repair_type_id, part_quality_id, price, cost,
     is_estimated, confidence, notes, is_active, valid_from, valid_until, updated_at";

fn record_from_row(r: &Row<'_>) -> rusqlite::Result<PriceRecord> {
    Ok(PriceRecord {
        price_record_id: r.get(0)?,
        key: PriceKey {
            device_model_id: r.get(1)?,
            repair_type_id:  r.get(2)?,
            part_quality_id: r.get(3)?,
        },
        price:        r.get(4)?,
        cost:         r.get(5)?,
        is_estimated: r.get(6)?,
        confidence:   r.get(7)?,
        notes:        r.get(8)?,
        is_active:    r.get(9)?,
        valid_from:   r.get(10)?,
        valid_until:  r.get(11)?,
        updated_at:   r.get(12)?,
    })
}

impl PriceStore {
    // ── Reads ─────────────────────────────────────────────────────

    /// The active record for `key`, confirmed or estimated.
    pub fn active_price(&self, key: &PriceKey) -> PricingResult<Option<PriceRecord>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM price_record
             WHERE device_model_id = ?1 AND repair_type_id = ?2 AND part_quality_id = ?3
               AND is_active = 1"
        );
        let row = self
            .conn
            .query_row(
                &sql,
                params![key.device_model_id, key.repair_type_id, key.part_quality_id],
                record_from_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn price_record(&self, price_record_id: PriceRecordId) -> PricingResult<Option<PriceRecord>> {
        let sql = format!("SELECT {COLUMNS} FROM price_record WHERE price_record_id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![price_record_id], record_from_row)
            .optional()?;
        Ok(row)
    }

    /// Every record (active or not) ever written for `key`, oldest first.
    pub fn price_records_for_key(&self, key: &PriceKey) -> PricingResult<Vec<PriceRecord>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM price_record
             WHERE device_model_id = ?1 AND repair_type_id = ?2 AND part_quality_id = ?3
             ORDER BY price_record_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![key.device_model_id, key.repair_type_id, key.part_quality_id],
            record_from_row,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Active confirmed prices for same-brand active devices, excluding
    /// `exclude_device`.
    ///
    /// With `years = Some((lo, hi))` only devices released in `lo..=hi`
    /// qualify (devices with unknown release year drop out). Ordered by
    /// release year ascending, unknown years first, ties by device id.
    pub fn confirmed_reference_prices(
        &self,
        brand_id: BrandId,
        repair_type_id: RepairTypeId,
        part_quality_id: PartQualityId,
        exclude_device: DeviceModelId,
        years: Option<(ReleaseYear, ReleaseYear)>,
    ) -> PricingResult<Vec<ReferencePrice>> {
        let (lo, hi) = match years {
            Some((lo, hi)) => (Some(lo), Some(hi)),
            None => (None, None),
        };
        let mut stmt = self.conn.prepare(
            "SELECT p.price_record_id, p.device_model_id, d.release_year, p.price, p.cost
             FROM price_record p
             JOIN device_model d ON d.device_model_id = p.device_model_id
             WHERE d.brand_id = ?1
               AND p.repair_type_id = ?2
               AND p.part_quality_id = ?3
               AND p.device_model_id <> ?4
               AND p.is_estimated = 0
               AND p.is_active = 1
               AND d.is_active = 1
               AND (?5 IS NULL OR d.release_year >= ?5)
               AND (?6 IS NULL OR d.release_year <= ?6)
             ORDER BY d.release_year ASC, d.device_model_id ASC",
        )?;
        let rows = stmt.query_map(
            params![brand_id, repair_type_id, part_quality_id, exclude_device, lo, hi],
            |r| {
                Ok(ReferencePrice {
                    price_record_id: r.get(0)?,
                    device_model_id: r.get(1)?,
                    release_year:    r.get(2)?,
                    price:           r.get(3)?,
                    cost:            r.get(4)?,
                })
            },
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Mean price (and mean of the known costs) over all active confirmed
    /// prices for a repair type and part quality, across every brand.
    pub fn confirmed_category_average(
        &self,
        repair_type_id: RepairTypeId,
        part_quality_id: PartQualityId,
    ) -> PricingResult<CategoryMean> {
        Ok(self.conn.query_row(
            "SELECT AVG(price), AVG(cost), COUNT(*) FROM price_record
             WHERE repair_type_id = ?1 AND part_quality_id = ?2
               AND is_estimated = 0 AND is_active = 1",
            params![repair_type_id, part_quality_id],
            |r| {
                Ok(CategoryMean {
                    price:        r.get(0)?,
                    cost:         r.get(1)?,
                    sample_count: r.get(2)?,
                })
            },
        )?)
    }

    /// Active estimated records with confidence below `threshold`,
    /// lowest confidence first.
    pub fn low_confidence_estimates(&self, threshold: f64) -> PricingResult<Vec<PriceRecord>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM price_record
             WHERE is_active = 1 AND is_estimated = 1 AND confidence < ?1
             ORDER BY confidence ASC, price_record_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![threshold], record_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn active_price_count(&self, key: &PriceKey) -> PricingResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM price_record
             WHERE device_model_id = ?1 AND repair_type_id = ?2 AND part_quality_id = ?3
               AND is_active = 1",
            params![key.device_model_id, key.repair_type_id, key.part_quality_id],
            |r| r.get(0),
        )?)
    }

    pub fn price_record_count(&self) -> PricingResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM price_record", [], |r| r.get(0))?)
    }

    pub fn pricing_stats(&self, review_threshold: f64) -> PricingResult<PricingStats> {
        let mut stats = self.conn.query_row(
            "SELECT
                 COUNT(*),
                 COALESCE(SUM(CASE WHEN is_estimated = 0 THEN 1 ELSE 0 END), 0),
                 COALESCE(SUM(CASE WHEN is_estimated = 1 THEN 1 ELSE 0 END), 0),
                 AVG(CASE WHEN is_estimated = 1 THEN confidence END),
                 COALESCE(SUM(CASE WHEN is_estimated = 1 AND confidence < ?1 THEN 1 ELSE 0 END), 0),
                 COALESCE(SUM(CASE WHEN cost IS NULL THEN 1 ELSE 0 END), 0)
             FROM price_record WHERE is_active = 1",
            params![review_threshold],
            |r| {
                Ok(PricingStats {
                    active_records:            r.get(0)?,
                    confirmed_records:         r.get(1)?,
                    estimated_records:         r.get(2)?,
                    mean_estimated_confidence: r.get(3)?,
                    low_confidence_records:    r.get(4)?,
                    missing_cost_records:      r.get(5)?,
                    estimation_log_entries:    0,
                })
            },
        )?;
        stats.estimation_log_entries = self.estimation_log_count()?;
        Ok(stats)
    }

    // ── Writes ────────────────────────────────────────────────────

    /// Insert a new active record. A unique-index violation (another active
    /// record for the same key) surfaces as `PersistenceConflict`.
    pub fn insert_price_record(&self, rec: &NewPriceRecord) -> PricingResult<PriceRecordId> {
        self.conn
            .execute(
                "INSERT INTO price_record (
                     device_model_id, repair_type_id, part_quality_id, price, cost,
                     is_estimated, confidence, notes, is_active, valid_from, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?9)",
                params![
                    rec.key.device_model_id,
                    rec.key.repair_type_id,
                    rec.key.part_quality_id,
                    rec.price,
                    rec.cost,
                    rec.is_estimated,
                    rec.confidence,
                    rec.notes,
                    rec.valid_from,
                ],
            )
            .map_err(|e| conflict_or(e, &rec.key))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Overwrite an active *estimated* record in place. Returns false when
    /// the row is no longer an active estimate (confirmed or deactivated
    /// by someone else meanwhile).
    pub fn update_estimated_price(
        &self,
        price_record_id: PriceRecordId,
        price: Money,
        cost: Option<Money>,
        confidence: f64,
        notes: &str,
        now: DateTime<Utc>,
    ) -> PricingResult<bool> {
        let changed = self.conn.execute(
            "UPDATE price_record
             SET price = ?1, cost = ?2, confidence = ?3, notes = ?4, updated_at = ?5
             WHERE price_record_id = ?6 AND is_active = 1 AND is_estimated = 1",
            params![price, cost, confidence, notes, now, price_record_id],
        )?;
        Ok(changed > 0)
    }

    /// Turn an active record into a confirmed one with the given values.
    pub fn update_confirmed_price(
        &self,
        price_record_id: PriceRecordId,
        price: Money,
        cost: Option<Money>,
        notes: &str,
        now: DateTime<Utc>,
    ) -> PricingResult<bool> {
        let changed = self.conn.execute(
            "UPDATE price_record
             SET price = ?1, cost = ?2, is_estimated = 0, confidence = NULL,
                 notes = ?3, updated_at = ?4
             WHERE price_record_id = ?5 AND is_active = 1",
            params![price, cost, notes, now, price_record_id],
        )?;
        Ok(changed > 0)
    }

    pub fn deactivate_price_record(
        &self,
        price_record_id: PriceRecordId,
        now: DateTime<Utc>,
    ) -> PricingResult<bool> {
        let changed = self.conn.execute(
            "UPDATE price_record SET is_active = 0, valid_until = ?1, updated_at = ?1
             WHERE price_record_id = ?2 AND is_active = 1",
            params![now, price_record_id],
        )?;
        Ok(changed > 0)
    }
}
