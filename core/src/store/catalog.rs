use super::PriceStore;
use crate::{
    catalog::{Brand, DeviceModel, DeviceType, PartQuality, RepairType},
    error::PricingResult,
    types::{BrandId, DeviceModelId, PartQualityId, RepairTypeId},
};
use rusqlite::{params, OptionalExtension, Row};

const DEVICE_COLUMNS: &str =
    "device_model_id, brand_id, name, release_year, screen_size, device_type, is_active";

fn device_from_row(r: &Row<'_>) -> rusqlite::Result<DeviceModel> {
    let device_type: String = r.get(5)?;
    Ok(DeviceModel {
        device_model_id: r.get(0)?,
        brand_id:        r.get(1)?,
        name:            r.get(2)?,
        release_year:    r.get(3)?,
        screen_size:     r.get(4)?,
        // The CHECK constraint limits the column to known values.
        device_type:     DeviceType::parse(&device_type).unwrap_or(DeviceType::Phone),
        is_active:       r.get(6)?,
    })
}

impl PriceStore {
    // ── Brand ─────────────────────────────────────────────────────

    pub fn insert_brand(&self, b: &Brand) -> PricingResult<()> {
        self.conn.execute(
            "INSERT INTO brand (brand_id, name, is_active) VALUES (?1, ?2, ?3)",
            params![b.brand_id, b.name, b.is_active],
        )?;
        Ok(())
    }

    pub fn brand(&self, brand_id: BrandId) -> PricingResult<Option<Brand>> {
        let row = self
            .conn
            .query_row(
                "SELECT brand_id, name, is_active FROM brand WHERE brand_id = ?1",
                params![brand_id],
                |r| {
                    Ok(Brand {
                        brand_id:  r.get(0)?,
                        name:      r.get(1)?,
                        is_active: r.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    // ── Device model ──────────────────────────────────────────────

    pub fn insert_device_model(&self, d: &DeviceModel) -> PricingResult<()> {
        self.conn.execute(
            "INSERT INTO device_model (
                 device_model_id, brand_id, name, release_year, screen_size,
                 device_type, is_active
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                d.device_model_id,
                d.brand_id,
                d.name,
                d.release_year,
                d.screen_size,
                d.device_type.as_str(),
                d.is_active,
            ],
        )?;
        Ok(())
    }

    pub fn device_model(&self, device_model_id: DeviceModelId) -> PricingResult<Option<DeviceModel>> {
        let sql = format!("SELECT {DEVICE_COLUMNS} FROM device_model WHERE device_model_id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![device_model_id], device_from_row)
            .optional()?;
        Ok(row)
    }

    pub fn device_models_for_brand(&self, brand_id: BrandId) -> PricingResult<Vec<DeviceModel>> {
        let sql = format!(
            "SELECT {DEVICE_COLUMNS} FROM device_model
             WHERE brand_id = ?1
             ORDER BY release_year ASC, device_model_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![brand_id], device_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Soft-deactivate a device model. Prices referencing it are kept.
    pub fn deactivate_device_model(&self, device_model_id: DeviceModelId) -> PricingResult<bool> {
        let changed = self.conn.execute(
            "UPDATE device_model SET is_active = 0 WHERE device_model_id = ?1 AND is_active = 1",
            params![device_model_id],
        )?;
        Ok(changed > 0)
    }

    // ── Repair type ───────────────────────────────────────────────

    pub fn insert_repair_type(&self, r: &RepairType) -> PricingResult<()> {
        self.conn.execute(
            "INSERT INTO repair_type (repair_type_id, name, category, is_active)
             VALUES (?1, ?2, ?3, ?4)",
            params![r.repair_type_id, r.name, r.category, r.is_active],
        )?;
        Ok(())
    }

    pub fn repair_type(&self, repair_type_id: RepairTypeId) -> PricingResult<Option<RepairType>> {
        let row = self
            .conn
            .query_row(
                "SELECT repair_type_id, name, category, is_active
                 FROM repair_type WHERE repair_type_id = ?1",
                params![repair_type_id],
                |r| {
                    Ok(RepairType {
                        repair_type_id: r.get(0)?,
                        name:           r.get(1)?,
                        category:       r.get(2)?,
                        is_active:      r.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    // ── Part quality ──────────────────────────────────────────────

    pub fn insert_part_quality(&self, p: &PartQuality) -> PricingResult<()> {
        self.conn.execute(
            "INSERT INTO part_quality (part_quality_id, name, is_active) VALUES (?1, ?2, ?3)",
            params![p.part_quality_id, p.name, p.is_active],
        )?;
        Ok(())
    }

    pub fn part_quality(&self, part_quality_id: PartQualityId) -> PricingResult<Option<PartQuality>> {
        let row = self
            .conn
            .query_row(
                "SELECT part_quality_id, name, is_active
                 FROM part_quality WHERE part_quality_id = ?1",
                params![part_quality_id],
                |r| {
                    Ok(PartQuality {
                        part_quality_id: r.get(0)?,
                        name:            r.get(1)?,
                        is_active:       r.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}
