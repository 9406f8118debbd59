//! Catalog reference data: brands, device models, repair types and part
//! qualities, plus the JSON seed file used to bootstrap a shop database.

use crate::{
    error::PricingResult,
    price::{ConfirmedPrice, PriceKey},
    price_book::PriceBook,
    config::EstimatorConfig,
    store::PriceStore,
    types::{BrandId, DeviceModelId, Money, PartQualityId, ReleaseYear, RepairTypeId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    pub brand_id:  BrandId,
    pub name:      String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Phone,
    Tablet,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phone  => "phone",
            Self::Tablet => "tablet",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "phone"  => Some(Self::Phone),
            "tablet" => Some(Self::Tablet),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceModel {
    pub device_model_id: DeviceModelId,
    pub brand_id:        BrandId,
    pub name:            String,
    /// Unknown for some older or imported devices.
    #[serde(default)]
    pub release_year:    Option<ReleaseYear>,
    #[serde(default)]
    pub screen_size:     Option<f64>,
    pub device_type:     DeviceType,
    #[serde(default = "default_active")]
    pub is_active:       bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairType {
    pub repair_type_id: RepairTypeId,
    pub name:           String,
    /// Slug such as `screen` or `battery`; keys the baseline price table.
    pub category:       String,
    #[serde(default = "default_active")]
    pub is_active:      bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartQuality {
    pub part_quality_id: PartQualityId,
    pub name:            String,
    #[serde(default = "default_active")]
    pub is_active:       bool,
}

fn default_active() -> bool { true }

// ── Seed file ──────────────────────────────────────────────────────

/// An operator-confirmed price as it appears in the seed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedPrice {
    pub device_model_id: DeviceModelId,
    pub repair_type_id:  RepairTypeId,
    pub part_quality_id: PartQualityId,
    pub price:           Money,
    #[serde(default)]
    pub cost:            Option<Money>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub brands:         Vec<Brand>,
    #[serde(default)]
    pub device_models:  Vec<DeviceModel>,
    #[serde(default)]
    pub repair_types:   Vec<RepairType>,
    #[serde(default)]
    pub part_qualities: Vec<PartQuality>,
    #[serde(default)]
    pub prices:         Vec<SeedPrice>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub brands:         usize,
    pub device_models:  usize,
    pub repair_types:   usize,
    pub part_qualities: usize,
    pub prices:         usize,
}

impl CatalogSeed {
    /// Load from `<data_dir>/catalog/catalog.json`.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/catalog/catalog.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let seed: CatalogSeed = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        Ok(seed)
    }
}

/// Insert the seed's reference data, then record its prices as confirmed
/// operator prices through the price book.
pub fn seed_catalog(
    store: &PriceStore,
    config: &EstimatorConfig,
    seed: &CatalogSeed,
) -> PricingResult<SeedSummary> {
    store.with_write_tx(|store| {
        for brand in &seed.brands {
            store.insert_brand(brand)?;
        }
        for device in &seed.device_models {
            store.insert_device_model(device)?;
        }
        for repair in &seed.repair_types {
            store.insert_repair_type(repair)?;
        }
        for part in &seed.part_qualities {
            store.insert_part_quality(part)?;
        }
        Ok(())
    })?;

    let book = PriceBook::new(store, config);
    for p in &seed.prices {
        book.set_confirmed_price(&ConfirmedPrice {
            key: PriceKey::new(p.device_model_id, p.repair_type_id, p.part_quality_id),
            price: p.price,
            cost: p.cost,
            notes: String::new(),
            reason: "Catalog seed".into(),
        })?;
    }

    let summary = SeedSummary {
        brands:         seed.brands.len(),
        device_models:  seed.device_models.len(),
        repair_types:   seed.repair_types.len(),
        part_qualities: seed.part_qualities.len(),
        prices:         seed.prices.len(),
    };
    log::info!(
        "catalog: seeded {} brands, {} devices, {} repair types, {} part qualities, {} prices",
        summary.brands, summary.device_models, summary.repair_types,
        summary.part_qualities, summary.prices
    );
    Ok(summary)
}
