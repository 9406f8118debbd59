//! Shared fixture for integration tests: a migrated store with a small
//! reference catalog and helpers to add devices and confirmed prices.

#![allow(dead_code)]

use repairdesk_core::{
    catalog::{Brand, DeviceModel, DeviceType, PartQuality, RepairType},
    config::EstimatorConfig,
    estimator::{EstimateRequest, PriceEstimator},
    price::{ConfirmedPrice, PriceKey},
    price_book::PriceBook,
    store::PriceStore,
    types::{BrandId, DeviceModelId, Money, PartQualityId, PriceRecordId, ReleaseYear, RepairTypeId},
};

pub const APPLE: BrandId = 1;
pub const SAMSUNG: BrandId = 2;

pub const SCREEN: RepairTypeId = 1;
pub const BATTERY: RepairTypeId = 2;
/// Category with no entry in the baseline table.
pub const WATER_DAMAGE: RepairTypeId = 3;

pub const OEM: PartQualityId = 1;
pub const AFTERMARKET: PartQualityId = 2;

pub struct Fixture {
    pub store:  PriceStore,
    pub config: EstimatorConfig,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_store(PriceStore::in_memory().unwrap())
    }

    /// File-backed database at `path`, for tests that need several connections.
    pub fn file(path: &str) -> Self {
        Self::with_store(PriceStore::open(path).unwrap())
    }

    fn with_store(store: PriceStore) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        store.migrate().unwrap();
        for (brand_id, name) in [(APPLE, "Apple"), (SAMSUNG, "Samsung")] {
            store
                .insert_brand(&Brand { brand_id, name: name.into(), is_active: true })
                .unwrap();
        }
        for (repair_type_id, name, category) in [
            (SCREEN, "Screen Replacement", "screen"),
            (BATTERY, "Battery Replacement", "battery"),
            (WATER_DAMAGE, "Water Damage", "water_damage"),
        ] {
            store
                .insert_repair_type(&RepairType {
                    repair_type_id,
                    name: name.into(),
                    category: category.into(),
                    is_active: true,
                })
                .unwrap();
        }
        for (part_quality_id, name) in [(OEM, "Original"), (AFTERMARKET, "Aftermarket")] {
            store
                .insert_part_quality(&PartQuality { part_quality_id, name: name.into(), is_active: true })
                .unwrap();
        }
        Self { store, config: EstimatorConfig::default_test() }
    }

    pub fn device(&self, device_model_id: DeviceModelId, brand_id: BrandId, name: &str, year: Option<ReleaseYear>) {
        self.store
            .insert_device_model(&DeviceModel {
                device_model_id,
                brand_id,
                name: name.into(),
                release_year: year,
                screen_size: None,
                device_type: DeviceType::Phone,
                is_active: true,
            })
            .unwrap();
    }

    pub fn confirm(
        &self,
        device_model_id: DeviceModelId,
        repair_type_id: RepairTypeId,
        part_quality_id: PartQualityId,
        price: Money,
        cost: Option<Money>,
    ) -> PriceRecordId {
        self.book()
            .set_confirmed_price(&ConfirmedPrice {
                key: PriceKey::new(device_model_id, repair_type_id, part_quality_id),
                price,
                cost,
                notes: String::new(),
                reason: "test".into(),
            })
            .unwrap()
    }

    pub fn estimator(&self) -> PriceEstimator<'_> {
        PriceEstimator::new(&self.store, &self.config)
    }

    pub fn book(&self) -> PriceBook<'_> {
        PriceBook::new(&self.store, &self.config)
    }
}

pub fn screen_oem(device_model_id: DeviceModelId) -> EstimateRequest {
    EstimateRequest::new(device_model_id, SCREEN, OEM)
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
