//! Price book: confirming, retiring and reviewing prices.

mod common;

use common::*;
use repairdesk_core::{
    error::PricingError,
    price::{ConfirmedPrice, EstimationMethod, PriceKey},
};

/// Confirming over an estimate keeps the record id and logs the change.
#[test]
fn confirmation_supersedes_estimate() {
    let fx = Fixture::new();
    fx.device(1, APPLE, "Phone", Some(2021));

    let estimate = fx.estimator().estimate(&screen_oem(1)).unwrap();
    assert_eq!(estimate.price, 199.0);

    let id = fx.confirm(1, SCREEN, OEM, 229.0, Some(110.0));
    assert_eq!(id, estimate.price_record_id);

    let record = fx.store.price_record(id).unwrap().unwrap();
    assert!(!record.is_estimated);
    assert_eq!(record.confidence, None);
    assert_eq!(record.price, 229.0);

    let history = fx.book().price_history(id, 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].old_price, 199.0);
    assert_eq!(history[0].new_price, 229.0);
    assert_eq!(history[0].new_cost, Some(110.0));
    assert_eq!(history[0].reason, "test");

    let again = fx.estimator().estimate(&screen_oem(1)).unwrap();
    assert_eq!(again.method, EstimationMethod::Exact);
    assert_eq!(again.price, 229.0);
    assert_eq!(fx.book().estimation_log(id).unwrap().len(), 1);
}

#[test]
fn reconfirming_same_values_adds_no_history() {
    let fx = Fixture::new();
    fx.device(1, APPLE, "Phone", Some(2021));
    let id = fx.confirm(1, SCREEN, OEM, 229.0, None);
    assert_eq!(fx.confirm(1, SCREEN, OEM, 229.0, None), id);
    assert!(fx.book().price_history(id, 10).unwrap().is_empty());

    fx.confirm(1, SCREEN, OEM, 249.0, None);
    let history = fx.book().price_history(id, 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].old_price, 229.0);
}

#[test]
fn rejects_bad_prices_and_unknown_devices() {
    let fx = Fixture::new();
    fx.device(1, APPLE, "Phone", Some(2021));
    let book = fx.book();

    let mut input = ConfirmedPrice {
        key: PriceKey::new(1, SCREEN, OEM),
        price: -5.0,
        cost: None,
        notes: String::new(),
        reason: String::new(),
    };
    assert!(matches!(book.set_confirmed_price(&input), Err(PricingError::InvalidRequest(_))));

    input.price = f64::NAN;
    assert!(matches!(book.set_confirmed_price(&input), Err(PricingError::InvalidRequest(_))));

    input.price = 100.0;
    input.cost = Some(-1.0);
    assert!(matches!(book.set_confirmed_price(&input), Err(PricingError::InvalidRequest(_))));

    input.cost = None;
    input.key = PriceKey::new(99, SCREEN, OEM);
    assert!(matches!(
        book.set_confirmed_price(&input),
        Err(PricingError::DeviceNotFound { device_model_id: 99 })
    ));

    assert_eq!(fx.store.price_record_count().unwrap(), 0);
}

/// A retired record frees its tuple; the next estimate starts a new record.
#[test]
fn deactivation_frees_the_tuple() {
    let fx = Fixture::new();
    fx.device(1, APPLE, "Phone", Some(2021));
    let id = fx.confirm(1, SCREEN, OEM, 229.0, None);

    assert!(fx.book().deactivate_price(id).unwrap());
    assert!(!fx.book().deactivate_price(id).unwrap());

    let retired = fx.store.price_record(id).unwrap().unwrap();
    assert!(!retired.is_active);
    assert!(retired.valid_until.is_some());

    let est = fx.estimator().estimate(&screen_oem(1)).unwrap();
    assert_eq!(est.method, EstimationMethod::Fallback);
    assert_ne!(est.price_record_id, id);

    let key = screen_oem(1).key();
    assert_eq!(fx.store.price_records_for_key(&key).unwrap().len(), 2);
    assert_eq!(fx.store.active_price_count(&key).unwrap(), 1);
}

#[test]
fn review_queue_lists_low_confidence_first() {
    let fx = Fixture::new();
    fx.device(1, APPLE, "Phone A", Some(2020));
    fx.device(2, APPLE, "Phone B", Some(2021));
    fx.device(3, APPLE, "Phone C", Some(2022));
    fx.device(20, SAMSUNG, "Galaxy", Some(2021));
    fx.confirm(1, SCREEN, OEM, 200.0, None);
    fx.confirm(3, SCREEN, OEM, 300.0, None);

    let interpolated = fx.estimator().estimate(&screen_oem(2)).unwrap();
    let averaged = fx.estimator().estimate(&screen_oem(20)).unwrap();
    let fallback = fx
        .estimator()
        .estimate(&repairdesk_core::estimator::EstimateRequest::new(20, BATTERY, OEM))
        .unwrap();
    assert_eq!(averaged.method, EstimationMethod::CategoryAverage);
    assert_eq!(fallback.method, EstimationMethod::Fallback);

    let queue = fx.book().review_queue().unwrap();
    let ids: Vec<_> = queue.iter().map(|r| r.price_record_id).collect();
    assert_eq!(ids, vec![fallback.price_record_id, averaged.price_record_id]);
    assert!(!ids.contains(&interpolated.price_record_id));
}

#[test]
fn stats_summarise_active_records() {
    let fx = Fixture::new();
    fx.device(1, APPLE, "Phone A", Some(2020));
    fx.device(2, APPLE, "Phone B", Some(2021));
    fx.confirm(1, SCREEN, OEM, 200.0, Some(90.0));
    fx.estimator().estimate(&screen_oem(2)).unwrap();
    fx.estimator()
        .estimate(&repairdesk_core::estimator::EstimateRequest::new(2, BATTERY, OEM))
        .unwrap();

    let stats = fx.book().stats().unwrap();
    assert_eq!(stats.active_records, 3);
    assert_eq!(stats.confirmed_records, 1);
    assert_eq!(stats.estimated_records, 2);
    assert_eq!(stats.low_confidence_records, 1);
    assert_eq!(stats.missing_cost_records, 1, "extrapolation carries the scaled cost");
    assert_eq!(stats.estimation_log_entries, 2);
    let mean = stats.mean_estimated_confidence.unwrap();
    assert!(approx(mean, (0.60 + 0.20) / 2.0), "got {mean}");
}
