//! Repair-desk pricing core.
//!
//! Owns the catalog/price persistence layer and the smart price
//! estimation engine that fills gaps in the price matrix.
//!
//! RULE: Only `store` talks to the database.

pub mod catalog;
pub mod category_average;
pub mod confidence;
pub mod config;
pub mod error;
pub mod estimator;
pub mod extrapolation;
pub mod interpolation;
pub mod price;
pub mod price_book;
pub mod reference_set;
pub mod rounding;
pub mod store;
pub mod tier;
pub mod types;
