//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The estimator and price book call store methods; they never execute SQL directly.

use crate::error::{PricingError, PricingResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use std::time::Duration;

mod catalog;
mod history;
mod price;

/// How long a writer waits on another connection's lock before giving up.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

pub struct PriceStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl PriceStore {
    pub fn open(path: &str) -> PricingResult<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT_MS)
    }

    pub fn open_with_timeout(path: &str, busy_timeout_ms: u64) -> PricingResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
        // WAL lets estimators read while another connection writes.
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::debug!("store: opened {path} (journal_mode={mode})");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PricingResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new in-memory database (isolated).
    /// For file-based databases, this opens the same file.
    pub fn reopen(&self) -> PricingResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order. Safe to run more than once.
    pub fn migrate(&self) -> PricingResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_catalog.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_pricing.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_provenance.sql"))?;
        Ok(())
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction: commit on `Ok`,
    /// roll back on `Err`. Every statement `f` issues through the store
    /// belongs to the transaction.
    pub fn with_write_tx<T, F>(&self, f: F) -> PricingResult<T>
    where
        F: FnOnce(&PriceStore) -> PricingResult<T>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        match f(self) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                let _ = tx.rollback();
                Err(e)
            }
        }
    }
}

/// Map a unique-index violation to a persistence conflict on `key`.
/// Any other error passes through unchanged.
fn conflict_or(
    err: rusqlite::Error,
    key: &crate::price::PriceKey,
) -> PricingError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            PricingError::PersistenceConflict {
                device_model_id: key.device_model_id,
                repair_type_id:  key.repair_type_id,
                part_quality_id: key.part_quality_id,
            }
        }
        _ => PricingError::Database(err),
    }
}

/// Cross-brand mean of confirmed prices for one repair type and part quality.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CategoryMean {
    /// None when no confirmed price exists.
    pub price:        Option<f64>,
    /// Mean over the prices that carry a cost; None when none do.
    pub cost:         Option<f64>,
    pub sample_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingStats {
    pub active_records:          i64,
    pub confirmed_records:       i64,
    pub estimated_records:       i64,
    /// Mean confidence over active estimated records, if any exist.
    pub mean_estimated_confidence: Option<f64>,
    pub low_confidence_records:  i64,
    pub missing_cost_records:    i64,
    pub estimation_log_entries:  i64,
}
