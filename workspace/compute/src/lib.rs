//! Business rules over already-fetched ledger data.
//!
//! Nothing in this crate talks to the database. Handlers load a tenant's rows,
//! convert them with [`model::transaction::LedgerEntry::from_model`] and call
//! into the modules below.

pub mod aggregation;
pub mod budget;
pub mod categorize;
pub mod error;
pub mod forecast;
pub mod goal;
pub mod ratio;
pub mod schedule;
pub mod search;
pub mod tax;

pub use error::{ComputeError, Result};

/// Rounds to two decimal places for display.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
