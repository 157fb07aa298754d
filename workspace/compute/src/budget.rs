use chrono::Datelike;
use common::BudgetProgress;
use model::transaction::LedgerEntry;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{ComputeError, Result};
use crate::round2;

pub const DEFAULT_ALERT_THRESHOLD: i32 = 80;

/// Sum of expenses booked to `category_id` in the given month, as a positive amount.
pub fn spent_in_month(entries: &[LedgerEntry], category_id: i32, year: i32, month: u32) -> Decimal {
    -entries
        .iter()
        .filter(|e| e.is_expense())
        .filter(|e| e.date().year() == year && e.date().month() == month)
        .filter(|e| e.category().is_some_and(|c| c.id == category_id))
        .map(|e| e.amount())
        .sum::<Decimal>()
}

/// Compares `spent` against `limit`.
///
/// The alert uses the unclamped percentage, so a budget at 150 % with an 80 %
/// threshold alerts even though it displays as 100 %.
pub fn budget_progress(limit: Decimal, spent: Decimal, alert_threshold: i32) -> Result<BudgetProgress> {
    if limit <= Decimal::ZERO {
        return Err(ComputeError::InvalidInput(
            "budget limit must be greater than zero".to_string(),
        ));
    }

    let ratio = spent / limit * Decimal::ONE_HUNDRED;
    let percentage = ratio
        .to_f64()
        .ok_or_else(|| ComputeError::Decimal(format!("cannot represent {} as f64", ratio)))?;

    Ok(BudgetProgress {
        limit,
        spent,
        remaining: limit - spent,
        percentage: round2(percentage),
        display_percentage: round2(percentage.clamp(0.0, 100.0)),
        alert_threshold,
        alert: ratio >= Decimal::from(alert_threshold),
        exceeded: spent > limit,
    })
}
