use chrono::Datelike;
use common::{BucketReport, BucketStatus, RatioReport};
use model::entities::category::CategoryKind;
use model::transaction::LedgerEntry;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

use crate::round2;

pub const NEEDS_TARGET: u32 = 50;
pub const WANTS_TARGET: u32 = 30;
pub const SAVINGS_TARGET: u32 = 20;

/// Percentage points a bucket may deviate from its target and still be on target.
pub const TOLERANCE_POINTS: f64 = 2.0;

/// 50/30/20 split of one month's expenses against its income.
///
/// Expenses without a category, or booked to an income category, are counted
/// as wants.
pub fn fifty_thirty_twenty(entries: &[LedgerEntry], year: i32, month: u32) -> RatioReport {
    let mut income = Decimal::ZERO;
    let mut needs = Decimal::ZERO;
    let mut wants = Decimal::ZERO;
    let mut savings = Decimal::ZERO;

    for entry in entries
        .iter()
        .filter(|e| e.date().year() == year && e.date().month() == month)
    {
        let amount = entry.amount();
        if amount > Decimal::ZERO {
            income += amount;
            continue;
        }
        let spent = -amount;
        match entry.category().map(|c| c.kind) {
            Some(CategoryKind::Need) => needs += spent,
            Some(CategoryKind::Savings) => savings += spent,
            Some(CategoryKind::Want) | Some(CategoryKind::Income) | None => wants += spent,
        }
    }

    debug!(%income, %needs, %wants, %savings, "Computed 50/30/20 buckets for {}-{:02}", year, month);

    RatioReport {
        year,
        month,
        income,
        needs: bucket(needs, income, NEEDS_TARGET),
        wants: bucket(wants, income, WANTS_TARGET),
        savings: bucket(savings, income, SAVINGS_TARGET),
    }
}

fn bucket(amount: Decimal, income: Decimal, target: u32) -> BucketReport {
    let target_percentage = target as f64;
    let percentage = if income > Decimal::ZERO {
        (amount / income * Decimal::ONE_HUNDRED).to_f64().unwrap_or(0.0)
    } else {
        0.0
    };

    let status = if percentage > target_percentage + TOLERANCE_POINTS {
        BucketStatus::Over
    } else if percentage < target_percentage - TOLERANCE_POINTS {
        BucketStatus::Under
    } else {
        BucketStatus::OnTarget
    };

    BucketReport {
        amount,
        percentage: round2(percentage),
        target_percentage,
        target_amount: (income * Decimal::from(target) / Decimal::ONE_HUNDRED).round_dp(2),
        status,
    }
}
