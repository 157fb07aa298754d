use chrono::{Datelike, NaiveDate};
use common::GoalProgress;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::round2;

/// Whole calendar months from `today` until `deadline`, counting the deadline's month.
pub fn months_until(today: NaiveDate, deadline: NaiveDate) -> u32 {
    if deadline < today {
        return 0;
    }
    let months = (deadline.year() - today.year()) * 12 + deadline.month() as i32
        - today.month() as i32;
    (months.max(0) as u32) + 1
}

/// Progress of a goal towards `target` on `today`.
///
/// Past deadlines ask for the whole remaining amount at once.
pub fn goal_progress(
    target: Decimal,
    current: Decimal,
    deadline: Option<NaiveDate>,
    today: NaiveDate,
) -> GoalProgress {
    let remaining = (target - current).max(Decimal::ZERO);
    let completed = target > Decimal::ZERO && current >= target;
    let percentage = if target > Decimal::ZERO {
        (current / target * Decimal::ONE_HUNDRED)
            .to_f64()
            .unwrap_or(0.0)
            .clamp(0.0, 100.0)
    } else {
        0.0
    };

    let months_left = deadline.map(|d| months_until(today, d));
    let monthly_needed = months_left.map(|months| {
        if completed {
            Decimal::ZERO
        } else if months == 0 {
            remaining
        } else {
            (remaining / Decimal::from(months)).round_dp(2)
        }
    });

    GoalProgress {
        percentage: round2(percentage),
        remaining,
        completed,
        monthly_needed,
        months_left,
    }
}
