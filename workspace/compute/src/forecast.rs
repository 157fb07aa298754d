use std::collections::HashMap;

use common::{Forecast, MonthlyTotal, Trend};
use model::transaction::LedgerEntry;
use tracing::{debug, instrument};

use crate::aggregation::monthly_totals;
use crate::error::{ComputeError, Result};
use crate::round2;

pub const DEFAULT_WINDOW: usize = 3;

/// Relative change below which the trend is reported as flat.
pub const TREND_TOLERANCE: f64 = 0.05;

/// Moves a (year, month) pair by `delta` months.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + (month as i32 - 1) + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

pub fn month_label(year: i32, month: u32) -> String {
    format!("{:04}-{:02}", year, month)
}

/// Estimates the expenses of the month after (`last_year`, `last_month`) from
/// the `window` months ending with it. Months without entries count as zero.
#[instrument(skip(entries), fields(num_entries = entries.len()))]
pub fn forecast_next_month(
    entries: &[LedgerEntry],
    last_year: i32,
    last_month: u32,
    window: usize,
) -> Result<Forecast> {
    if window == 0 {
        return Err(ComputeError::InvalidInput(
            "forecast window must be at least one month".to_string(),
        ));
    }
    if !(1..=12).contains(&last_month) {
        return Err(ComputeError::Date(format!("invalid month {}", last_month)));
    }

    let by_month: HashMap<String, MonthlyTotal> = monthly_totals(entries)?
        .into_iter()
        .map(|t| (t.month.clone(), t))
        .collect();

    let months: Vec<MonthlyTotal> = (0..window as i32)
        .rev()
        .map(|back| {
            let (y, m) = shift_month(last_year, last_month, -back);
            let label = month_label(y, m);
            by_month.get(&label).cloned().unwrap_or(MonthlyTotal {
                month: label,
                income: 0.0,
                expenses: 0.0,
                net: 0.0,
                count: 0,
            })
        })
        .collect();

    let expenses: Vec<f64> = months.iter().map(|m| m.expenses).collect();
    let estimate = mean(&expenses);
    let lower = expenses.iter().copied().fold(f64::INFINITY, f64::min);
    let upper = expenses.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let trend = trend_of(&expenses);

    let (next_year, next_month) = shift_month(last_year, last_month, 1);
    debug!(
        estimate,
        ?trend,
        "Forecast for {}",
        month_label(next_year, next_month)
    );

    Ok(Forecast {
        month: month_label(next_year, next_month),
        estimate: round2(estimate),
        trend,
        lower: round2(lower),
        upper: round2(upper),
        window: months,
    })
}

/// Compares the last value with the mean of the ones before it.
pub fn trend_of(values: &[f64]) -> Trend {
    let Some((last, earlier)) = values.split_last() else {
        return Trend::Flat;
    };
    if earlier.is_empty() {
        return Trend::Flat;
    }
    let baseline = mean(earlier);
    if baseline == 0.0 {
        return if *last > 0.0 { Trend::Up } else { Trend::Flat };
    }
    let change = (last - baseline) / baseline;
    if change > TREND_TOLERANCE {
        Trend::Up
    } else if change < -TREND_TOLERANCE {
        Trend::Down
    } else {
        Trend::Flat
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
