//! Grouped sums over already-fetched ledger entries.
//!
//! Entries are loaded into a polars `DataFrame` once and every report is a
//! lazy `group_by` over it. Amounts are converted to `f64` here; the results
//! are for display and are rounded to cents.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use common::{CategoryTotal, MonthlyTotal, MovingAveragePoint, Percentiles, WeekdayTotal};
use model::transaction::LedgerEntry;
use polars::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::round2;

pub const UNCATEGORIZED: &str = "Uncategorized";

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Builds the frame every aggregation starts from.
///
/// Columns: `month` (`YYYY-MM`), `day` (`YYYY-MM-DD`), `weekday` (Monday = 0),
/// `category_id` (-1 when uncategorized), `category`, `amount`.
pub fn ledger_frame(entries: &[LedgerEntry]) -> Result<DataFrame> {
    let mut months = Vec::with_capacity(entries.len());
    let mut days = Vec::with_capacity(entries.len());
    let mut weekdays = Vec::with_capacity(entries.len());
    let mut category_ids = Vec::with_capacity(entries.len());
    let mut categories = Vec::with_capacity(entries.len());
    let mut amounts = Vec::with_capacity(entries.len());

    for entry in entries {
        let date = entry.date();
        months.push(date.format("%Y-%m").to_string());
        days.push(date.format("%Y-%m-%d").to_string());
        weekdays.push(date.weekday().num_days_from_monday() as i32);
        match entry.category() {
            Some(cat) => {
                category_ids.push(cat.id);
                categories.push(cat.name.clone());
            }
            None => {
                category_ids.push(-1);
                categories.push(UNCATEGORIZED.to_string());
            }
        }
        amounts.push(entry.amount().to_f64().unwrap_or(0.0));
    }

    let df = DataFrame::new(vec![
        Series::new("month".into(), months).into(),
        Series::new("day".into(), days).into(),
        Series::new("weekday".into(), weekdays).into(),
        Series::new("category_id".into(), category_ids).into(),
        Series::new("category".into(), categories).into(),
        Series::new("amount".into(), amounts).into(),
    ])?;

    Ok(df)
}

fn expense_expr() -> Expr {
    lit(0.0) - col("amount")
}

/// Income, expenses and net per calendar month, oldest first.
#[instrument(skip(entries), fields(num_entries = entries.len()))]
pub fn monthly_totals(entries: &[LedgerEntry]) -> Result<Vec<MonthlyTotal>> {
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let df = ledger_frame(entries)?
        .lazy()
        .group_by([col("month")])
        .agg([
            when(col("amount").gt(lit(0.0)))
                .then(col("amount"))
                .otherwise(lit(0.0))
                .sum()
                .alias("income"),
            when(col("amount").lt(lit(0.0)))
                .then(expense_expr())
                .otherwise(lit(0.0))
                .sum()
                .alias("expenses"),
            col("amount").count().cast(DataType::Int64).alias("count"),
        ])
        .sort(["month"], SortMultipleOptions::default())
        .collect()?;

    let months = df.column("month")?.str()?;
    let income = df.column("income")?.f64()?;
    let expenses = df.column("expenses")?.f64()?;
    let counts = df.column("count")?.i64()?;

    let mut totals = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let income = income.get(i).unwrap_or(0.0);
        let expenses = expenses.get(i).unwrap_or(0.0);
        totals.push(MonthlyTotal {
            month: months.get(i).unwrap_or_default().to_string(),
            income: round2(income),
            expenses: round2(expenses),
            net: round2(income - expenses),
            count: counts.get(i).unwrap_or(0),
        });
    }

    debug!("Computed {} monthly totals", totals.len());
    Ok(totals)
}

/// Expense totals per weekday. Always returns seven rows, Monday first.
#[instrument(skip(entries), fields(num_entries = entries.len()))]
pub fn weekday_totals(entries: &[LedgerEntry]) -> Result<Vec<WeekdayTotal>> {
    let mut grouped: HashMap<i32, (f64, i64)> = HashMap::new();

    let expenses: Vec<LedgerEntry> = entries.iter().filter(|e| e.is_expense()).cloned().collect();
    if !expenses.is_empty() {
        let df = ledger_frame(&expenses)?
            .lazy()
            .group_by([col("weekday")])
            .agg([
                expense_expr().sum().alias("total"),
                col("amount").count().cast(DataType::Int64).alias("count"),
            ])
            .collect()?;

        let weekdays = df.column("weekday")?.i32()?;
        let totals = df.column("total")?.f64()?;
        let counts = df.column("count")?.i64()?;
        for i in 0..df.height() {
            if let Some(weekday) = weekdays.get(i) {
                grouped.insert(weekday, (totals.get(i).unwrap_or(0.0), counts.get(i).unwrap_or(0)));
            }
        }
    }

    let rows = WEEKDAY_NAMES
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let (total, count) = grouped.get(&(idx as i32)).copied().unwrap_or((0.0, 0));
            let average = if count > 0 { total / count as f64 } else { 0.0 };
            WeekdayTotal {
                weekday: idx as u32,
                name: name.to_string(),
                total: round2(total),
                count,
                average: round2(average),
            }
        })
        .collect();

    Ok(rows)
}

/// Expense totals per category, largest first, with their share of all expenses.
#[instrument(skip(entries), fields(num_entries = entries.len()))]
pub fn category_totals(entries: &[LedgerEntry]) -> Result<Vec<CategoryTotal>> {
    let expenses: Vec<LedgerEntry> = entries.iter().filter(|e| e.is_expense()).cloned().collect();
    if expenses.is_empty() {
        return Ok(Vec::new());
    }

    let df = ledger_frame(&expenses)?
        .lazy()
        .group_by([col("category_id"), col("category")])
        .agg([
            expense_expr().sum().alias("total"),
            col("amount").count().cast(DataType::Int64).alias("count"),
        ])
        .sort(
            ["total"],
            SortMultipleOptions::default().with_order_descending(true),
        )
        .collect()?;

    let ids = df.column("category_id")?.i32()?;
    let names = df.column("category")?.str()?;
    let totals = df.column("total")?.f64()?;
    let counts = df.column("count")?.i64()?;

    let grand_total: f64 = totals.into_iter().flatten().sum();

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let total = totals.get(i).unwrap_or(0.0);
        let share = if grand_total > 0.0 {
            total / grand_total * 100.0
        } else {
            0.0
        };
        rows.push(CategoryTotal {
            category_id: ids.get(i).filter(|id| *id >= 0),
            category: names.get(i).unwrap_or(UNCATEGORIZED).to_string(),
            total: round2(total),
            count: counts.get(i).unwrap_or(0),
            share: round2(share),
        });
    }

    Ok(rows)
}

/// Daily expense totals from `start` to `end` with trailing 7 and 30 day
/// averages. Days without expenses count as zero; the first days of the
/// range average over the days seen so far.
#[instrument(skip(entries), fields(num_entries = entries.len(), start = %start, end = %end))]
pub fn daily_moving_averages(
    entries: &[LedgerEntry],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<MovingAveragePoint>> {
    if start > end {
        return Ok(Vec::new());
    }

    let mut by_day: HashMap<String, f64> = HashMap::new();
    let in_range: Vec<LedgerEntry> = entries
        .iter()
        .filter(|e| e.is_expense() && e.date() >= start && e.date() <= end)
        .cloned()
        .collect();
    if !in_range.is_empty() {
        let df = ledger_frame(&in_range)?
            .lazy()
            .group_by([col("day")])
            .agg([expense_expr().sum().alias("total")])
            .collect()?;
        let days = df.column("day")?.str()?;
        let totals = df.column("total")?.f64()?;
        for i in 0..df.height() {
            if let Some(day) = days.get(i) {
                by_day.insert(day.to_string(), totals.get(i).unwrap_or(0.0));
            }
        }
    }

    let dates: Vec<NaiveDate> = start.iter_days().take_while(|d| *d <= end).collect();
    let daily: Vec<f64> = dates
        .iter()
        .map(|d| {
            by_day
                .get(&d.format("%Y-%m-%d").to_string())
                .copied()
                .unwrap_or(0.0)
        })
        .collect();

    let dense = DataFrame::new(vec![Series::new("total".into(), daily.clone()).into()])?
        .lazy()
        .with_column(col("total").cum_sum(false).alias("cumulative"))
        .collect()?;
    let cumulative: Vec<f64> = dense
        .column("cumulative")?
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect();

    let trailing = |i: usize, window: usize| -> f64 {
        let len = window.min(i + 1);
        let upper = cumulative[i];
        let lower = if i + 1 > window { cumulative[i - window] } else { 0.0 };
        (upper - lower) / len as f64
    };

    let points = dates
        .into_iter()
        .enumerate()
        .map(|(i, date)| MovingAveragePoint {
            date,
            total: round2(daily[i]),
            ma7: round2(trailing(i, 7)),
            ma30: round2(trailing(i, 30)),
        })
        .collect();

    Ok(points)
}

/// Median and 90th percentile of individual expense amounts, linearly interpolated.
pub fn expense_percentiles(entries: &[LedgerEntry]) -> Percentiles {
    let mut values: Vec<f64> = entries
        .iter()
        .filter(|e| e.is_expense())
        .map(|e| -e.amount().to_f64().unwrap_or(0.0))
        .collect();
    values.sort_by(|a, b| a.total_cmp(b));

    Percentiles {
        p50: round2(percentile(&values, 0.5)),
        p90: round2(percentile(&values, 0.9)),
    }
}

/// Linear-interpolated percentile of sorted values; 0 for an empty slice.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::entities::category::CategoryKind;
    use model::transaction::CategoryRef;
    use rust_decimal::Decimal;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn entry(date: NaiveDate, cents: i64) -> LedgerEntry {
        LedgerEntry::new(date, Decimal::new(cents, 2), 1)
    }

    fn cat(id: i32, name: &str) -> CategoryRef {
        CategoryRef {
            id,
            name: name.to_string(),
            kind: CategoryKind::Need,
        }
    }

    #[test]
    fn test_monthly_totals() {
        let entries = vec![
            entry(d(2025, 1, 5), 500000),
            entry(d(2025, 1, 10), -120050),
            entry(d(2025, 1, 20), -29950),
            entry(d(2025, 2, 3), -10000),
        ];

        let totals = monthly_totals(&entries).unwrap();
        assert_eq!(totals.len(), 2);

        assert_eq!(totals[0].month, "2025-01");
        assert_eq!(totals[0].income, 5000.0);
        assert_eq!(totals[0].expenses, 1500.0);
        assert_eq!(totals[0].net, 3500.0);
        assert_eq!(totals[0].count, 3);

        assert_eq!(totals[1].month, "2025-02");
        assert_eq!(totals[1].income, 0.0);
        assert_eq!(totals[1].expenses, 100.0);
        assert_eq!(totals[1].net, -100.0);
    }

    #[test]
    fn test_monthly_totals_empty() {
        assert!(monthly_totals(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_weekday_totals() {
        // 2025-03-03 is a Monday
        let entries = vec![
            entry(d(2025, 3, 3), -1000),
            entry(d(2025, 3, 10), -3000),
            entry(d(2025, 3, 8), -500),
            entry(d(2025, 3, 4), 100000),
        ];

        let rows = weekday_totals(&entries).unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0].name, "Monday");
        assert_eq!(rows[0].total, 40.0);
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[0].average, 20.0);
        assert_eq!(rows[1].total, 0.0);
        assert_eq!(rows[5].total, 5.0);
    }

    #[test]
    fn test_category_totals_sorted_with_share() {
        let entries = vec![
            entry(d(2025, 1, 1), -7500).with_category(cat(1, "Alimentação")),
            entry(d(2025, 1, 2), -2500).with_category(cat(1, "Alimentação")),
            entry(d(2025, 1, 3), -10000).with_category(cat(2, "Moradia")),
            entry(d(2025, 1, 4), -5000),
            entry(d(2025, 1, 5), 90000).with_category(cat(3, "Salário")),
        ];

        let rows = category_totals(&entries).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].category, UNCATEGORIZED);
        assert_eq!(rows[2].category_id, None);
        assert_eq!(rows[2].total, 50.0);
        assert_eq!(rows[2].share, 20.0);

        let food = rows.iter().find(|r| r.category_id == Some(1)).unwrap();
        assert_eq!(food.total, 100.0);
        assert_eq!(food.count, 2);
        assert_eq!(food.share, 40.0);
    }

    #[test]
    fn test_daily_moving_averages() {
        let entries = vec![
            entry(d(2025, 1, 1), -7000),
            entry(d(2025, 1, 8), -1400),
            entry(d(2025, 1, 8), 50000),
        ];

        let points = daily_moving_averages(&entries, d(2025, 1, 1), d(2025, 1, 10)).unwrap();
        assert_eq!(points.len(), 10);
        assert_eq!(points[0].total, 70.0);
        assert_eq!(points[0].ma7, 70.0);
        assert_eq!(points[1].ma7, 35.0);
        assert_eq!(points[6].ma7, 10.0);
        // Jan 8 drops Jan 1 out of the 7 day window
        assert_eq!(points[7].total, 14.0);
        assert_eq!(points[7].ma7, 2.0);
        assert_eq!(points[7].ma30, 10.5);
    }

    #[test]
    fn test_percentiles() {
        let entries: Vec<LedgerEntry> = (1..=10)
            .map(|i| entry(d(2025, 1, i), -(i as i64) * 1000))
            .collect();

        let p = expense_percentiles(&entries);
        assert_eq!(p.p50, 55.0);
        assert_eq!(p.p90, 91.0);

        assert_eq!(expense_percentiles(&[]).p50, 0.0);
        assert_eq!(percentile(&[4.0], 0.9), 4.0);
    }
}
