use chrono::{Datelike, NaiveDate};
use common::last_day_of_month;
use model::entities::recurring_transaction::{self, Frequency};
use tracing::trace;

use crate::error::{ComputeError, Result};

/// Day a monthly schedule fires on in the given month. Days past the end of
/// a short month are clamped to its last day.
pub fn effective_day(day_of_month: u32, year: i32, month: u32) -> Option<u32> {
    let last = last_day_of_month(year, month)?.day();
    Some(day_of_month.clamp(1, last))
}

/// Checks the schedule fields required by `frequency`.
pub fn validate_schedule(
    frequency: Frequency,
    day_of_month: Option<i32>,
    day_of_week: Option<i32>,
    month_of_year: Option<i32>,
) -> Result<()> {
    let day_ok = |d: Option<i32>| matches!(d, Some(1..=31));
    match frequency {
        Frequency::Daily => Ok(()),
        Frequency::Weekly => match day_of_week {
            Some(0..=6) => Ok(()),
            _ => Err(ComputeError::InvalidInput(
                "weekly schedules need day_of_week between 0 (Monday) and 6".to_string(),
            )),
        },
        Frequency::Monthly if day_ok(day_of_month) => Ok(()),
        Frequency::Monthly => Err(ComputeError::InvalidInput(
            "monthly schedules need day_of_month between 1 and 31".to_string(),
        )),
        Frequency::Yearly => {
            if !matches!(month_of_year, Some(1..=12)) {
                return Err(ComputeError::InvalidInput(
                    "yearly schedules need month_of_year between 1 and 12".to_string(),
                ));
            }
            if !day_ok(day_of_month) {
                return Err(ComputeError::InvalidInput(
                    "yearly schedules need day_of_month between 1 and 31".to_string(),
                ));
            }
            Ok(())
        }
    }
}

/// Whether `definition` produces an occurrence on `date`.
pub fn is_due(definition: &recurring_transaction::Model, date: NaiveDate) -> bool {
    if !definition.active || date < definition.start_date {
        return false;
    }
    if definition.end_date.is_some_and(|end| date > end) {
        return false;
    }

    let start = definition.start_date;
    let due = match definition.frequency {
        Frequency::Daily => true,
        Frequency::Weekly => {
            let weekday = definition
                .day_of_week
                .map(|d| d as u32)
                .unwrap_or_else(|| start.weekday().num_days_from_monday());
            date.weekday().num_days_from_monday() == weekday
        }
        Frequency::Monthly => fires_on_day(definition, date),
        Frequency::Yearly => {
            let month = definition
                .month_of_year
                .map(|m| m as u32)
                .unwrap_or_else(|| start.month());
            date.month() == month && fires_on_day(definition, date)
        }
    };
    trace!(definition_id = definition.id, %date, due, "Checked recurring schedule");
    due
}

fn fires_on_day(definition: &recurring_transaction::Model, date: NaiveDate) -> bool {
    let day = definition
        .day_of_month
        .map(|d| d.max(1) as u32)
        .unwrap_or_else(|| definition.start_date.day());
    effective_day(day, date.year(), date.month()) == Some(date.day())
}

/// Definitions from `definitions` that are due on `date`, in input order.
pub fn due_on(definitions: &[recurring_transaction::Model], date: NaiveDate) -> Vec<&recurring_transaction::Model> {
    definitions.iter().filter(|d| is_due(d, date)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn definition(frequency: Frequency) -> recurring_transaction::Model {
        recurring_transaction::Model {
            id: 1,
            tenant_id: 1,
            account_id: 1,
            category_id: None,
            description: "Aluguel".to_string(),
            amount: Decimal::new(-150000, 2),
            frequency,
            day_of_month: None,
            day_of_week: None,
            month_of_year: None,
            start_date: d(2025, 1, 1),
            end_date: None,
            active: true,
            last_processed_on: None,
        }
    }

    #[test]
    fn test_effective_day_clamps_short_months() {
        assert_eq!(effective_day(31, 2025, 4), Some(30));
        assert_eq!(effective_day(31, 2025, 2), Some(28));
        assert_eq!(effective_day(30, 2024, 2), Some(29));
        assert_eq!(effective_day(15, 2025, 4), Some(15));
    }

    #[test]
    fn test_day_31_fires_on_april_30_and_not_may_1() {
        let mut def = definition(Frequency::Monthly);
        def.day_of_month = Some(31);

        assert!(is_due(&def, d(2025, 4, 30)));
        assert!(!is_due(&def, d(2025, 5, 1)));
        assert!(!is_due(&def, d(2025, 5, 30)));
        assert!(is_due(&def, d(2025, 5, 31)));
        assert!(is_due(&def, d(2025, 2, 28)));
    }

    #[test]
    fn test_weekly_matches_monday_based_weekday() {
        let mut def = definition(Frequency::Weekly);
        def.day_of_week = Some(0);

        // 2025-03-03 is a Monday
        assert!(is_due(&def, d(2025, 3, 3)));
        assert!(!is_due(&def, d(2025, 3, 4)));
        assert!(is_due(&def, d(2025, 3, 10)));
    }

    #[test]
    fn test_yearly_needs_month_and_day() {
        let mut def = definition(Frequency::Yearly);
        def.month_of_year = Some(2);
        def.day_of_month = Some(29);

        assert!(is_due(&def, d(2025, 2, 28)));
        assert!(is_due(&def, d(2024, 2, 29)));
        assert!(!is_due(&def, d(2024, 2, 28)));
        assert!(!is_due(&def, d(2025, 3, 29)));
    }

    #[test]
    fn test_window_and_active_flag() {
        let mut def = definition(Frequency::Daily);
        def.start_date = d(2025, 3, 10);
        def.end_date = Some(d(2025, 3, 20));

        assert!(!is_due(&def, d(2025, 3, 9)));
        assert!(is_due(&def, d(2025, 3, 10)));
        assert!(is_due(&def, d(2025, 3, 20)));
        assert!(!is_due(&def, d(2025, 3, 21)));

        def.active = false;
        assert!(!is_due(&def, d(2025, 3, 15)));
    }

    #[test]
    fn test_monthly_defaults_to_start_day() {
        let mut def = definition(Frequency::Monthly);
        def.start_date = d(2025, 1, 5);
        assert!(is_due(&def, d(2025, 2, 5)));
        assert!(!is_due(&def, d(2025, 2, 6)));
    }

    #[test]
    fn test_due_on_filters() {
        let mut monthly = definition(Frequency::Monthly);
        monthly.id = 2;
        monthly.day_of_month = Some(10);
        let daily = definition(Frequency::Daily);

        let defs = vec![daily, monthly];
        let due: Vec<i32> = due_on(&defs, d(2025, 6, 9)).iter().map(|d| d.id).collect();
        assert_eq!(due, vec![1]);
        let due: Vec<i32> = due_on(&defs, d(2025, 6, 10)).iter().map(|d| d.id).collect();
        assert_eq!(due, vec![1, 2]);
    }

    #[test]
    fn test_validate_schedule() {
        assert!(validate_schedule(Frequency::Daily, None, None, None).is_ok());
        assert!(validate_schedule(Frequency::Monthly, Some(31), None, None).is_ok());
        assert!(validate_schedule(Frequency::Monthly, Some(0), None, None).is_err());
        assert!(validate_schedule(Frequency::Monthly, None, None, None).is_err());
        assert!(validate_schedule(Frequency::Weekly, None, Some(6), None).is_ok());
        assert!(validate_schedule(Frequency::Weekly, None, Some(7), None).is_err());
        assert!(validate_schedule(Frequency::Yearly, Some(1), None, Some(13)).is_err());
        assert!(validate_schedule(Frequency::Yearly, Some(25), None, Some(12)).is_ok());
    }
}
