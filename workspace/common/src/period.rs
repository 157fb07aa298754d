use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Time period a report is computed for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimePeriod {
    /// Whole calendar year
    Year { year: i32 },
    /// Single calendar month
    Month { year: i32, month: u32 },
    /// Inclusive custom range
    DateRange { start: NaiveDate, end: NaiveDate },
}

impl TimePeriod {
    pub fn year(year: i32) -> Self {
        TimePeriod::Year { year }
    }

    pub fn month(year: i32, month: u32) -> Self {
        TimePeriod::Month { year, month }
    }

    pub fn date_range(start: NaiveDate, end: NaiveDate) -> Self {
        TimePeriod::DateRange { start, end }
    }

    /// Picks the narrowest period the optional parts describe, falling back
    /// to the year of `today`.
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        year: Option<i32>,
        month: Option<u32>,
        today: NaiveDate,
    ) -> Self {
        if let (Some(start), Some(end)) = (start, end) {
            TimePeriod::date_range(start, end)
        } else if let (Some(year), Some(month)) = (year, month) {
            TimePeriod::month(year, month)
        } else if let Some(month) = month {
            TimePeriod::month(today.year(), month)
        } else if let Some(year) = year {
            TimePeriod::year(year)
        } else {
            TimePeriod::year(today.year())
        }
    }

    /// First and last day covered, or `None` when the month is out of range.
    pub fn bounds(&self) -> Option<DateRange> {
        match *self {
            TimePeriod::Year { year } => Some(DateRange {
                start: NaiveDate::from_ymd_opt(year, 1, 1)?,
                end: NaiveDate::from_ymd_opt(year, 12, 31)?,
            }),
            TimePeriod::Month { year, month } => {
                let start = NaiveDate::from_ymd_opt(year, month, 1)?;
                Some(DateRange {
                    start,
                    end: last_day_of_month(year, month)?,
                })
            }
            TimePeriod::DateRange { start, end } => {
                if start > end {
                    None
                } else {
                    Some(DateRange { start, end })
                }
            }
        }
    }
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Last calendar day of the given month.
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}
