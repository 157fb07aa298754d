//! Report shapes produced by the compute crate and returned by the API.
//!
//! Aggregated analytics are presentation arithmetic and use `f64` rounded to
//! cents. Budget, ratio and tax reports keep `Decimal` amounts so the figures
//! match the ledger exactly.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Income and expenses of one calendar month.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct MonthlyTotal {
    /// Month in `YYYY-MM` form
    pub month: String,
    pub income: f64,
    /// Sum of expenses as a positive number
    pub expenses: f64,
    pub net: f64,
    pub count: i64,
}

/// Expense totals for one weekday.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct WeekdayTotal {
    /// Monday = 0
    pub weekday: u32,
    pub name: String,
    pub total: f64,
    pub count: i64,
    pub average: f64,
}

/// Expense total of one category and its share of all expenses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct CategoryTotal {
    pub category_id: Option<i32>,
    pub category: String,
    pub total: f64,
    pub count: i64,
    /// Percentage of the expense total
    pub share: f64,
}

/// Daily expense total with trailing moving averages.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct MovingAveragePoint {
    pub date: NaiveDate,
    pub total: f64,
    pub ma7: f64,
    pub ma30: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Percentiles {
    pub p50: f64,
    pub p90: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

/// Naive next-month expense estimate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Forecast {
    /// Month being estimated in `YYYY-MM` form
    pub month: String,
    pub estimate: f64,
    pub trend: Trend,
    pub lower: f64,
    pub upper: f64,
    /// Months that fed the estimate
    pub window: Vec<MonthlyTotal>,
}

/// Spending of one budget against its limit.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct BudgetProgress {
    pub limit: Decimal,
    pub spent: Decimal,
    pub remaining: Decimal,
    /// Unclamped spent / limit × 100
    pub percentage: f64,
    /// `percentage` clamped to 0..=100
    pub display_percentage: f64,
    pub alert_threshold: i32,
    pub alert: bool,
    pub exceeded: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BucketStatus {
    Under,
    OnTarget,
    Over,
}

/// One bucket of the 50/30/20 split.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct BucketReport {
    pub amount: Decimal,
    /// Share of income
    pub percentage: f64,
    pub target_percentage: f64,
    pub target_amount: Decimal,
    pub status: BucketStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct RatioReport {
    pub year: i32,
    pub month: u32,
    pub income: Decimal,
    pub needs: BucketReport,
    pub wants: BucketReport,
    pub savings: BucketReport,
}

/// Monthly IRPF withholding estimate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct TaxEstimate {
    pub gross_income: Decimal,
    pub dependents: u32,
    pub other_deductions: Decimal,
    pub taxable_base: Decimal,
    /// Bracket rate in percent
    pub rate: Decimal,
    pub bracket_deduction: Decimal,
    pub monthly_tax: Decimal,
    /// Tax as a percentage of gross income
    pub effective_rate: Decimal,
    pub annual_tax: Decimal,
}

/// Filters extracted from a free-text search query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ParsedQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub category: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
}

impl ParsedQuery {
    pub fn is_empty(&self) -> bool {
        self == &ParsedQuery::default()
    }
}

/// Dashboard numbers for one month.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct DashboardSummary {
    pub year: i32,
    pub month: u32,
    pub income: f64,
    pub expenses: f64,
    pub net: f64,
    pub transaction_count: i64,
    pub uncategorized_count: i64,
    pub top_categories: Vec<CategoryTotal>,
}

/// How far a savings goal has come.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct GoalProgress {
    /// Percent of the target reached, clamped to [0, 100]
    pub percentage: f64,
    pub remaining: Decimal,
    pub completed: bool,
    /// Amount to save per month to reach the target by the deadline
    pub monthly_needed: Option<Decimal>,
    /// Whole months left until the deadline, zero when it has passed
    pub months_left: Option<u32>,
}
