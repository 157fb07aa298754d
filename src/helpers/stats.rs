use chrono::{Datelike, NaiveDate, Utc};
use common::{DashboardSummary, DateRange, TimePeriod};
use compute::aggregation;
use model::entities::{account, category, transaction};
use model::transaction::LedgerEntry;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::{debug, trace};

use crate::error::{ApiError, ApiResult};
use crate::schemas::PeriodQuery;

/// Number of categories listed on the dashboard.
pub const TOP_CATEGORIES: usize = 5;

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Helper function to determine time period from query parameters
pub fn determine_time_period(query: &PeriodQuery) -> TimePeriod {
    TimePeriod::resolve(
        query.start_date,
        query.end_date,
        query.year,
        query.month,
        today(),
    )
}

/// First and last day of `period`, rejecting inverted ranges.
pub fn period_bounds(period: &TimePeriod) -> ApiResult<DateRange> {
    period.bounds().ok_or_else(|| {
        ApiError::bad_request("INVALID_PERIOD", format!("invalid period: {:?}", period))
    })
}

/// (year, month) of the month selected by `query`, defaulting to the current month.
pub fn determine_month(query: &PeriodQuery) -> ApiResult<(i32, u32)> {
    let now = today();
    let year = query.year.unwrap_or_else(|| now.year());
    let month = query.month.unwrap_or_else(|| now.month());
    if !(1..=12).contains(&month) {
        return Err(ApiError::Validation(format!("month {} is out of range", month)));
    }
    Ok((year, month))
}

pub async fn tenant_categories<C: ConnectionTrait>(
    db: &C,
    tenant_id: i32,
) -> ApiResult<Vec<category::Model>> {
    Ok(category::Entity::find()
        .filter(category::Column::TenantId.eq(tenant_id))
        .order_by_asc(category::Column::Name)
        .all(db)
        .await?)
}

/// Loads the tenant's transactions in `range` as ledger entries.
///
/// Accounts with `include_in_statistics = false` are left out.
pub async fn load_ledger<C: ConnectionTrait>(
    db: &C,
    tenant_id: i32,
    range: Option<DateRange>,
) -> ApiResult<Vec<LedgerEntry>> {
    let account_ids: Vec<i32> = account::Entity::find()
        .filter(account::Column::TenantId.eq(tenant_id))
        .filter(account::Column::IncludeInStatistics.eq(true))
        .all(db)
        .await?
        .into_iter()
        .map(|a| a.id)
        .collect();

    if account_ids.is_empty() {
        debug!("Tenant {} has no accounts included in statistics", tenant_id);
        return Ok(Vec::new());
    }

    let mut query = transaction::Entity::find()
        .filter(transaction::Column::TenantId.eq(tenant_id))
        .filter(transaction::Column::AccountId.is_in(account_ids));
    if let Some(range) = range {
        query = query
            .filter(transaction::Column::Date.gte(range.start))
            .filter(transaction::Column::Date.lte(range.end));
    }
    let transactions = query
        .order_by_asc(transaction::Column::Date)
        .order_by_asc(transaction::Column::Id)
        .all(db)
        .await?;

    let categories = tenant_categories(db, tenant_id).await?;
    trace!(
        "Loaded {} transactions and {} categories for tenant {}",
        transactions.len(),
        categories.len(),
        tenant_id
    );

    Ok(transactions
        .iter()
        .map(|t| LedgerEntry::from_model(t, &categories))
        .collect())
}

/// Loads one calendar month of ledger entries.
pub async fn load_month<C: ConnectionTrait>(
    db: &C,
    tenant_id: i32,
    year: i32,
    month: u32,
) -> ApiResult<Vec<LedgerEntry>> {
    let range = period_bounds(&TimePeriod::month(year, month))?;
    load_ledger(db, tenant_id, Some(range)).await
}

/// Dashboard figures for one month of entries.
pub fn build_summary(entries: &[LedgerEntry], year: i32, month: u32) -> ApiResult<DashboardSummary> {
    let income: Decimal = entries.iter().filter(|e| e.is_income()).map(|e| e.amount()).sum();
    let expenses: Decimal = -entries
        .iter()
        .filter(|e| e.is_expense())
        .map(|e| e.amount())
        .sum::<Decimal>();

    let mut top_categories = aggregation::category_totals(entries)?;
    top_categories.truncate(TOP_CATEGORIES);

    Ok(DashboardSummary {
        year,
        month,
        income: income.to_f64().unwrap_or(0.0),
        expenses: expenses.to_f64().unwrap_or(0.0),
        net: (income - expenses).to_f64().unwrap_or(0.0),
        transaction_count: entries.len() as i64,
        uncategorized_count: entries.iter().filter(|e| e.category().is_none()).count() as i64,
        top_categories,
    })
}
