use crate::auth::{Permission, TenantContext};
use crate::error::{ApiError, ApiResult};
use crate::helpers::cache::{monthly_key, summary_key};
use crate::helpers::stats::{
    build_summary, determine_month, determine_time_period, load_ledger, load_month, period_bounds,
    today,
};
use crate::schemas::{ApiResponse, AppState, CachedData, ErrorResponse, PeriodQuery};
use axum::{
    extract::{Query, State},
    response::Json,
};
use axum_valid::Valid;
use chrono::{Datelike, Duration, NaiveDate};
use common::{
    CategoryTotal, DashboardSummary, DateRange, Forecast, MonthlyTotal, MovingAveragePoint,
    Percentiles, RatioReport, WeekdayTotal, last_day_of_month,
};
use compute::aggregation;
use compute::forecast::{DEFAULT_WINDOW, forecast_next_month, shift_month};
use compute::ratio::fifty_thirty_twenty;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Days covered by the moving averages when no range is given.
const DEFAULT_MOVING_AVERAGE_DAYS: i64 = 90;

/// Longest range the daily series is built for.
pub const MAX_MOVING_AVERAGE_DAYS: i64 = 731;

/// Range for the daily moving averages, the last 90 days by default
#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
pub struct MovingAverageQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Forecast parameters
#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
pub struct ForecastQuery {
    /// Number of months averaged, defaults to 3
    #[validate(range(min = 1, max = 24))]
    pub window: Option<usize>,
    /// Year of the last month feeding the forecast
    #[validate(range(min = 1900, max = 2200))]
    pub year: Option<i32>,
    /// Last month feeding the forecast, defaults to the previous month
    #[validate(range(min = 1, max = 12))]
    pub month: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MovingAveragesResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub points: Vec<MovingAveragePoint>,
    /// Percentiles of single expense amounts in the range
    pub percentiles: Percentiles,
}

fn moving_average_range(query: &MovingAverageQuery, now: NaiveDate) -> ApiResult<DateRange> {
    let end = query.end_date.unwrap_or(now);
    let start = query
        .start_date
        .unwrap_or_else(|| end - Duration::days(DEFAULT_MOVING_AVERAGE_DAYS - 1));
    if start > end {
        return Err(ApiError::bad_request(
            "INVALID_DATE_RANGE",
            "start_date must not be after end_date",
        ));
    }
    let days = (end - start).num_days() + 1;
    if days > MAX_MOVING_AVERAGE_DAYS {
        return Err(ApiError::bad_request(
            "INVALID_DATE_RANGE",
            format!(
                "range covers {} days, at most {} are allowed",
                days, MAX_MOVING_AVERAGE_DAYS
            ),
        ));
    }
    Ok(DateRange { start, end })
}

/// Last (year, month) feeding the forecast and the range covering the window.
fn forecast_range(query: &ForecastQuery, now: NaiveDate) -> ApiResult<(i32, u32, usize, DateRange)> {
    let window = query.window.unwrap_or(DEFAULT_WINDOW);
    let (year, month) = match (query.year, query.month) {
        (Some(year), Some(month)) => (year, month),
        (None, Some(month)) => (now.year(), month),
        _ => shift_month(now.year(), now.month(), -1),
    };
    let (first_year, first_month) = shift_month(year, month, -(window as i32 - 1));

    let start = NaiveDate::from_ymd_opt(first_year, first_month, 1);
    let end = last_day_of_month(year, month);
    match (start, end) {
        (Some(start), Some(end)) => Ok((year, month, window, DateRange { start, end })),
        _ => Err(ApiError::bad_request(
            "INVALID_PERIOD",
            format!("cannot forecast from {}-{:02}", year, month),
        )),
    }
}

/// Get income and expenses per month
#[utoipa::path(
    get,
    path = "/api/v1/analytics/monthly",
    tag = "analytics",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Monthly totals calculated", body = ApiResponse<Vec<MonthlyTotal>>),
        (status = 400, description = "Invalid period", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_monthly_totals(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Query(query)): Valid<Query<PeriodQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<MonthlyTotal>>>> {
    ctx.require(Permission::Read)?;
    let range = period_bounds(&determine_time_period(&query))?;

    let cache_key = monthly_key(ctx.tenant_id(), &range.start.to_string(), &range.end.to_string());
    if let Some(CachedData::Monthly(totals)) = state.cache.get(&cache_key).await {
        debug!("Monthly totals served from cache");
        return Ok(Json(ApiResponse::ok(totals, "Monthly totals retrieved from cache")));
    }

    let entries = load_ledger(&state.db, ctx.tenant_id(), Some(range)).await?;
    let totals = aggregation::monthly_totals(&entries)?;
    state
        .cache
        .insert(cache_key, CachedData::Monthly(totals.clone()))
        .await;

    Ok(Json(ApiResponse::ok(totals, "Monthly totals calculated successfully")))
}

/// Get expenses per weekday
#[utoipa::path(
    get,
    path = "/api/v1/analytics/weekdays",
    tag = "analytics",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Weekday totals calculated", body = ApiResponse<Vec<WeekdayTotal>>),
        (status = 400, description = "Invalid period", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_weekday_totals(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Query(query)): Valid<Query<PeriodQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<WeekdayTotal>>>> {
    ctx.require(Permission::Read)?;
    let range = period_bounds(&determine_time_period(&query))?;
    let entries = load_ledger(&state.db, ctx.tenant_id(), Some(range)).await?;
    let totals = aggregation::weekday_totals(&entries)?;
    Ok(Json(ApiResponse::ok(totals, "Weekday totals calculated successfully")))
}

/// Get expenses per category and their share of all expenses
#[utoipa::path(
    get,
    path = "/api/v1/analytics/categories",
    tag = "analytics",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Category totals calculated", body = ApiResponse<Vec<CategoryTotal>>),
        (status = 400, description = "Invalid period", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_category_totals(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Query(query)): Valid<Query<PeriodQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<CategoryTotal>>>> {
    ctx.require(Permission::Read)?;
    let range = period_bounds(&determine_time_period(&query))?;
    let entries = load_ledger(&state.db, ctx.tenant_id(), Some(range)).await?;
    let totals = aggregation::category_totals(&entries)?;
    Ok(Json(ApiResponse::ok(totals, "Category totals calculated successfully")))
}

/// Get daily expenses with 7 and 30 day moving averages
#[utoipa::path(
    get,
    path = "/api/v1/analytics/moving-averages",
    tag = "analytics",
    params(MovingAverageQuery),
    responses(
        (status = 200, description = "Moving averages calculated", body = ApiResponse<MovingAveragesResponse>),
        (status = 400, description = "Invalid date range", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_moving_averages(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Query(query)): Valid<Query<MovingAverageQuery>>,
) -> ApiResult<Json<ApiResponse<MovingAveragesResponse>>> {
    ctx.require(Permission::Read)?;
    let range = moving_average_range(&query, today())?;

    let entries = load_ledger(&state.db, ctx.tenant_id(), Some(range)).await?;
    let points = aggregation::daily_moving_averages(&entries, range.start, range.end)?;
    let percentiles = aggregation::expense_percentiles(&entries);

    Ok(Json(ApiResponse::ok(
        MovingAveragesResponse {
            start: range.start,
            end: range.end,
            points,
            percentiles,
        },
        "Moving averages calculated successfully",
    )))
}

/// Estimate next month's expenses from the trailing months
#[utoipa::path(
    get,
    path = "/api/v1/analytics/forecast",
    tag = "analytics",
    params(ForecastQuery),
    responses(
        (status = 200, description = "Forecast calculated", body = ApiResponse<Forecast>),
        (status = 400, description = "Invalid parameters", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_forecast(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Query(query)): Valid<Query<ForecastQuery>>,
) -> ApiResult<Json<ApiResponse<Forecast>>> {
    ctx.require(Permission::Read)?;
    let (year, month, window, range) = forecast_range(&query, today())?;

    let entries = load_ledger(&state.db, ctx.tenant_id(), Some(range)).await?;
    let forecast = forecast_next_month(&entries, year, month, window)?;
    debug!("Forecast for {}: {} ({:?})", forecast.month, forecast.estimate, forecast.trend);

    Ok(Json(ApiResponse::ok(forecast, "Forecast calculated successfully")))
}

/// Compare a month's spending with the 50/30/20 rule
#[utoipa::path(
    get,
    path = "/api/v1/analytics/budget-rule",
    tag = "analytics",
    params(PeriodQuery),
    responses(
        (status = 200, description = "50/30/20 report calculated", body = ApiResponse<RatioReport>),
        (status = 400, description = "Invalid month", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_budget_rule(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Query(query)): Valid<Query<PeriodQuery>>,
) -> ApiResult<Json<ApiResponse<RatioReport>>> {
    ctx.require(Permission::Read)?;
    let (year, month) = determine_month(&query)?;
    let entries = load_month(&state.db, ctx.tenant_id(), year, month).await?;
    let report = fifty_thirty_twenty(&entries, year, month);
    Ok(Json(ApiResponse::ok(report, "50/30/20 report calculated successfully")))
}

/// Get the dashboard numbers of a month
#[utoipa::path(
    get,
    path = "/api/v1/analytics/summary",
    tag = "analytics",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Summary calculated", body = ApiResponse<DashboardSummary>),
        (status = 400, description = "Invalid month", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_summary(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Query(query)): Valid<Query<PeriodQuery>>,
) -> ApiResult<Json<ApiResponse<DashboardSummary>>> {
    ctx.require(Permission::Read)?;
    let (year, month) = determine_month(&query)?;

    let cache_key = summary_key(ctx.tenant_id(), year, month);
    if let Some(CachedData::Summary(summary)) = state.cache.get(&cache_key).await {
        debug!("Summary served from cache");
        return Ok(Json(ApiResponse::ok(summary, "Summary retrieved from cache")));
    }

    let entries = load_month(&state.db, ctx.tenant_id(), year, month).await?;
    let summary = build_summary(&entries, year, month)?;
    state
        .cache
        .insert(cache_key, CachedData::Summary(summary.clone()))
        .await;

    Ok(Json(ApiResponse::ok(summary, "Summary calculated successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_moving_average_default_range() {
        let range = moving_average_range(&MovingAverageQuery::default(), date(2025, 3, 31)).unwrap();
        assert_eq!(range.end, date(2025, 3, 31));
        assert_eq!(range.start, date(2025, 1, 1));

        let inverted = MovingAverageQuery {
            start_date: Some(date(2025, 3, 1)),
            end_date: Some(date(2025, 2, 1)),
        };
        assert!(moving_average_range(&inverted, date(2025, 3, 31)).is_err());
    }

    #[test]
    fn test_moving_average_range_is_capped() {
        let two_years = MovingAverageQuery {
            start_date: Some(date(2023, 1, 1)),
            end_date: Some(date(2024, 12, 31)),
        };
        assert!(moving_average_range(&two_years, date(2025, 3, 31)).is_ok());

        let huge = MovingAverageQuery {
            start_date: Some(date(1, 1, 1)),
            end_date: Some(date(9999, 12, 31)),
        };
        let err = moving_average_range(&huge, date(2025, 3, 31)).unwrap_err();
        assert_eq!(err.status_and_code().1, "INVALID_DATE_RANGE");

        let only_start = MovingAverageQuery {
            start_date: Some(date(2000, 1, 1)),
            end_date: None,
        };
        assert!(moving_average_range(&only_start, date(2025, 3, 31)).is_err());
    }

    #[test]
    fn test_forecast_defaults_to_previous_month() {
        let (year, month, window, range) =
            forecast_range(&ForecastQuery::default(), date(2025, 1, 15)).unwrap();
        assert_eq!((year, month, window), (2024, 12, DEFAULT_WINDOW));
        assert_eq!(range.start, date(2024, 10, 1));
        assert_eq!(range.end, date(2024, 12, 31));
    }

    #[test]
    fn test_forecast_explicit_month() {
        let query = ForecastQuery {
            window: Some(2),
            year: Some(2024),
            month: Some(3),
        };
        let (_, _, _, range) = forecast_range(&query, date(2025, 1, 15)).unwrap();
        assert_eq!(range.start, date(2024, 2, 1));
        assert_eq!(range.end, date(2024, 3, 31));
    }
}
