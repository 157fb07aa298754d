use crate::auth::{Permission, TenantContext};
use crate::error::{ApiError, ApiResult};
use crate::helpers::cache::invalidate_tenant;
use crate::helpers::converters::{double_option, enum_name, parse_enum, parse_optional_enum};
use crate::helpers::recurring::{ProcessReport, process_tenant};
use crate::helpers::scoped::{ensure_account, ensure_optional_category, find_recurring_transaction};
use crate::helpers::stats::today;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::NaiveDate;
use compute::schedule::validate_schedule;
use model::entities::recurring_transaction::{self, Frequency};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for creating a recurring definition
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateRecurringTransactionRequest {
    pub account_id: i32,
    /// Leave empty to let the rules categorize each occurrence
    pub category_id: Option<i32>,
    #[validate(length(min = 1, max = 255))]
    pub description: String,
    /// Positive for income, negative for expense
    pub amount: Decimal,
    /// Daily, Weekly, Monthly or Yearly
    pub frequency: String,
    /// 1-31, monthly and yearly schedules. Short months fire on their last day.
    pub day_of_month: Option<i32>,
    /// 0 (Monday) - 6 (Sunday), weekly schedules
    pub day_of_week: Option<i32>,
    /// 1-12, yearly schedules
    pub month_of_year: Option<i32>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub active: Option<bool>,
}

/// Request body for updating a recurring definition
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateRecurringTransactionRequest {
    pub account_id: Option<i32>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i32>)]
    pub category_id: Option<Option<i32>>,
    #[validate(length(min = 1, max = 255))]
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub frequency: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i32>)]
    pub day_of_month: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i32>)]
    pub day_of_week: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i32>)]
    pub month_of_year: Option<Option<i32>>,
    pub start_date: Option<NaiveDate>,
    /// `null` makes the definition open-ended
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<NaiveDate>)]
    pub end_date: Option<Option<NaiveDate>>,
    pub active: Option<bool>,
}

/// Recurring definition response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecurringTransactionResponse {
    pub id: i32,
    pub account_id: i32,
    pub category_id: Option<i32>,
    pub description: String,
    pub amount: Decimal,
    pub frequency: String,
    pub day_of_month: Option<i32>,
    pub day_of_week: Option<i32>,
    pub month_of_year: Option<i32>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub active: bool,
    pub last_processed_on: Option<NaiveDate>,
}

impl From<recurring_transaction::Model> for RecurringTransactionResponse {
    fn from(model: recurring_transaction::Model) -> Self {
        Self {
            id: model.id,
            account_id: model.account_id,
            category_id: model.category_id,
            description: model.description,
            amount: model.amount,
            frequency: enum_name(&model.frequency),
            day_of_month: model.day_of_month,
            day_of_week: model.day_of_week,
            month_of_year: model.month_of_year,
            start_date: model.start_date,
            end_date: model.end_date,
            active: model.active,
            last_processed_on: model.last_processed_on,
        }
    }
}

/// Date to process; defaults to today
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct ProcessRecurringRequest {
    pub date: Option<NaiveDate>,
}

fn check_definition(
    amount: Decimal,
    frequency: Frequency,
    day_of_month: Option<i32>,
    day_of_week: Option<i32>,
    month_of_year: Option<i32>,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
) -> ApiResult<()> {
    if amount.is_zero() {
        return Err(ApiError::bad_request("INVALID_AMOUNT", "amount must not be zero"));
    }
    if end_date.is_some_and(|end| end < start_date) {
        return Err(ApiError::bad_request(
            "INVALID_DATE_RANGE",
            "end_date must not be before start_date",
        ));
    }
    validate_schedule(frequency, day_of_month, day_of_week, month_of_year)
        .map_err(|err| ApiError::bad_request("INVALID_SCHEDULE", err.to_string()))
}

/// Create a recurring definition
#[utoipa::path(
    post,
    path = "/api/v1/recurring-transactions",
    tag = "recurring-transactions",
    request_body = CreateRecurringTransactionRequest,
    responses(
        (status = 201, description = "Recurring transaction created successfully", body = ApiResponse<RecurringTransactionResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Member role required", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn create_recurring_transaction(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Json(request)): Valid<Json<CreateRecurringTransactionRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<RecurringTransactionResponse>>)> {
    ctx.require(Permission::WriteLedger)?;
    let tenant_id = ctx.tenant_id();

    let frequency = parse_enum::<Frequency>(&request.frequency, "INVALID_FREQUENCY")?;
    check_definition(
        request.amount,
        frequency,
        request.day_of_month,
        request.day_of_week,
        request.month_of_year,
        request.start_date,
        request.end_date,
    )?;
    ensure_account(&state.db, tenant_id, request.account_id).await?;
    ensure_optional_category(&state.db, tenant_id, request.category_id).await?;

    let created = recurring_transaction::ActiveModel {
        tenant_id: Set(tenant_id),
        account_id: Set(request.account_id),
        category_id: Set(request.category_id),
        description: Set(request.description.trim().to_string()),
        amount: Set(request.amount),
        frequency: Set(frequency),
        day_of_month: Set(request.day_of_month),
        day_of_week: Set(request.day_of_week),
        month_of_year: Set(request.month_of_year),
        start_date: Set(request.start_date),
        end_date: Set(request.end_date),
        active: Set(request.active.unwrap_or(true)),
        last_processed_on: Set(None),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(
        "Recurring transaction created successfully with ID: {}, frequency: {:?}",
        created.id, created.frequency
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            RecurringTransactionResponse::from(created),
            "Recurring transaction created successfully",
        )),
    ))
}

/// Get all recurring definitions
#[utoipa::path(
    get,
    path = "/api/v1/recurring-transactions",
    tag = "recurring-transactions",
    responses(
        (status = 200, description = "Recurring transactions retrieved successfully", body = ApiResponse<Vec<RecurringTransactionResponse>>)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_recurring_transactions(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Json<ApiResponse<Vec<RecurringTransactionResponse>>>> {
    ctx.require(Permission::Read)?;
    let definitions = recurring_transaction::Entity::find()
        .filter(recurring_transaction::Column::TenantId.eq(ctx.tenant_id()))
        .order_by_asc(recurring_transaction::Column::Id)
        .all(&state.db)
        .await?;
    debug!("Retrieved {} recurring transactions", definitions.len());
    Ok(Json(ApiResponse::ok(
        definitions
            .into_iter()
            .map(RecurringTransactionResponse::from)
            .collect(),
        "Recurring transactions retrieved successfully",
    )))
}

/// Get a recurring definition by ID
#[utoipa::path(
    get,
    path = "/api/v1/recurring-transactions/{recurring_transaction_id}",
    tag = "recurring-transactions",
    params(
        ("recurring_transaction_id" = i32, Path, description = "Recurring transaction ID"),
    ),
    responses(
        (status = 200, description = "Recurring transaction retrieved successfully", body = ApiResponse<RecurringTransactionResponse>),
        (status = 404, description = "Recurring transaction not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_recurring_transaction(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(recurring_transaction_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<RecurringTransactionResponse>>> {
    ctx.require(Permission::Read)?;
    let found =
        find_recurring_transaction(&state.db, ctx.tenant_id(), recurring_transaction_id).await?;
    Ok(Json(ApiResponse::ok(
        RecurringTransactionResponse::from(found),
        "Recurring transaction retrieved successfully",
    )))
}

/// Update a recurring definition
#[utoipa::path(
    put,
    path = "/api/v1/recurring-transactions/{recurring_transaction_id}",
    tag = "recurring-transactions",
    params(
        ("recurring_transaction_id" = i32, Path, description = "Recurring transaction ID"),
    ),
    request_body = UpdateRecurringTransactionRequest,
    responses(
        (status = 200, description = "Recurring transaction updated successfully", body = ApiResponse<RecurringTransactionResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Recurring transaction not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn update_recurring_transaction(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(recurring_transaction_id): Path<i32>,
    Valid(Json(request)): Valid<Json<UpdateRecurringTransactionRequest>>,
) -> ApiResult<Json<ApiResponse<RecurringTransactionResponse>>> {
    ctx.require(Permission::WriteLedger)?;
    let tenant_id = ctx.tenant_id();
    let existing = find_recurring_transaction(&state.db, tenant_id, recurring_transaction_id).await?;

    let frequency = parse_optional_enum::<Frequency>(request.frequency.as_deref(), "INVALID_FREQUENCY")?
        .unwrap_or(existing.frequency);
    let amount = request.amount.unwrap_or(existing.amount);
    let day_of_month = request.day_of_month.unwrap_or(existing.day_of_month);
    let day_of_week = request.day_of_week.unwrap_or(existing.day_of_week);
    let month_of_year = request.month_of_year.unwrap_or(existing.month_of_year);
    let start_date = request.start_date.unwrap_or(existing.start_date);
    let end_date = request.end_date.unwrap_or(existing.end_date);
    check_definition(
        amount,
        frequency,
        day_of_month,
        day_of_week,
        month_of_year,
        start_date,
        end_date,
    )?;

    if let Some(account_id) = request.account_id {
        ensure_account(&state.db, tenant_id, account_id).await?;
    }
    if let Some(category_id) = request.category_id {
        ensure_optional_category(&state.db, tenant_id, category_id).await?;
    }

    let mut active: recurring_transaction::ActiveModel = existing.into();
    if let Some(account_id) = request.account_id {
        active.account_id = Set(account_id);
    }
    if let Some(category_id) = request.category_id {
        active.category_id = Set(category_id);
    }
    if let Some(description) = request.description {
        active.description = Set(description.trim().to_string());
    }
    if let Some(is_active) = request.active {
        active.active = Set(is_active);
    }
    active.amount = Set(amount);
    active.frequency = Set(frequency);
    active.day_of_month = Set(day_of_month);
    active.day_of_week = Set(day_of_week);
    active.month_of_year = Set(month_of_year);
    active.start_date = Set(start_date);
    active.end_date = Set(end_date);

    let updated = active.update(&state.db).await?;
    info!("Recurring transaction {} updated successfully", updated.id);
    Ok(Json(ApiResponse::ok(
        RecurringTransactionResponse::from(updated),
        "Recurring transaction updated successfully",
    )))
}

/// Delete a recurring definition. Generated transactions are kept.
#[utoipa::path(
    delete,
    path = "/api/v1/recurring-transactions/{recurring_transaction_id}",
    tag = "recurring-transactions",
    params(
        ("recurring_transaction_id" = i32, Path, description = "Recurring transaction ID"),
    ),
    responses(
        (status = 200, description = "Recurring transaction deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Recurring transaction not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn delete_recurring_transaction(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(recurring_transaction_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<String>>> {
    ctx.require(Permission::WriteLedger)?;
    let existing =
        find_recurring_transaction(&state.db, ctx.tenant_id(), recurring_transaction_id).await?;
    existing.delete(&state.db).await?;

    info!("Recurring transaction {} deleted successfully", recurring_transaction_id);
    Ok(Json(ApiResponse::ok(
        format!("Recurring transaction {} deleted", recurring_transaction_id),
        "Recurring transaction deleted successfully",
    )))
}

/// Create the transactions of every definition due on a date
///
/// Running twice for the same date creates nothing the second time.
#[utoipa::path(
    post,
    path = "/api/v1/recurring-transactions/process",
    tag = "recurring-transactions",
    request_body = ProcessRecurringRequest,
    responses(
        (status = 200, description = "Recurring transactions processed", body = ApiResponse<ProcessReport>),
        (status = 403, description = "Member role required", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn process_recurring_transactions(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Json(request)): Valid<Json<ProcessRecurringRequest>>,
) -> ApiResult<Json<ApiResponse<ProcessReport>>> {
    ctx.require(Permission::WriteLedger)?;
    let date = request.date.unwrap_or_else(today);

    let report = process_tenant(&state.db, ctx.tenant_id(), date).await?;
    if report.created > 0 {
        invalidate_tenant(&state.cache, ctx.tenant_id());
    }

    Ok(Json(ApiResponse::ok(report, "Recurring transactions processed")))
}
