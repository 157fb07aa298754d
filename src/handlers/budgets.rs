use crate::auth::{Permission, TenantContext};
use crate::error::{ApiError, ApiResult};
use crate::helpers::scoped::{ensure_category, find_budget};
use crate::helpers::stats::{determine_month, load_month, tenant_categories};
use crate::schemas::{ApiResponse, AppState, ErrorResponse, PeriodQuery};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use common::BudgetProgress;
use compute::budget::{DEFAULT_ALERT_THRESHOLD, budget_progress, spent_in_month};
use model::entities::budget;
use model::transaction::LedgerEntry;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Request body for creating a budget
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateBudgetRequest {
    pub category_id: i32,
    #[validate(range(min = 1900, max = 2200))]
    pub year: i32,
    #[validate(range(min = 1, max = 12))]
    pub month: i32,
    /// Spending limit, greater than zero
    pub limit_amount: Decimal,
    /// Percentage of the limit that raises an alert, defaults to 80
    #[validate(range(min = 1, max = 100))]
    pub alert_threshold: Option<i32>,
}

/// Request body for updating a budget
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateBudgetRequest {
    pub limit_amount: Option<Decimal>,
    #[validate(range(min = 1, max = 100))]
    pub alert_threshold: Option<i32>,
}

/// Budget response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BudgetResponse {
    pub id: i32,
    pub category_id: i32,
    pub year: i32,
    pub month: i32,
    pub limit_amount: Decimal,
    pub alert_threshold: i32,
}

impl From<budget::Model> for BudgetResponse {
    fn from(model: budget::Model) -> Self {
        Self {
            id: model.id,
            category_id: model.category_id,
            year: model.year,
            month: model.month,
            limit_amount: model.limit_amount,
            alert_threshold: model.alert_threshold,
        }
    }
}

/// Filters for listing budgets
#[derive(Debug, Default, Deserialize, Serialize, IntoParams, Validate)]
pub struct BudgetQuery {
    #[validate(range(min = 1900, max = 2200))]
    pub year: Option<i32>,
    #[validate(range(min = 1, max = 12))]
    pub month: Option<i32>,
}

/// Spending of a budget in its month
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BudgetStatusResponse {
    pub budget_id: i32,
    pub category_id: i32,
    pub category_name: String,
    pub year: i32,
    pub month: i32,
    pub progress: BudgetProgress,
}

impl BudgetStatusResponse {
    /// Progress of `found` over the entries of its month.
    fn build(
        found: &budget::Model,
        category_name: String,
        entries: &[LedgerEntry],
    ) -> ApiResult<Self> {
        let month = u32::try_from(found.month)
            .map_err(|_| ApiError::Validation(format!("month {} is out of range", found.month)))?;
        let spent = spent_in_month(entries, found.category_id, found.year, month);
        let progress = budget_progress(found.limit_amount, spent, found.alert_threshold)?;
        debug!(
            "Budget {} spent {} of {} ({}%)",
            found.id, progress.spent, progress.limit, progress.percentage
        );
        Ok(Self {
            budget_id: found.id,
            category_id: found.category_id,
            category_name,
            year: found.year,
            month: found.month,
            progress,
        })
    }
}

fn check_limit(limit: Decimal) -> ApiResult<()> {
    if limit <= Decimal::ZERO {
        return Err(ApiError::bad_request(
            "INVALID_LIMIT",
            "limit_amount must be greater than zero",
        ));
    }
    Ok(())
}

async fn ensure_period_free<C: ConnectionTrait>(
    db: &C,
    tenant_id: i32,
    category_id: i32,
    year: i32,
    month: i32,
) -> ApiResult<()> {
    let existing = budget::Entity::find()
        .filter(budget::Column::TenantId.eq(tenant_id))
        .filter(budget::Column::CategoryId.eq(category_id))
        .filter(budget::Column::Year.eq(year))
        .filter(budget::Column::Month.eq(month))
        .one(db)
        .await?;
    if let Some(found) = existing {
        return Err(ApiError::conflict(
            "DUPLICATE_BUDGET",
            format!(
                "budget {} already covers category {} in {}-{:02}",
                found.id, category_id, year, month
            ),
        ));
    }
    Ok(())
}

/// Create a budget
#[utoipa::path(
    post,
    path = "/api/v1/budgets",
    tag = "budgets",
    request_body = CreateBudgetRequest,
    responses(
        (status = 201, description = "Budget created successfully", body = ApiResponse<BudgetResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Budget already exists for the month", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn create_budget(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Json(request)): Valid<Json<CreateBudgetRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<BudgetResponse>>)> {
    ctx.require(Permission::WriteLedger)?;
    let tenant_id = ctx.tenant_id();

    check_limit(request.limit_amount)?;
    ensure_category(&state.db, tenant_id, request.category_id).await?;
    ensure_period_free(&state.db, tenant_id, request.category_id, request.year, request.month).await?;

    let created = budget::ActiveModel {
        tenant_id: Set(tenant_id),
        category_id: Set(request.category_id),
        year: Set(request.year),
        month: Set(request.month),
        limit_amount: Set(request.limit_amount),
        alert_threshold: Set(request.alert_threshold.unwrap_or(DEFAULT_ALERT_THRESHOLD)),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Budget created successfully with ID: {}", created.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            BudgetResponse::from(created),
            "Budget created successfully",
        )),
    ))
}

/// Get all budgets
#[utoipa::path(
    get,
    path = "/api/v1/budgets",
    tag = "budgets",
    params(BudgetQuery),
    responses(
        (status = 200, description = "Budgets retrieved successfully", body = ApiResponse<Vec<BudgetResponse>>)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_budgets(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Query(query)): Valid<Query<BudgetQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<BudgetResponse>>>> {
    ctx.require(Permission::Read)?;

    let mut select = budget::Entity::find().filter(budget::Column::TenantId.eq(ctx.tenant_id()));
    if let Some(year) = query.year {
        select = select.filter(budget::Column::Year.eq(year));
    }
    if let Some(month) = query.month {
        select = select.filter(budget::Column::Month.eq(month));
    }
    let budgets = select
        .order_by_asc(budget::Column::Year)
        .order_by_asc(budget::Column::Month)
        .order_by_asc(budget::Column::Id)
        .all(&state.db)
        .await?;

    debug!("Retrieved {} budgets", budgets.len());
    Ok(Json(ApiResponse::ok(
        budgets.into_iter().map(BudgetResponse::from).collect(),
        "Budgets retrieved successfully",
    )))
}

/// Get a budget by ID
#[utoipa::path(
    get,
    path = "/api/v1/budgets/{budget_id}",
    tag = "budgets",
    params(
        ("budget_id" = i32, Path, description = "Budget ID"),
    ),
    responses(
        (status = 200, description = "Budget retrieved successfully", body = ApiResponse<BudgetResponse>),
        (status = 404, description = "Budget not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_budget(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(budget_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<BudgetResponse>>> {
    ctx.require(Permission::Read)?;
    let found = find_budget(&state.db, ctx.tenant_id(), budget_id).await?;
    Ok(Json(ApiResponse::ok(
        BudgetResponse::from(found),
        "Budget retrieved successfully",
    )))
}

/// Update a budget's limit or alert threshold
#[utoipa::path(
    put,
    path = "/api/v1/budgets/{budget_id}",
    tag = "budgets",
    params(
        ("budget_id" = i32, Path, description = "Budget ID"),
    ),
    request_body = UpdateBudgetRequest,
    responses(
        (status = 200, description = "Budget updated successfully", body = ApiResponse<BudgetResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Budget not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn update_budget(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(budget_id): Path<i32>,
    Valid(Json(request)): Valid<Json<UpdateBudgetRequest>>,
) -> ApiResult<Json<ApiResponse<BudgetResponse>>> {
    ctx.require(Permission::WriteLedger)?;
    let existing = find_budget(&state.db, ctx.tenant_id(), budget_id).await?;

    let mut active: budget::ActiveModel = existing.into();
    if let Some(limit) = request.limit_amount {
        check_limit(limit)?;
        active.limit_amount = Set(limit);
    }
    if let Some(threshold) = request.alert_threshold {
        active.alert_threshold = Set(threshold);
    }

    let updated = active.update(&state.db).await?;
    info!("Budget {} updated successfully", updated.id);
    Ok(Json(ApiResponse::ok(
        BudgetResponse::from(updated),
        "Budget updated successfully",
    )))
}

/// Delete a budget
#[utoipa::path(
    delete,
    path = "/api/v1/budgets/{budget_id}",
    tag = "budgets",
    params(
        ("budget_id" = i32, Path, description = "Budget ID"),
    ),
    responses(
        (status = 200, description = "Budget deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Budget not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn delete_budget(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(budget_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<String>>> {
    ctx.require(Permission::WriteLedger)?;
    let existing = find_budget(&state.db, ctx.tenant_id(), budget_id).await?;
    existing.delete(&state.db).await?;

    info!("Budget {} deleted successfully", budget_id);
    Ok(Json(ApiResponse::ok(
        format!("Budget {} deleted", budget_id),
        "Budget deleted successfully",
    )))
}

/// Get how much of a budget has been spent in its month
#[utoipa::path(
    get,
    path = "/api/v1/budgets/{budget_id}/status",
    tag = "budgets",
    params(
        ("budget_id" = i32, Path, description = "Budget ID"),
    ),
    responses(
        (status = 200, description = "Budget status calculated", body = ApiResponse<BudgetStatusResponse>),
        (status = 404, description = "Budget not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_budget_status(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(budget_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<BudgetStatusResponse>>> {
    ctx.require(Permission::Read)?;
    let tenant_id = ctx.tenant_id();
    let found = find_budget(&state.db, tenant_id, budget_id).await?;
    let category = ensure_category(&state.db, tenant_id, found.category_id).await?;

    let month = u32::try_from(found.month)
        .map_err(|_| ApiError::Validation(format!("month {} is out of range", found.month)))?;
    let entries = load_month(&state.db, tenant_id, found.year, month).await?;
    let status = BudgetStatusResponse::build(&found, category.name, &entries)?;

    Ok(Json(ApiResponse::ok(
        status,
        "Budget status calculated successfully",
    )))
}

/// Get the status of every budget of a month
#[utoipa::path(
    get,
    path = "/api/v1/budgets/status",
    tag = "budgets",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Budget statuses calculated", body = ApiResponse<Vec<BudgetStatusResponse>>),
        (status = 400, description = "Invalid month", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_budgets_status(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Query(query)): Valid<Query<PeriodQuery>>,
) -> ApiResult<Json<ApiResponse<Vec<BudgetStatusResponse>>>> {
    ctx.require(Permission::Read)?;
    let tenant_id = ctx.tenant_id();
    let (year, month) = determine_month(&query)?;

    let budgets = budget::Entity::find()
        .filter(budget::Column::TenantId.eq(tenant_id))
        .filter(budget::Column::Year.eq(year))
        .filter(budget::Column::Month.eq(month as i32))
        .order_by_asc(budget::Column::Id)
        .all(&state.db)
        .await?;
    if budgets.is_empty() {
        debug!("No budgets for {}-{:02}", year, month);
        return Ok(Json(ApiResponse::ok(Vec::new(), "No budgets for the month")));
    }

    let categories = tenant_categories(&state.db, tenant_id).await?;
    let entries = load_month(&state.db, tenant_id, year, month).await?;
    let statuses = budgets
        .iter()
        .map(|found| {
            let name = categories
                .iter()
                .find(|c| c.id == found.category_id)
                .map(|c| c.name.clone())
                .unwrap_or_default();
            BudgetStatusResponse::build(found, name, &entries)
        })
        .collect::<ApiResult<Vec<_>>>()?;

    info!(
        "{} of {} budgets over their alert threshold in {}-{:02}",
        statuses.iter().filter(|s| s.progress.alert).count(),
        statuses.len(),
        year,
        month
    );
    Ok(Json(ApiResponse::ok(statuses, "Budget statuses calculated successfully")))
}
